//! Notification service for the pool sniper
//!
//! Provides push notifications via Telegram for pipeline events:
//! - New pool detected and admitted
//! - Purchase executed, simulated or failed
//! - Transport closed for good
//!
//! Delivery is best-effort; failures are logged and never reach the pipeline.

pub mod telegram;

pub use telegram::TelegramNotifier;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Alert level for notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// Transport gone, purchase failed
    Critical,
    /// Purchase executed
    Important,
    /// Detections and simulated purchases
    Info,
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Critical => write!(f, "CRITICAL"),
            AlertLevel::Important => write!(f, "IMPORTANT"),
            AlertLevel::Info => write!(f, "INFO"),
        }
    }
}

/// Notification event types
#[derive(Debug, Clone)]
pub enum NotificationEvent {
    /// A pool creation was admitted for evaluation
    PoolDetected { mint: String, mode: String },
    /// Provider confirmed the purchase
    PurchaseExecuted { mint: String, amount_sol: f64 },
    /// Accepted in simulation mode, nothing bought
    PurchaseSimulated { mint: String, amount_sol: f64 },
    /// Provider call failed after retries
    PurchaseFailed { mint: String, reason: String },
    /// Transport reached CLOSED
    TransportClosed { transport: String, reason: String },
}

impl NotificationEvent {
    /// Get the alert level for this event
    pub fn level(&self) -> AlertLevel {
        match self {
            NotificationEvent::PoolDetected { .. } => AlertLevel::Info,
            NotificationEvent::PurchaseSimulated { .. } => AlertLevel::Info,
            NotificationEvent::PurchaseExecuted { .. } => AlertLevel::Important,
            NotificationEvent::PurchaseFailed { .. } => AlertLevel::Critical,
            NotificationEvent::TransportClosed { .. } => AlertLevel::Critical,
        }
    }

    /// Stable name of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationEvent::PoolDetected { .. } => "pool_detected",
            NotificationEvent::PurchaseExecuted { .. } => "purchase_executed",
            NotificationEvent::PurchaseSimulated { .. } => "purchase_simulated",
            NotificationEvent::PurchaseFailed { .. } => "purchase_failed",
            NotificationEvent::TransportClosed { .. } => "transport_closed",
        }
    }

    /// Format the event as a notification message
    pub fn format_message(&self) -> String {
        match self {
            NotificationEvent::PoolDetected { mint, mode } => {
                format!("🔎 New pool: {} (mode: {})", mint, mode)
            }
            NotificationEvent::PurchaseExecuted { mint, amount_sol } => {
                format!("💰 Bought {} for {:.4} SOL", mint, amount_sol)
            }
            NotificationEvent::PurchaseSimulated { mint, amount_sol } => {
                format!("🧪 Simulated buy of {} for {:.4} SOL", mint, amount_sol)
            }
            NotificationEvent::PurchaseFailed { mint, reason } => {
                format!("❌ Buy failed for {}: {}", mint, reason)
            }
            NotificationEvent::TransportClosed { transport, reason } => {
                format!("🚨 {} transport closed: {}", transport, reason)
            }
        }
    }
}

/// Notification service trait
#[async_trait::async_trait]
pub trait NotificationService: Send + Sync {
    /// Send a notification
    async fn notify(&self, event: NotificationEvent) -> anyhow::Result<()>;

    /// Check if the service is enabled
    fn is_enabled(&self) -> bool;
}

/// Composite notifier that can send to multiple services
pub struct CompositeNotifier {
    services: Vec<Arc<dyn NotificationService>>,
}

impl CompositeNotifier {
    /// Create a new composite notifier
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
        }
    }

    /// Add a notification service
    pub fn add_service(&mut self, service: Arc<dyn NotificationService>) {
        self.services.push(service);
    }

    pub fn has_services(&self) -> bool {
        self.services.iter().any(|s| s.is_enabled())
    }

    /// Send notification to all enabled services
    pub async fn notify(&self, event: NotificationEvent) {
        for service in &self.services {
            if service.is_enabled() {
                if let Err(e) = service.notify(event.clone()).await {
                    tracing::error!(
                        error = %e,
                        level = %event.level(),
                        "Failed to send notification"
                    );
                }
            }
        }
    }

    /// Fire and forget on a background task
    pub fn spawn_notify(self: &Arc<Self>, event: NotificationEvent) {
        if !self.has_services() {
            return;
        }
        let notifier = Arc::clone(self);
        tokio::spawn(async move {
            notifier.notify(event).await;
        });
    }
}

impl Default for CompositeNotifier {
    fn default() -> Self {
        Self::new()
    }
}
