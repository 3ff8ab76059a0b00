//! Telegram Bot API delivery

use super::{AlertLevel, NotificationEvent, NotificationService};
use crate::config::TelegramNotificationConfig;
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::time::{Duration, Instant};

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts pipeline events to one chat, at most one per event kind per interval.
/// Critical events are never throttled.
pub struct TelegramNotifier {
    bot_token: Option<SecretString>,
    chat_id: String,
    client: reqwest::Client,
    min_interval: Duration,
    last_sent: Mutex<HashMap<&'static str, Instant>>,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramNotificationConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(SEND_TIMEOUT).build()?;

        Ok(Self {
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
            client,
            min_interval: Duration::from_secs(config.rate_limit_seconds),
            last_sent: Mutex::new(HashMap::new()),
        })
    }

    /// Returns true when the event should be dropped; otherwise records the send slot
    fn throttled(&self, event: &NotificationEvent) -> bool {
        if event.level() == AlertLevel::Critical {
            return false;
        }

        let now = Instant::now();
        let mut last_sent = self.last_sent.lock();
        match last_sent.get(event.kind()) {
            Some(at) if now.duration_since(*at) < self.min_interval => true,
            _ => {
                last_sent.insert(event.kind(), now);
                false
            }
        }
    }

    fn render(event: &NotificationEvent) -> String {
        format!("[{}] {}", event.level(), event.format_message())
    }
}

#[async_trait::async_trait]
impl NotificationService for TelegramNotifier {
    async fn notify(&self, event: NotificationEvent) -> anyhow::Result<()> {
        let Some(ref bot_token) = self.bot_token else {
            return Ok(());
        };

        if self.throttled(&event) {
            tracing::debug!(kind = event.kind(), "Notification throttled");
            return Ok(());
        }

        let url = format!(
            "https://api.telegram.org/bot{}/sendMessage",
            bot_token.expose_secret()
        );
        let payload = serde_json::json!({
            "chat_id": self.chat_id,
            "text": Self::render(&event),
            "disable_web_page_preview": true,
        });

        self.client
            .post(&url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        tracing::debug!(kind = event.kind(), "Telegram notification sent");
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.bot_token
            .as_ref()
            .is_some_and(|token| !token.expose_secret().is_empty())
            && !self.chat_id.is_empty()
    }
}
