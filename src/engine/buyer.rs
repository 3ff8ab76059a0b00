//! Purchase provider client
//!
//! The provider is an external trading service reached over HTTP. Its own
//! retry policy lives here: only errors carrying the configured transient
//! signature are retried, with a fixed delay and a bounded attempt count.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::config::SwapConfig;
use crate::error::{AppError, AppResult};
use crate::utils::sol_to_lamports;

/// A purchase request handed to the provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuyOrder {
    pub mint: String,
    pub amount_sol: f64,
    pub amount_lamports: u64,
    pub slippage_bps: u32,
    pub sell_enabled: bool,
    pub take_profit_percent: f64,
    pub stop_loss_percent: f64,
}

/// Fixed order parameters taken from configuration
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTemplate {
    pub amount_sol: f64,
    pub slippage_bps: u32,
    pub sell_enabled: bool,
    pub take_profit_percent: f64,
    pub stop_loss_percent: f64,
}

impl OrderTemplate {
    pub fn from_config(config: &SwapConfig) -> Self {
        Self {
            amount_sol: config.amount_sol,
            slippage_bps: config.slippage_bps,
            sell_enabled: config.sell_enabled,
            take_profit_percent: config.take_profit_percent,
            stop_loss_percent: config.stop_loss_percent,
        }
    }

    pub fn order_for(&self, mint: &str) -> BuyOrder {
        BuyOrder {
            mint: mint.to_string(),
            amount_sol: self.amount_sol,
            amount_lamports: sol_to_lamports(self.amount_sol),
            slippage_bps: self.slippage_bps,
            sell_enabled: self.sell_enabled,
            take_profit_percent: self.take_profit_percent,
            stop_loss_percent: self.stop_loss_percent,
        }
    }
}

/// Executes purchases; `Ok(false)` means the provider declined
#[async_trait]
pub trait Buyer: Send + Sync {
    async fn buy(&self, order: &BuyOrder) -> AppResult<bool>;
}

/// Retry `operation` while `is_retryable` classifies its error as transient
///
/// `operation` receives the 1-based attempt number.
pub async fn retry_classified<T, F, Fut, P>(
    max_attempts: u32,
    delay: Duration,
    is_retryable: P,
    mut operation: F,
) -> AppResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = AppResult<T>>,
    P: Fn(&AppError) -> bool,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && is_retryable(&e) => {
                tracing::warn!(
                    attempt = attempt,
                    max_attempts = max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient provider error, retrying"
                );
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if attempt > 1 {
                    tracing::error!(attempt = attempt, error = %e, "Provider call failed after retries");
                }
                return Err(e);
            }
        }
    }
}

/// Provider response body
#[derive(Debug, Clone, Deserialize)]
pub struct BuyResponse {
    pub success: bool,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// HTTP client for the trading provider
pub struct HttpBuyer {
    http: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
    max_attempts: u32,
    retry_delay: Duration,
    retryable_error: String,
}

impl HttpBuyer {
    pub fn new(provider_url: &str, api_key: SecretString, config: &SwapConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            endpoint: format!("{}/buy", provider_url.trim_end_matches('/')),
            api_key,
            max_attempts: config.max_attempts,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            retryable_error: config.retryable_error.clone(),
        })
    }

    /// Whether an error carries the transient signature
    pub fn is_retryable(&self, error: &AppError) -> bool {
        !self.retryable_error.is_empty() && error.to_string().contains(&self.retryable_error)
    }

    async fn submit(&self, order: &BuyOrder) -> AppResult<BuyResponse> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(order)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Buy(format!("Provider returned {}: {}", status, body)));
        }

        let body: BuyResponse = response.json().await?;
        if !body.success {
            return Err(AppError::Buy(
                body.error
                    .unwrap_or_else(|| "provider reported failure".to_string()),
            ));
        }
        Ok(body)
    }
}

#[async_trait]
impl Buyer for HttpBuyer {
    async fn buy(&self, order: &BuyOrder) -> AppResult<bool> {
        let response = retry_classified(
            self.max_attempts,
            self.retry_delay,
            |e| self.is_retryable(e),
            |attempt| {
                tracing::debug!(mint = %order.mint, attempt = attempt, "Submitting buy order");
                self.submit(order)
            },
        )
        .await?;

        tracing::info!(
            mint = %order.mint,
            amount_sol = order.amount_sol,
            signature = ?response.signature,
            "Buy order confirmed by provider"
        );
        Ok(true)
    }
}
