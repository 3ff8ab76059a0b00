//! Configuration management for the pool sniper
//!
//! Loads configuration from YAML/TOML/JSON files and environment variables.
//! Environment variables override file values.

use config::{Config, ConfigError, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::constants::{markers, programs};
use crate::pipeline::{CheckPolicy, Mode};
use crate::transport::{BackoffPolicy, Commitment, SubscriptionSpec, WatchEntry};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Transport selection and endpoints
    pub transport: TransportConfig,
    /// JSON-RPC endpoint used by on-chain lookups
    #[serde(default)]
    pub rpc: RpcConfig,
    /// What to watch on-chain
    #[serde(default)]
    pub subscription: SubscriptionConfig,
    /// Decision pipeline settings
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Rug-check service
    #[serde(default)]
    pub rugcheck: RugCheckConfig,
    /// Purchase provider and order parameters
    #[serde(default)]
    pub swap: SwapConfig,
    /// Notification configuration
    #[serde(default)]
    pub notifications: NotificationsConfig,
    /// Health/metrics server
    #[serde(default)]
    pub server: ServerConfig,
}

/// Which wire transport feeds the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    /// Yellowstone gRPC bidirectional stream
    Grpc,
    /// JSON-RPC websocket `logsSubscribe`
    Wss,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grpc => write!(f, "grpc"),
            Self::Wss => write!(f, "wss"),
        }
    }
}

/// Transport configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// Active transport (`grpc` or `wss`)
    pub mode: TransportMode,
    /// Websocket endpoint
    #[serde(default)]
    pub wss_url: String,
    /// gRPC endpoint
    #[serde(default)]
    pub grpc_url: String,
    /// gRPC x-token
    #[serde(default)]
    pub grpc_token: Option<SecretString>,
    /// Commitment level for subscriptions
    #[serde(default)]
    pub commitment: Commitment,
    /// Websocket keepalive ping interval
    #[serde(default = "default_ping_interval")]
    pub ping_interval_secs: u64,
    /// Reconnect backoff
    #[serde(default)]
    pub backoff: BackoffConfig,
}

fn default_ping_interval() -> u64 {
    30
}

/// Reconnect backoff configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BackoffConfig {
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    /// Unset means retry forever
    #[serde(default)]
    pub max_attempts: Option<u32>,
}

fn default_initial_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    30_000
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            max_attempts: None,
        }
    }
}

impl BackoffConfig {
    pub fn policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
            self.max_attempts,
        )
    }
}

/// RPC endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint URL
    #[serde(default = "default_rpc_url")]
    pub url: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_ms: u64,
}

fn default_rpc_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

fn default_rpc_timeout() -> u64 {
    5000
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            timeout_ms: default_rpc_timeout(),
        }
    }
}

/// A program to watch and the log markers that identify pool creation
#[derive(Debug, Clone, Deserialize)]
pub struct WatchedProgram {
    pub program_id: String,
    #[serde(default)]
    pub markers: Vec<String>,
}

/// Subscription configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionConfig {
    #[serde(default = "default_programs")]
    pub programs: Vec<WatchedProgram>,
    /// Filter name attached to the gRPC transaction filter
    #[serde(default = "default_filter_tag")]
    pub filter_tag: String,
    /// Hex instruction-discriminator prefix (stream transport only)
    #[serde(default)]
    pub discriminator: Option<String>,
}

fn default_programs() -> Vec<WatchedProgram> {
    vec![WatchedProgram {
        program_id: programs::RAYDIUM_AMM_V4.to_string(),
        markers: vec![markers::RAYDIUM_INITIALIZE2.to_string()],
    }]
}

fn default_filter_tag() -> String {
    "pool_creations".to_string()
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            programs: default_programs(),
            filter_tag: default_filter_tag(),
            discriminator: None,
        }
    }
}

/// Decision pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// `snipe`, `full` or `pumpdump`; anything else runs `full`
    #[serde(default)]
    pub mode: String,
    /// Maximum concurrent evaluations
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,
    /// Reject identifiers ending with `suffix_marker`
    #[serde(default)]
    pub reject_suffix: bool,
    #[serde(default = "default_suffix_marker")]
    pub suffix_marker: String,
    #[serde(default)]
    pub allow_mint_authority: bool,
    #[serde(default)]
    pub allow_freeze_authority: bool,
    /// Age threshold for the quick rug-pull heuristic
    #[serde(default = "default_rug_pull_threshold")]
    pub rug_pull_threshold_secs: u64,
}

fn default_concurrency_limit() -> usize {
    1
}

fn default_suffix_marker() -> String {
    "pump".to_string()
}

fn default_rug_pull_threshold() -> u64 {
    60
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: String::new(),
            concurrency_limit: default_concurrency_limit(),
            reject_suffix: false,
            suffix_marker: default_suffix_marker(),
            allow_mint_authority: false,
            allow_freeze_authority: false,
            rug_pull_threshold_secs: default_rug_pull_threshold(),
        }
    }
}

impl PipelineConfig {
    pub fn mode(&self) -> Mode {
        Mode::from_config(&self.mode)
    }

    pub fn check_policy(&self) -> CheckPolicy {
        CheckPolicy {
            reject_suffix: self.reject_suffix,
            suffix_marker: self.suffix_marker.clone(),
            allow_mint_authority: self.allow_mint_authority,
            allow_freeze_authority: self.allow_freeze_authority,
        }
    }
}

/// Rug-check service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RugCheckConfig {
    #[serde(default = "default_rugcheck_url")]
    pub api_url: String,
    #[serde(default = "default_rugcheck_timeout")]
    pub timeout_ms: u64,
    /// Highest acceptable normalised risk score
    #[serde(default)]
    pub max_score: Option<u32>,
}

fn default_rugcheck_url() -> String {
    "https://api.rugcheck.xyz/v1".to_string()
}

fn default_rugcheck_timeout() -> u64 {
    5000
}

impl Default for RugCheckConfig {
    fn default() -> Self {
        Self {
            api_url: default_rugcheck_url(),
            timeout_ms: default_rugcheck_timeout(),
            max_score: None,
        }
    }
}

/// Purchase configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SwapConfig {
    /// Evaluate and log but never call the provider
    #[serde(default = "default_true")]
    pub simulation_mode: bool,
    /// Trading service base URL (absent = no live provider)
    #[serde(default)]
    pub provider_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Fixed spend per purchase in SOL
    #[serde(default = "default_amount_sol")]
    pub amount_sol: f64,
    #[serde(default = "default_slippage_bps")]
    pub slippage_bps: u32,
    /// Auto-sell parameters handed to the provider
    #[serde(default)]
    pub sell_enabled: bool,
    #[serde(default = "default_take_profit")]
    pub take_profit_percent: f64,
    #[serde(default = "default_stop_loss")]
    pub stop_loss_percent: f64,
    /// Provider retry policy
    #[serde(default = "default_buy_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// The only error signature treated as transient
    #[serde(default = "default_retryable_error")]
    pub retryable_error: String,
}

fn default_true() -> bool {
    true
}

fn default_amount_sol() -> f64 {
    0.01
}

fn default_slippage_bps() -> u32 {
    1000
}

fn default_take_profit() -> f64 {
    50.0
}

fn default_stop_loss() -> f64 {
    20.0
}

fn default_buy_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1000
}

fn default_retryable_error() -> String {
    "Blockhash not found".to_string()
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            simulation_mode: true,
            provider_url: None,
            api_key: None,
            amount_sol: default_amount_sol(),
            slippage_bps: default_slippage_bps(),
            sell_enabled: false,
            take_profit_percent: default_take_profit(),
            stop_loss_percent: default_stop_loss(),
            max_attempts: default_buy_attempts(),
            retry_delay_ms: default_retry_delay(),
            retryable_error: default_retryable_error(),
        }
    }
}

/// Notification configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub telegram: TelegramNotificationConfig,
}

/// Telegram-specific notification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramNotificationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: Option<SecretString>,
    #[serde(default)]
    pub chat_id: String,
    /// Minimum seconds between notifications of the same kind
    #[serde(default = "default_notification_rate_limit")]
    pub rate_limit_seconds: u64,
}

fn default_notification_rate_limit() -> u64 {
    5
}

impl Default for TelegramNotificationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: None,
            chat_id: String::new(),
            rate_limit_seconds: default_notification_rate_limit(),
        }
    }
}

/// Health/metrics HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9090
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_host(),
            port: default_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (SNIPER_*)
    /// 2. config/config.{yaml,toml,json} (if exists)
    /// 3. config.{yaml,toml,json} (if exists)
    /// 4. Default values
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(
            Config::builder()
                .add_source(File::with_name("config").required(false))
                .add_source(File::with_name("config/config").required(false)),
        )
    }

    /// Load configuration from an explicit file, still honouring environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::build(Config::builder().add_source(File::from(path.as_ref())))
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let config = builder
            // SNIPER_TRANSPORT__MODE=wss -> transport.mode = "wss"
            // SNIPER_PIPELINE__CONCURRENCY_LIMIT=3 -> pipeline.concurrency_limit = 3
            .add_source(
                Environment::with_prefix("SNIPER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.transport.mode {
            TransportMode::Wss if self.transport.wss_url.is_empty() => {
                return Err(ConfigError::Message(
                    "Websocket endpoint must be set via SNIPER_TRANSPORT__WSS_URL".to_string(),
                ));
            }
            TransportMode::Grpc if self.transport.grpc_url.is_empty() => {
                return Err(ConfigError::Message(
                    "gRPC endpoint must be set via SNIPER_TRANSPORT__GRPC_URL".to_string(),
                ));
            }
            _ => {}
        }

        if self.transport.backoff.initial_delay_ms > self.transport.backoff.max_delay_ms {
            return Err(ConfigError::Message(
                "Backoff initial delay must not exceed max delay".to_string(),
            ));
        }

        if self.rpc.url.is_empty() {
            return Err(ConfigError::Message("RPC URL must be set".to_string()));
        }

        if self.subscription.programs.is_empty() {
            return Err(ConfigError::Message(
                "At least one program must be watched".to_string(),
            ));
        }

        if self
            .subscription
            .programs
            .iter()
            .any(|p| p.program_id.trim().is_empty())
        {
            return Err(ConfigError::Message(
                "Watched program IDs must not be empty".to_string(),
            ));
        }

        if self
            .subscription
            .programs
            .iter()
            .all(|p| p.markers.iter().all(|m| m.trim().is_empty()))
        {
            return Err(ConfigError::Message(
                "At least one pool-creation marker must be configured".to_string(),
            ));
        }

        if let Some(ref hex_prefix) = self.subscription.discriminator {
            hex::decode(hex_prefix).map_err(|e| {
                ConfigError::Message(format!("Invalid instruction discriminator: {}", e))
            })?;
        }

        if self.pipeline.concurrency_limit == 0 {
            return Err(ConfigError::Message(
                "Concurrency limit must be at least 1".to_string(),
            ));
        }

        if !(self.swap.amount_sol > 0.0) {
            return Err(ConfigError::Message(
                "Buy amount must be greater than zero".to_string(),
            ));
        }

        if !self.swap.simulation_mode
            && self.swap.provider_url.is_some()
            && self.swap.api_key.is_none()
        {
            return Err(ConfigError::Message(
                "Live purchases require SNIPER_SWAP__API_KEY".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the subscription description for the active transport
    pub fn subscription_spec(&self) -> SubscriptionSpec {
        let entries = self
            .subscription
            .programs
            .iter()
            .map(|p| WatchEntry {
                program_id: p.program_id.clone(),
                markers: p.markers.clone(),
            })
            .collect();

        let discriminator = self
            .subscription
            .discriminator
            .as_deref()
            .and_then(|h| hex::decode(h).ok());

        SubscriptionSpec::new(
            entries,
            self.transport.commitment,
            self.subscription.filter_tag.clone(),
            discriminator,
        )
    }
}
