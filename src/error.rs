//! Error types for the pool sniper

use crate::transport::TransportError;
use thiserror::Error;

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Validation error (malformed identifiers, bad input)
    #[error("Validation error: {0}")]
    Validation(String),

    /// RPC/Solana error
    #[error("RPC error: {0}")]
    Rpc(String),

    /// Authority lookup failed
    #[error("Authority lookup failed: {0}")]
    Lookup(String),

    /// Safety check collaborator failed
    #[error("Check failed: {0}")]
    Check(String),

    /// Purchase provider error
    #[error("Buy error: {0}")]
    Buy(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Transport-level error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
