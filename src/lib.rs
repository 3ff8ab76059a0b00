//! Pool Sniper Library
//!
//! Watches Solana for new liquidity pools, extracts the newly listed asset,
//! runs a configurable chain of safety checks and triggers a purchase.
//! This library exposes core modules for testing.

pub mod config;
pub mod constants;
pub mod engine;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod metrics;
pub mod normalizer;
pub mod notifications;
pub mod pipeline;
pub mod token;
pub mod transport;
pub mod utils;

// Re-export commonly used types for tests
pub use config::{AppConfig, TransportMode};
pub use engine::{ActionDispatcher, ActionOutcome, Engine, EvaluationOutcome, Evaluator};
pub use error::{AppError, AppResult};
pub use gate::{Admission, AdmissionGate, AdmissionPermit};
pub use normalizer::{CandidateAsset, Normalized, Normalizer, RawEvent};
pub use notifications::{CompositeNotifier, NotificationEvent};
pub use pipeline::{CheckPolicy, CheckStep, DecisionPipeline, Mode, Verdict};
pub use transport::{
    BackoffPolicy, ConnectionManager, ConnectionState, ConnectionStateMachine, StateChange,
    Transport, TransportError,
};
