//! Reconnecting transports feeding the ingestion pipeline
//!
//! Two mutually exclusive front-ends share one state machine:
//! - `ws`: JSON-RPC websocket, subscriptions re-sent on every open
//! - `grpc`: Yellowstone bidirectional stream, request sent once per stream
//!
//! The subscription is written only after the connection reports CONNECTED.
//!
//! The variant is chosen once at startup and never mixed.

mod codec;
pub mod grpc;
mod manager;
mod state;
pub mod ws;

pub use codec::*;
pub use grpc::GrpcTransport;
pub use manager::ConnectionManager;
pub use state::*;
pub use ws::WsTransport;

use crate::normalizer::RawEvent;
use thiserror::Error;

/// Connection-level errors, recovered by reconnecting
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    /// Writing the subscription onto an open connection failed
    #[error("subscription write failed: {0}")]
    Subscribe(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("stream ended without close")]
    StreamEnded,

    #[error("reconnect attempts exhausted after {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },
}

/// How a clean remote close is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClosePolicy {
    /// Treat like an error and reconnect (unless shutting down)
    Reconnect,
    /// Stream completion is a normal end of the connection
    Terminate,
}

/// A wire-level connection to the data provider
#[async_trait::async_trait]
pub trait Transport: Send {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Open the connection
    async fn open(&mut self) -> Result<(), TransportError>;

    /// Write the subscription onto the open connection
    async fn subscribe(&mut self) -> Result<(), TransportError>;

    /// Wait for the next payload; `Ok(None)` means the remote side closed cleanly
    async fn next_event(&mut self) -> Result<Option<RawEvent>, TransportError>;

    /// Close the underlying connection. Safe to call when already closed.
    async fn close(&mut self);

    fn close_policy(&self) -> ClosePolicy;
}
