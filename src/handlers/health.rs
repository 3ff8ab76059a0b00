//! Health check endpoint

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

use crate::config::TransportMode;
use crate::gate::AdmissionGate;
use crate::pipeline::Mode;
use crate::transport::ConnectionState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall system status
    pub status: HealthStatus,
    pub version: &'static str,
    /// Uptime in seconds
    pub uptime_seconds: i64,
    /// Active transport (`grpc` or `wss`)
    pub transport: String,
    pub connection_state: ConnectionState,
    pub reconnects: u64,
    pub in_flight: usize,
    pub concurrency_limit: usize,
    pub last_seen_asset: Option<String>,
    pub mode: String,
    pub simulation_mode: bool,
}

/// Health status enum
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Connected and listening
    Healthy,
    /// Connecting or reconnecting
    Degraded,
    /// Connection closed
    Unhealthy,
}

impl HealthStatus {
    pub fn from_connection(state: ConnectionState) -> Self {
        match state {
            ConnectionState::Connected => HealthStatus::Healthy,
            ConnectionState::Closed => HealthStatus::Unhealthy,
            ConnectionState::Disconnected
            | ConnectionState::Connecting
            | ConnectionState::Reconnecting => HealthStatus::Degraded,
        }
    }
}

/// Live status snapshot shared with the status task
pub struct StatusState {
    pub started_at: DateTime<Utc>,
    pub transport: TransportMode,
    pub mode: Mode,
    pub simulation_mode: bool,
    pub gate: Arc<AdmissionGate>,
    connection: RwLock<ConnectionSnapshot>,
}

#[derive(Debug, Clone, Copy)]
struct ConnectionSnapshot {
    state: ConnectionState,
    reconnects: u64,
}

impl StatusState {
    pub fn new(
        transport: TransportMode,
        mode: Mode,
        simulation_mode: bool,
        gate: Arc<AdmissionGate>,
    ) -> Self {
        Self {
            started_at: Utc::now(),
            transport,
            mode,
            simulation_mode,
            gate,
            connection: RwLock::new(ConnectionSnapshot {
                state: ConnectionState::Disconnected,
                reconnects: 0,
            }),
        }
    }

    pub fn set_connection_state(&self, state: ConnectionState) {
        let mut snapshot = self.connection.write();
        if state == ConnectionState::Reconnecting {
            snapshot.reconnects += 1;
        }
        snapshot.state = state;
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.read().state
    }

    pub fn reconnects(&self) -> u64 {
        self.connection.read().reconnects
    }
}

/// Health check handler
///
/// GET /health
pub async fn health_check(State(state): State<Arc<StatusState>>) -> (StatusCode, Json<HealthResponse>) {
    let snapshot = *state.connection.read();
    let status = HealthStatus::from_connection(snapshot.state);

    let status_code = match status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
        transport: state.transport.to_string(),
        connection_state: snapshot.state,
        reconnects: snapshot.reconnects,
        in_flight: state.gate.in_flight(),
        concurrency_limit: state.gate.limit(),
        last_seen_asset: state.gate.last_seen().map(|a| a.to_string()),
        mode: state.mode.to_string(),
        simulation_mode: state.simulation_mode,
    };

    (status_code, Json(response))
}

/// Create health router
pub fn health_router() -> Router<Arc<StatusState>> {
    Router::new().route("/health", get(health_check))
}
