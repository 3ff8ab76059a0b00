//! Prometheus metrics for the pool sniper
//!
//! Exposes metrics endpoint for monitoring:
//! - Events received and normalization results
//! - Gate admissions by result
//! - Verdicts by outcome and evaluation latency
//! - Connection state and reconnect count

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::core::Collector;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Metrics state
pub struct MetricsState {
    registry: Registry,
    /// Raw payloads received from the transport
    pub events_received: IntCounter,
    /// Normalizer results (`asset`, `signature` or the skip reason)
    pub normalized: IntCounterVec,
    /// Gate results (`admitted`, `duplicate`, `saturated`, `resolver_busy`)
    pub admissions: IntCounterVec,
    /// Evaluation outcomes (`accepted`, `rejected`, `purchase_failed`)
    pub verdicts: IntCounterVec,
    /// Reconnects scheduled by the transport
    pub reconnects: IntCounter,
    /// Evaluations currently in flight
    pub in_flight: IntGauge,
    /// Connection state (0 = disconnected .. 4 = closed)
    pub connection_state: IntGauge,
    /// Admission to outcome latency in milliseconds
    pub evaluation_latency: Histogram,
}

fn register<M>(registry: &Registry, metric: M) -> Result<M, prometheus::Error>
where
    M: Collector + Clone + 'static,
{
    registry.register(Box::new(metric.clone()))?;
    Ok(metric)
}

impl MetricsState {
    /// Create a new metrics state with all metrics registered
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let events_received = register(
            &registry,
            IntCounter::with_opts(Opts::new(
                "sniper_events_received_total",
                "Raw payloads received from the transport",
            ))?,
        )?;

        let normalized = register(
            &registry,
            IntCounterVec::new(
                Opts::new("sniper_normalized_total", "Normalization results"),
                &["result"],
            )?,
        )?;

        let admissions = register(
            &registry,
            IntCounterVec::new(
                Opts::new("sniper_admissions_total", "Admission gate results"),
                &["result"],
            )?,
        )?;

        let verdicts = register(
            &registry,
            IntCounterVec::new(
                Opts::new("sniper_verdicts_total", "Evaluation outcomes"),
                &["outcome"],
            )?,
        )?;

        let reconnects = register(
            &registry,
            IntCounter::with_opts(Opts::new(
                "sniper_reconnects_total",
                "Reconnects scheduled by the transport",
            ))?,
        )?;

        let in_flight = register(
            &registry,
            IntGauge::with_opts(Opts::new(
                "sniper_in_flight",
                "Evaluations currently in flight",
            ))?,
        )?;

        let connection_state = register(
            &registry,
            IntGauge::with_opts(Opts::new(
                "sniper_connection_state",
                "Connection state (0 = disconnected, 1 = connecting, 2 = connected, 3 = reconnecting, 4 = closed)",
            ))?,
        )?;

        let evaluation_latency = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new(
                    "sniper_evaluation_latency_ms",
                    "Admission to outcome latency in milliseconds",
                )
                .buckets(vec![
                    10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
                ]),
            )?,
        )?;

        Ok(Self {
            registry,
            events_received,
            normalized,
            admissions,
            verdicts,
            reconnects,
            in_flight,
            connection_state,
            evaluation_latency,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text format
    pub fn render(&self) -> Result<Vec<u8>, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }
}

/// Metrics handler - returns Prometheus metrics in text format
///
/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<MetricsState>>) -> impl IntoResponse {
    match state.render() {
        Ok(buffer) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4")],
            buffer,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("Content-Type", "text/plain; version=0.0.4")],
                Vec::new(),
            )
        }
    }
}

/// Create metrics router
pub fn metrics_router() -> Router<Arc<MetricsState>> {
    Router::new().route("/metrics", get(metrics_handler))
}
