//! HTTP handlers for the pool sniper

mod health;

pub use health::*;

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::metrics::{metrics_router, MetricsState};

/// Build the operational router: `/health` and `/metrics`
pub fn router(status: Arc<StatusState>, metrics: Arc<MetricsState>) -> Router {
    Router::new()
        .merge(health_router().with_state(status))
        .merge(metrics_router().with_state(metrics))
        .layer(TraceLayer::new_for_http())
}
