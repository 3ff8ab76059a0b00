//! Health and metrics endpoint tests

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;

use crate::mocks::asset;
use pool_sniper::config::TransportMode;
use pool_sniper::gate::{Admission, AdmissionGate};
use pool_sniper::handlers::{self, StatusState};
use pool_sniper::metrics::MetricsState;
use pool_sniper::pipeline::Mode;
use pool_sniper::transport::ConnectionState;

fn state(gate: Arc<AdmissionGate>) -> (Arc<StatusState>, Arc<MetricsState>) {
    let status = Arc::new(StatusState::new(TransportMode::Grpc, Mode::Snipe, true, gate));
    let metrics = Arc::new(MetricsState::new().unwrap());
    (status, metrics)
}

async fn get(app: axum::Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

#[tokio::test]
async fn test_health_reports_connection_and_gate() {
    let gate = Arc::new(AdmissionGate::new(2));
    let (status, metrics) = state(gate.clone());
    status.set_connection_state(ConnectionState::Connecting);
    status.set_connection_state(ConnectionState::Connected);

    let Admission::Admitted(_permit) = gate.try_admit(&asset("MintX")) else {
        panic!("expected admission");
    };

    let (code, body) = get(handlers::router(status, metrics), "/health").await;
    assert_eq!(code, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["transport"], "grpc");
    assert_eq!(json["connection_state"], "CONNECTED");
    assert_eq!(json["mode"], "snipe");
    assert_eq!(json["in_flight"], 1);
    assert_eq!(json["concurrency_limit"], 2);
    assert_eq!(json["last_seen_asset"], "MintX");
}

#[tokio::test]
async fn test_health_unavailable_when_closed() {
    let (status, metrics) = state(Arc::new(AdmissionGate::new(1)));
    status.set_connection_state(ConnectionState::Closed);

    let (code, _) = get(handlers::router(status, metrics), "/health").await;
    assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_metrics_exposes_pipeline_counters() {
    let (status, metrics) = state(Arc::new(AdmissionGate::new(1)));
    metrics.events_received.inc();
    metrics.admissions.with_label_values(&["admitted"]).inc();
    metrics.connection_state.set(ConnectionState::Connected.as_gauge());

    let (code, body) = get(handlers::router(status, metrics), "/metrics").await;
    assert_eq!(code, StatusCode::OK);

    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("sniper_events_received_total 1"));
    assert!(text.contains("sniper_admissions_total{result=\"admitted\"} 1"));
    assert!(text.contains("sniper_connection_state 2"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (status, metrics) = state(Arc::new(AdmissionGate::new(1)));
    let (code, _) = get(handlers::router(status, metrics), "/trades").await;
    assert_eq!(code, StatusCode::NOT_FOUND);
}
