//! Websocket `logsNotification` normalization

use serde_json::Value;

use super::{Normalized, SkipReason};

/// Normalize one websocket text frame
///
/// Yields the transaction signature when the notification's logs contain one
/// of `markers`; the asset itself is resolved later by lookup.
pub fn normalize_logs(text: &str, markers: &[String]) -> Normalized {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping invalid websocket JSON");
            return Normalized::Skip(SkipReason::Malformed);
        }
    };

    if let Some(error) = value.get("error") {
        tracing::warn!(error = %error, "Provider returned error envelope");
        return Normalized::Skip(SkipReason::ErrorEnvelope);
    }

    if let (Some(id), Some(result)) = (value.get("id"), value.get("result")) {
        tracing::debug!(id = %id, subscription = %result, "logsSubscribe acknowledged");
        return Normalized::Skip(SkipReason::Acknowledgement);
    }

    if value.get("method").and_then(Value::as_str) != Some("logsNotification") {
        return Normalized::Skip(SkipReason::NotNotification);
    }

    let Some(result) = value.pointer("/params/result/value") else {
        tracing::warn!("logsNotification without params.result.value");
        return Normalized::Skip(SkipReason::Malformed);
    };

    if result.get("err").is_some_and(|err| !err.is_null()) {
        return Normalized::Skip(SkipReason::FailedTransaction);
    }

    let Some(logs) = result.get("logs").and_then(Value::as_array) else {
        tracing::warn!("logsNotification logs field is not an array");
        return Normalized::Skip(SkipReason::Malformed);
    };

    let has_marker = logs
        .iter()
        .filter_map(Value::as_str)
        .any(|line| markers.iter().any(|m| line.contains(m.as_str())));
    if !has_marker {
        return Normalized::Skip(SkipReason::NoMarker);
    }

    match result.get("signature").and_then(Value::as_str) {
        Some(signature) if !signature.is_empty() => Normalized::Signature(signature.to_string()),
        _ => {
            tracing::warn!("Pool-creation logs without a transaction signature");
            Normalized::Skip(SkipReason::MissingSignature)
        }
    }
}
