//! Event normalization
//!
//! Turns a raw transport payload into a single candidate asset, a signature
//! that still needs resolving, or a skip. Two variants, one per transport
//! shape:
//! - `logs`: websocket `logsNotification` JSON
//! - `stream`: flattened Geyser transaction update

mod logs;
mod stream;

pub use logs::normalize_logs;
pub use stream::{normalize_stream, StreamInstruction, StreamUpdate};

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::transport::SubscriptionSpec;

/// Opaque transport payload plus arrival time
#[derive(Debug, Clone)]
pub struct RawEvent {
    pub payload: RawPayload,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum RawPayload {
    /// Text frame from the websocket transport
    Logs(String),
    /// Transaction update from the stream transport
    Stream(StreamUpdate),
}

impl RawEvent {
    pub fn logs(text: impl Into<String>) -> Self {
        Self {
            payload: RawPayload::Logs(text.into()),
            received_at: Utc::now(),
        }
    }

    pub fn stream(update: StreamUpdate) -> Self {
        Self {
            payload: RawPayload::Stream(update),
            received_at: Utc::now(),
        }
    }
}

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";
const MAX_IDENTIFIER_LEN: usize = 44;

/// A validated asset identifier, the unit passed downstream
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CandidateAsset(String);

impl CandidateAsset {
    /// Accepts non-empty base58 strings of at most 44 characters
    pub fn parse(raw: &str) -> AppResult<Self> {
        if raw.is_empty() {
            return Err(AppError::Validation("empty asset identifier".to_string()));
        }
        if raw.len() > MAX_IDENTIFIER_LEN {
            return Err(AppError::Validation(format!(
                "asset identifier too long: {} chars",
                raw.len()
            )));
        }
        if let Some(c) = raw.chars().find(|c| !BASE58_ALPHABET.contains(*c)) {
            return Err(AppError::Validation(format!(
                "invalid character {:?} in asset identifier",
                c
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CandidateAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of normalizing one payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Normalized {
    /// Asset identifier resolved directly from the payload
    Asset(CandidateAsset),
    /// Transaction signature that must be resolved to an asset by lookup
    Signature(String),
    /// Payload is irrelevant or malformed
    Skip(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Malformed,
    ErrorEnvelope,
    Acknowledgement,
    NotNotification,
    FailedTransaction,
    NoMarker,
    MissingSignature,
    FilterMismatch,
    DiscriminatorMismatch,
    NoCandidate,
    InvalidIdentifier,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::ErrorEnvelope => "error_envelope",
            Self::Acknowledgement => "acknowledgement",
            Self::NotNotification => "not_notification",
            Self::FailedTransaction => "failed_transaction",
            Self::NoMarker => "no_marker",
            Self::MissingSignature => "missing_signature",
            Self::FilterMismatch => "filter_mismatch",
            Self::DiscriminatorMismatch => "discriminator_mismatch",
            Self::NoCandidate => "no_candidate",
            Self::InvalidIdentifier => "invalid_identifier",
        }
    }
}

/// Dispatches a payload to the variant matching its transport shape
pub struct Normalizer {
    spec: Arc<SubscriptionSpec>,
    markers: Vec<String>,
    base_mint: String,
}

impl Normalizer {
    pub fn new(spec: Arc<SubscriptionSpec>, base_mint: impl Into<String>) -> Self {
        let markers = spec.markers();
        Self {
            spec,
            markers,
            base_mint: base_mint.into(),
        }
    }

    pub fn normalize(&self, event: &RawEvent) -> Normalized {
        match &event.payload {
            RawPayload::Logs(text) => normalize_logs(text, &self.markers),
            RawPayload::Stream(update) => {
                normalize_stream(update, &self.spec, &self.markers, &self.base_mint)
            }
        }
    }
}

/// Pick the newly listed asset from a transaction's token balance mints
///
/// - fewer than two balances: nothing
/// - exactly two: whichever is not the base asset (nothing if both are)
/// - more than two: the first that differs from the base asset
pub fn resolve_from_balances<'a>(mints: &'a [String], base: &str) -> Option<&'a str> {
    match mints {
        [] | [_] => None,
        [a, b] => {
            if a != base {
                Some(a.as_str())
            } else if b != base {
                Some(b.as_str())
            } else {
                None
            }
        }
        _ => mints.iter().find(|m| m.as_str() != base).map(String::as_str),
    }
}

/// Validate a resolved identifier into a candidate, or skip
pub(crate) fn candidate_or_skip(raw: &str) -> Normalized {
    match CandidateAsset::parse(raw) {
        Ok(asset) => Normalized::Asset(asset),
        Err(e) => {
            tracing::debug!(identifier = raw, error = %e, "Rejected resolved identifier");
            Normalized::Skip(SkipReason::InvalidIdentifier)
        }
    }
}
