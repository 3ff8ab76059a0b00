//! Subscription descriptions and their wire encodings
//!
//! - Websocket: one JSON-RPC `logsSubscribe` per watched program
//! - gRPC: a single Yellowstone `SubscribeRequest` with a named transaction filter

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use yellowstone_grpc_proto::prelude::{
    CommitmentLevel, SubscribeRequest, SubscribeRequestFilterTransactions, SubscribeRequestPing,
};

/// Commitment level requested from the data provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    #[default]
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }

    pub fn as_proto(self) -> CommitmentLevel {
        match self {
            Self::Processed => CommitmentLevel::Processed,
            Self::Confirmed => CommitmentLevel::Confirmed,
            Self::Finalized => CommitmentLevel::Finalized,
        }
    }
}

/// A watched program and the log markers that identify pool creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEntry {
    pub program_id: String,
    pub markers: Vec<String>,
}

/// What a transport subscribes to. Immutable once built.
#[derive(Debug, Clone)]
pub struct SubscriptionSpec {
    entries: Vec<WatchEntry>,
    commitment: Commitment,
    filter_tag: String,
    discriminator: Option<Vec<u8>>,
}

impl SubscriptionSpec {
    /// Build a spec; entries sharing a program ID are merged, first occurrence keeps its position
    pub fn new(
        entries: Vec<WatchEntry>,
        commitment: Commitment,
        filter_tag: impl Into<String>,
        discriminator: Option<Vec<u8>>,
    ) -> Self {
        let mut merged: Vec<WatchEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            match merged.iter_mut().find(|e| e.program_id == entry.program_id) {
                Some(existing) => {
                    for marker in entry.markers {
                        if !existing.markers.contains(&marker) {
                            existing.markers.push(marker);
                        }
                    }
                }
                None => merged.push(entry),
            }
        }

        Self {
            entries: merged,
            commitment,
            filter_tag: filter_tag.into(),
            discriminator: discriminator.filter(|d| !d.is_empty()),
        }
    }

    pub fn entries(&self) -> &[WatchEntry] {
        &self.entries
    }

    pub fn commitment(&self) -> Commitment {
        self.commitment
    }

    /// Name of the gRPC transaction filter; updates carry it back
    pub fn filter_tag(&self) -> &str {
        &self.filter_tag
    }

    /// Instruction data prefix required by the stream transport
    pub fn discriminator(&self) -> Option<&[u8]> {
        self.discriminator.as_deref()
    }

    pub fn program_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.program_id.as_str())
    }

    /// All pool-creation markers across watched programs
    pub fn markers(&self) -> Vec<String> {
        let mut markers: Vec<String> = Vec::new();
        for marker in self.entries.iter().flat_map(|e| e.markers.iter()) {
            if !markers.contains(marker) {
                markers.push(marker.clone());
            }
        }
        markers
    }

    pub fn is_watched_program(&self, program_id: &str) -> bool {
        self.entries.iter().any(|e| e.program_id == program_id)
    }
}

/// Encode one `logsSubscribe` request per watched program
///
/// Request IDs start at 1 and follow program order.
pub fn encode_logs_subscriptions(spec: &SubscriptionSpec) -> Vec<String> {
    spec.program_ids()
        .enumerate()
        .map(|(i, program_id)| {
            json!({
                "jsonrpc": "2.0",
                "id": i + 1,
                "method": "logsSubscribe",
                "params": [
                    { "mentions": [program_id] },
                    { "commitment": spec.commitment().as_str() }
                ]
            })
            .to_string()
        })
        .collect()
}

/// Encode the Yellowstone subscribe request for the stream transport
pub fn encode_stream_request(spec: &SubscriptionSpec) -> SubscribeRequest {
    let mut transactions = HashMap::new();
    transactions.insert(
        spec.filter_tag().to_string(),
        SubscribeRequestFilterTransactions {
            vote: Some(false),
            failed: Some(false),
            account_include: spec.program_ids().map(str::to_string).collect(),
            ..Default::default()
        },
    );

    SubscribeRequest {
        transactions,
        commitment: Some(spec.commitment().as_proto() as i32),
        ..Default::default()
    }
}

/// Keepalive reply to a server ping on the stream transport
pub fn encode_stream_ping(id: i32) -> SubscribeRequest {
    SubscribeRequest {
        ping: Some(SubscribeRequestPing { id }),
        ..Default::default()
    }
}
