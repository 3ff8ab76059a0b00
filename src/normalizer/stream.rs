//! Stream transaction-update normalization

use super::{candidate_or_skip, resolve_from_balances, Normalized, SkipReason};
use crate::transport::SubscriptionSpec;

/// One compiled instruction with its program resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInstruction {
    pub program_id: String,
    pub data: Vec<u8>,
}

/// Transaction fields carried by a stream update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamUpdate {
    /// Filter names the update matched
    pub filters: Vec<String>,
    pub signature: String,
    pub slot: u64,
    pub log_messages: Vec<String>,
    pub instructions: Vec<StreamInstruction>,
    /// Mints of the post-transaction token balances, in order
    pub post_token_mints: Vec<String>,
}

/// Normalize a stream transaction update straight to a candidate asset
pub fn normalize_stream(
    update: &StreamUpdate,
    spec: &SubscriptionSpec,
    markers: &[String],
    base_mint: &str,
) -> Normalized {
    if !update.filters.iter().any(|f| f == spec.filter_tag()) {
        return Normalized::Skip(SkipReason::FilterMismatch);
    }

    if let Some(prefix) = spec.discriminator() {
        let matched = update
            .instructions
            .iter()
            .filter(|ix| spec.is_watched_program(&ix.program_id))
            .any(|ix| ix.data.starts_with(prefix));
        if !matched {
            return Normalized::Skip(SkipReason::DiscriminatorMismatch);
        }
    }

    let has_marker = update
        .log_messages
        .iter()
        .any(|line| markers.iter().any(|m| line.contains(m.as_str())));
    if !has_marker {
        return Normalized::Skip(SkipReason::NoMarker);
    }

    match resolve_from_balances(&update.post_token_mints, base_mint) {
        Some(mint) => {
            tracing::debug!(signature = %update.signature, slot = update.slot, mint = mint, "Pool creation resolved");
            candidate_or_skip(mint)
        }
        None => Normalized::Skip(SkipReason::NoCandidate),
    }
}
