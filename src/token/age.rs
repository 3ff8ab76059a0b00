//! Token-age quick rug-pull heuristic

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::normalizer::CandidateAsset;
use crate::pipeline::RugPullHeuristic;

/// Flags assets whose earliest on-chain activity is younger than a threshold
pub struct TokenAgeHeuristic {
    rpc_client: Arc<RpcClient>,
    threshold: Duration,
}

impl TokenAgeHeuristic {
    pub fn new(rpc_client: Arc<RpcClient>, threshold: Duration) -> Self {
        Self {
            rpc_client,
            threshold,
        }
    }
}

#[async_trait]
impl RugPullHeuristic for TokenAgeHeuristic {
    async fn is_likely_rug_pull(&self, asset: &CandidateAsset) -> AppResult<bool> {
        let mint = Pubkey::from_str(asset.as_str())
            .map_err(|e| AppError::Check(format!("Invalid mint address {}: {}", asset, e)))?;

        let signatures = self
            .rpc_client
            .get_signatures_for_address(&mint)
            .await
            .map_err(|e| AppError::Rpc(format!("Failed to get signatures: {}", e)))?;

        let earliest = signatures.iter().filter_map(|s| s.block_time).min();
        let now = chrono::Utc::now().timestamp();
        let likely = is_quick_rug_pull(earliest, now, self.threshold);

        tracing::debug!(
            mint = %asset,
            earliest_block_time = ?earliest,
            signatures = signatures.len(),
            likely_rug_pull = likely,
            "Token age checked"
        );

        Ok(likely)
    }
}

/// True when there is no activity or the earliest activity is younger than `threshold`
pub fn is_quick_rug_pull(earliest_block_time: Option<i64>, now: i64, threshold: Duration) -> bool {
    match earliest_block_time {
        None => true,
        Some(earliest) => {
            let age_secs = now.saturating_sub(earliest).max(0) as u64;
            age_secs < threshold.as_secs()
        }
    }
}
