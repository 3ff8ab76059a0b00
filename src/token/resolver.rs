//! Signature to asset resolution for the websocket transport

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcTransactionConfig;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::Signature;
use solana_transaction_status::{UiTransactionEncoding, UiTransactionTokenBalance};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::normalizer::{resolve_from_balances, CandidateAsset};

const FETCH_ATTEMPTS: u32 = 3;
const FETCH_RETRY_DELAY: Duration = Duration::from_millis(400);

/// Resolves a pool-creation transaction signature into the listed asset
#[async_trait]
pub trait SignatureResolver: Send + Sync {
    /// `Ok(None)` when the transaction holds no qualifying asset
    async fn resolve(&self, signature: &str) -> AppResult<Option<CandidateAsset>>;
}

/// Fetches the transaction and applies the balance resolution rule
pub struct RpcSignatureResolver {
    rpc_client: Arc<RpcClient>,
    base_mint: String,
}

impl RpcSignatureResolver {
    pub fn new(rpc_client: Arc<RpcClient>, base_mint: impl Into<String>) -> Self {
        Self {
            rpc_client,
            base_mint: base_mint.into(),
        }
    }

    async fn fetch_post_balances(
        &self,
        signature: &Signature,
    ) -> AppResult<Vec<UiTransactionTokenBalance>> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::JsonParsed),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };

        // Freshly observed transactions may not be queryable yet
        let mut attempt = 1;
        let tx = loop {
            match self
                .rpc_client
                .get_transaction_with_config(signature, config.clone())
                .await
            {
                Ok(tx) => break tx,
                Err(e) if attempt < FETCH_ATTEMPTS => {
                    tracing::debug!(
                        signature = %signature,
                        attempt = attempt,
                        error = %e,
                        "Transaction not available yet, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(FETCH_RETRY_DELAY).await;
                }
                Err(e) => {
                    return Err(AppError::Rpc(format!("Failed to fetch transaction: {}", e)));
                }
            }
        };

        let balances: Option<Vec<UiTransactionTokenBalance>> = tx
            .transaction
            .meta
            .and_then(|meta| meta.post_token_balances.into());

        Ok(balances.unwrap_or_default())
    }
}

#[async_trait]
impl SignatureResolver for RpcSignatureResolver {
    async fn resolve(&self, signature: &str) -> AppResult<Option<CandidateAsset>> {
        let parsed = Signature::from_str(signature)
            .map_err(|e| AppError::Validation(format!("Invalid signature {}: {}", signature, e)))?;

        let balances = self.fetch_post_balances(&parsed).await?;
        let mints: Vec<String> = balances.into_iter().map(|b| b.mint).collect();

        let Some(mint) = resolve_from_balances(&mints, &self.base_mint) else {
            tracing::debug!(signature = signature, balances = mints.len(), "No candidate in token balances");
            return Ok(None);
        };

        match CandidateAsset::parse(mint) {
            Ok(asset) => Ok(Some(asset)),
            Err(e) => {
                tracing::debug!(signature = signature, mint = mint, error = %e, "Resolved mint rejected");
                Ok(None)
            }
        }
    }
}
