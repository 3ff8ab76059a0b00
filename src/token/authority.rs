//! Mint and freeze authority lookup over JSON-RPC

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::normalizer::CandidateAsset;
use crate::pipeline::{AuthorityLookup, AuthorityStatus};

/// Size of an SPL Token mint account
const MINT_ACCOUNT_LEN: usize = 82;

/// Reads the SPL mint account of an asset
pub struct RpcAuthorityLookup {
    rpc_client: Arc<RpcClient>,
}

impl RpcAuthorityLookup {
    pub fn new(rpc_client: Arc<RpcClient>) -> Self {
        Self { rpc_client }
    }
}

#[async_trait]
impl AuthorityLookup for RpcAuthorityLookup {
    async fn get_authorities(&self, asset: &CandidateAsset) -> AppResult<AuthorityStatus> {
        let mint = Pubkey::from_str(asset.as_str())
            .map_err(|e| AppError::Lookup(format!("Invalid mint address {}: {}", asset, e)))?;

        let account = self
            .rpc_client
            .get_account(&mint)
            .await
            .map_err(|e| AppError::Lookup(format!("Failed to get mint account: {}", e)))?;

        let status = parse_mint_authorities(&account.data)?;
        tracing::debug!(
            mint = %asset,
            mint_authority = ?status.mint_authority,
            freeze_authority = ?status.freeze_authority,
            "Fetched mint authorities"
        );
        Ok(status)
    }
}

/// Parse authorities out of SPL Token mint account data
///
/// Mint account layout:
/// - mint_authority: COption<Pubkey> (4 byte tag + 32 bytes)
/// - supply: u64
/// - decimals: u8
/// - is_initialized: bool
/// - freeze_authority: COption<Pubkey> (4 byte tag + 32 bytes)
pub fn parse_mint_authorities(data: &[u8]) -> AppResult<AuthorityStatus> {
    if data.len() < MINT_ACCOUNT_LEN {
        return Err(AppError::Lookup(format!(
            "Invalid mint account data length: {}",
            data.len()
        )));
    }

    let mint_authority = parse_optional_pubkey(&data[0..36]);
    let freeze_authority = parse_optional_pubkey(&data[46..82]);

    Ok(AuthorityStatus::new(mint_authority, freeze_authority))
}

fn parse_optional_pubkey(data: &[u8]) -> Option<String> {
    let tag: [u8; 4] = data.get(0..4)?.try_into().ok()?;
    if u32::from_le_bytes(tag) == 0 {
        return None;
    }
    let key: [u8; 32] = data.get(4..36)?.try_into().ok()?;
    Some(Pubkey::new_from_array(key).to_string())
}
