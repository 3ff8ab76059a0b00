//! Check steps and the collaborators they call
//!
//! Each step maps an asset identifier to a [`StepOutcome`]. Collaborator
//! errors never escape a step; they become a failure with the error text.

use async_trait::async_trait;

use super::{CheckPolicy, StepOutcome};
use crate::error::AppResult;
use crate::normalizer::CandidateAsset;

/// On-chain authority status of a mint
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthorityStatus {
    pub has_mint_authority: bool,
    pub has_freeze_authority: bool,
    /// Neither authority is set
    pub is_secure: bool,
    pub mint_authority: Option<String>,
    pub freeze_authority: Option<String>,
}

impl AuthorityStatus {
    pub fn new(mint_authority: Option<String>, freeze_authority: Option<String>) -> Self {
        let has_mint_authority = mint_authority.is_some();
        let has_freeze_authority = freeze_authority.is_some();
        Self {
            has_mint_authority,
            has_freeze_authority,
            is_secure: !has_mint_authority && !has_freeze_authority,
            mint_authority,
            freeze_authority,
        }
    }
}

/// Reads mint and freeze authorities of an asset
#[async_trait]
pub trait AuthorityLookup: Send + Sync {
    async fn get_authorities(&self, asset: &CandidateAsset) -> AppResult<AuthorityStatus>;
}

/// Third-party scam verdict
#[async_trait]
pub trait RugCheck: Send + Sync {
    async fn is_confirmed_safe(&self, asset: &CandidateAsset) -> AppResult<bool>;
}

/// Age-based quick rug-pull heuristic
#[async_trait]
pub trait RugPullHeuristic: Send + Sync {
    async fn is_likely_rug_pull(&self, asset: &CandidateAsset) -> AppResult<bool>;
}

/// Case-insensitive suffix test after trimming whitespace
pub fn ends_with_marker(identifier: &str, marker: &str) -> bool {
    let marker = marker.trim().to_lowercase();
    if marker.is_empty() {
        return false;
    }
    identifier.trim().to_lowercase().ends_with(&marker)
}

/// Reject identifiers carrying the configured suffix when rejection is on
pub fn suffix_filter(asset: &CandidateAsset, policy: &CheckPolicy) -> StepOutcome {
    if policy.reject_suffix && ends_with_marker(asset.as_str(), &policy.suffix_marker) {
        return StepOutcome::Fail(format!(
            "identifier ends with rejected suffix '{}'",
            policy.suffix_marker
        ));
    }
    StepOutcome::Pass
}

/// Apply the authority allow toggles to a lookup result
pub fn authority_verdict(status: &AuthorityStatus, policy: &CheckPolicy) -> StepOutcome {
    if status.is_secure {
        return StepOutcome::Pass;
    }

    if status.has_mint_authority && !policy.allow_mint_authority {
        return StepOutcome::Fail(match status.mint_authority {
            Some(ref authority) => format!("mint authority present: {}", authority),
            None => "mint authority present".to_string(),
        });
    }

    if status.has_freeze_authority && !policy.allow_freeze_authority {
        return StepOutcome::Fail(match status.freeze_authority {
            Some(ref authority) => format!("freeze authority present: {}", authority),
            None => "freeze authority present".to_string(),
        });
    }

    StepOutcome::Pass
}

pub(crate) async fn authority_step(
    lookup: &dyn AuthorityLookup,
    asset: &CandidateAsset,
    policy: &CheckPolicy,
) -> StepOutcome {
    match lookup.get_authorities(asset).await {
        Ok(status) => authority_verdict(&status, policy),
        Err(e) => StepOutcome::Fail(format!("authority lookup failed: {}", e)),
    }
}

pub(crate) async fn rug_check_step(rug_check: &dyn RugCheck, asset: &CandidateAsset) -> StepOutcome {
    match rug_check.is_confirmed_safe(asset).await {
        Ok(true) => StepOutcome::Pass,
        Ok(false) => StepOutcome::Fail("rug check not confirmed safe".to_string()),
        Err(e) => StepOutcome::Fail(format!("rug check failed: {}", e)),
    }
}

pub(crate) async fn quick_rug_pull_step(
    heuristic: &dyn RugPullHeuristic,
    asset: &CandidateAsset,
) -> StepOutcome {
    match heuristic.is_likely_rug_pull(asset).await {
        Ok(false) => StepOutcome::Pass,
        Ok(true) => StepOutcome::Fail("likely quick rug pull".to_string()),
        Err(e) => StepOutcome::Fail(format!("rug-pull heuristic failed: {}", e)),
    }
}
