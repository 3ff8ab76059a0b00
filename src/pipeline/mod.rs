//! Decision pipeline
//!
//! A mode selected at startup picks an ordered list of check steps. Steps run
//! in order and the first failure rejects the asset.
//!
//! | Mode       | Steps                          |
//! |------------|--------------------------------|
//! | `snipe`    | authorities                    |
//! | `full`     | suffix filter, rug check       |
//! | `pumpdump` | quick rug-pull heuristic       |

mod checks;

pub use checks::{
    authority_verdict, ends_with_marker, suffix_filter, AuthorityLookup, AuthorityStatus,
    RugCheck, RugPullHeuristic,
};

use std::sync::Arc;

use crate::normalizer::CandidateAsset;

/// Filter chain selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    Snipe,
    #[default]
    Full,
    PumpDump,
}

impl Mode {
    /// Parse the configured mode; unknown or empty values run `full`
    pub fn from_config(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "snipe" => Self::Snipe,
            "full" => Self::Full,
            "pumpdump" => Self::PumpDump,
            other => {
                if !other.is_empty() {
                    tracing::warn!(mode = other, "Unrecognized pipeline mode, using full");
                }
                Self::Full
            }
        }
    }

    /// Ordered check steps for this mode
    pub fn steps(self) -> &'static [CheckStep] {
        match self {
            Self::Snipe => &[CheckStep::Authorities],
            Self::Full => &[CheckStep::SuffixFilter, CheckStep::RugCheck],
            Self::PumpDump => &[CheckStep::QuickRugPull],
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Snipe => write!(f, "snipe"),
            Self::Full => write!(f, "full"),
            Self::PumpDump => write!(f, "pumpdump"),
        }
    }
}

/// A named check in a mode's chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStep {
    Authorities,
    SuffixFilter,
    RugCheck,
    QuickRugPull,
}

impl CheckStep {
    pub fn name(self) -> &'static str {
        match self {
            Self::Authorities => "authorities",
            Self::SuffixFilter => "suffix_filter",
            Self::RugCheck => "rug_check",
            Self::QuickRugPull => "quick_rug_pull",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Pass,
    Fail(String),
}

/// Pipeline result for one asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject { step: CheckStep, reason: String },
}

impl Verdict {
    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept)
    }
}

/// Static policy toggles consulted by the steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckPolicy {
    pub reject_suffix: bool,
    pub suffix_marker: String,
    pub allow_mint_authority: bool,
    pub allow_freeze_authority: bool,
}

impl Default for CheckPolicy {
    fn default() -> Self {
        Self {
            reject_suffix: false,
            suffix_marker: "pump".to_string(),
            allow_mint_authority: false,
            allow_freeze_authority: false,
        }
    }
}

/// Runs the configured mode's chain against candidate assets
pub struct DecisionPipeline {
    mode: Mode,
    policy: CheckPolicy,
    authorities: Arc<dyn AuthorityLookup>,
    rug_check: Arc<dyn RugCheck>,
    rug_pull: Arc<dyn RugPullHeuristic>,
}

impl DecisionPipeline {
    pub fn new(
        mode: Mode,
        policy: CheckPolicy,
        authorities: Arc<dyn AuthorityLookup>,
        rug_check: Arc<dyn RugCheck>,
        rug_pull: Arc<dyn RugPullHeuristic>,
    ) -> Self {
        Self {
            mode,
            policy,
            authorities,
            rug_check,
            rug_pull,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Evaluate an asset; never fails, collaborator errors reject
    pub async fn evaluate(&self, asset: &CandidateAsset) -> Verdict {
        for &step in self.mode.steps() {
            let outcome = self.run_step(step, asset).await;
            if let StepOutcome::Fail(reason) = outcome {
                tracing::info!(
                    mint = %asset,
                    mode = %self.mode,
                    step = step.name(),
                    reason = %reason,
                    "Asset rejected"
                );
                return Verdict::Reject { step, reason };
            }
            tracing::debug!(mint = %asset, step = step.name(), "Check passed");
        }
        Verdict::Accept
    }

    async fn run_step(&self, step: CheckStep, asset: &CandidateAsset) -> StepOutcome {
        match step {
            CheckStep::Authorities => {
                checks::authority_step(self.authorities.as_ref(), asset, &self.policy).await
            }
            CheckStep::SuffixFilter => suffix_filter(asset, &self.policy),
            CheckStep::RugCheck => checks::rug_check_step(self.rug_check.as_ref(), asset).await,
            CheckStep::QuickRugPull => {
                checks::quick_rug_pull_step(self.rug_pull.as_ref(), asset).await
            }
        }
    }
}
