//! Dedup and concurrency gate
//!
//! Admits a candidate asset into evaluation unless:
//! - it equals the most recently admitted asset (single-slot dedup)
//! - the in-flight evaluation count has reached the configured limit
//!
//! Admission hands out an [`AdmissionPermit`]; dropping the permit finalizes
//! the evaluation and releases its in-flight slot exactly once.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::normalizer::CandidateAsset;

/// Gate state, only mutated under the gate's lock
struct GateState {
    /// Most recently admitted asset
    last_seen: Option<CandidateAsset>,
    /// Evaluations admitted and not yet finalized
    in_flight: usize,
}

/// Outcome of an admission attempt
#[derive(Debug)]
pub enum Admission {
    Admitted(AdmissionPermit),
    /// Same asset as the last admitted one
    Duplicate,
    /// Concurrency limit reached
    Saturated,
}

impl Admission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admitted(_) => "admitted",
            Self::Duplicate => "duplicate",
            Self::Saturated => "saturated",
        }
    }
}

/// Dedup and backpressure gate shared by all evaluations
pub struct AdmissionGate {
    limit: usize,
    state: Mutex<GateState>,
}

impl AdmissionGate {
    /// Create a gate; a limit of zero is treated as one
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            state: Mutex::new(GateState {
                last_seen: None,
                in_flight: 0,
            }),
        }
    }

    /// Try to admit `asset` for evaluation
    pub fn try_admit(self: &Arc<Self>, asset: &CandidateAsset) -> Admission {
        let mut state = self.state.lock();

        if state.last_seen.as_ref() == Some(asset) {
            return Admission::Duplicate;
        }

        if state.in_flight >= self.limit {
            return Admission::Saturated;
        }

        state.last_seen = Some(asset.clone());
        state.in_flight += 1;

        Admission::Admitted(AdmissionPermit {
            gate: Arc::clone(self),
            asset: asset.clone(),
            purchase_failed: false,
        })
    }

    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    pub fn last_seen(&self) -> Option<CandidateAsset> {
        self.state.lock().last_seen.clone()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    fn finalize(&self, asset: &CandidateAsset, purchase_failed: bool) {
        let mut state = self.state.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        // A newer admission keeps its slot
        if purchase_failed && state.last_seen.as_ref() == Some(asset) {
            state.last_seen = None;
        }
    }
}

/// One admitted evaluation; finalized when dropped
#[derive(Debug)]
pub struct AdmissionPermit {
    gate: Arc<AdmissionGate>,
    asset: CandidateAsset,
    purchase_failed: bool,
}

impl AdmissionPermit {
    pub fn asset(&self) -> &CandidateAsset {
        &self.asset
    }

    /// Mark the purchase as failed; on finalize the last-seen slot is cleared
    /// if it still holds this asset
    pub fn purchase_failed(&mut self) {
        self.purchase_failed = true;
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.gate.finalize(&self.asset, self.purchase_failed);
    }
}

impl std::fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("AdmissionGate")
            .field("limit", &self.limit)
            .field("in_flight", &state.in_flight)
            .field("last_seen", &state.last_seen)
            .finish()
    }
}
