//! Scripted collaborators shared by the unit and integration suites

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pool_sniper::engine::{Buyer, BuyOrder};
use pool_sniper::error::{AppError, AppResult};
use pool_sniper::normalizer::CandidateAsset;
use pool_sniper::pipeline::{
    AuthorityLookup, AuthorityStatus, CheckPolicy, DecisionPipeline, Mode, RugCheck,
    RugPullHeuristic,
};

/// Authority lookup returning a fixed status, or an error when `None`
pub struct MockAuthorities {
    status: Option<AuthorityStatus>,
    calls: AtomicUsize,
}

impl MockAuthorities {
    pub fn returning(status: AuthorityStatus) -> Arc<Self> {
        Arc::new(Self {
            status: Some(status),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn secure() -> Arc<Self> {
        Self::returning(AuthorityStatus::new(None, None))
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            status: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthorityLookup for MockAuthorities {
    async fn get_authorities(&self, _asset: &CandidateAsset) -> AppResult<AuthorityStatus> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.status
            .clone()
            .ok_or_else(|| AppError::Lookup("account not found".to_string()))
    }
}

/// Boolean collaborator used for both the rug check and the age heuristic
pub struct MockVerdict {
    verdict: Option<bool>,
    calls: AtomicUsize,
}

impl MockVerdict {
    pub fn returning(verdict: bool) -> Arc<Self> {
        Arc::new(Self {
            verdict: Some(verdict),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            verdict: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer(&self) -> AppResult<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdict
            .ok_or_else(|| AppError::Check("service unavailable".to_string()))
    }
}

#[async_trait]
impl RugCheck for MockVerdict {
    async fn is_confirmed_safe(&self, _asset: &CandidateAsset) -> AppResult<bool> {
        self.answer()
    }
}

#[async_trait]
impl RugPullHeuristic for MockVerdict {
    async fn is_likely_rug_pull(&self, _asset: &CandidateAsset) -> AppResult<bool> {
        self.answer()
    }
}

/// Buyer recording every order; `None` result means a provider error
pub struct MockBuyer {
    result: Option<bool>,
    orders: Mutex<Vec<BuyOrder>>,
}

impl MockBuyer {
    pub fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            result: Some(true),
            orders: Mutex::new(Vec::new()),
        })
    }

    pub fn declining() -> Arc<Self> {
        Arc::new(Self {
            result: Some(false),
            orders: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            result: None,
            orders: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.orders.lock().len()
    }

    pub fn orders(&self) -> Vec<BuyOrder> {
        self.orders.lock().clone()
    }
}

#[async_trait]
impl Buyer for MockBuyer {
    async fn buy(&self, order: &BuyOrder) -> AppResult<bool> {
        self.orders.lock().push(order.clone());
        self.result
            .ok_or_else(|| AppError::Buy("provider unreachable".to_string()))
    }
}

/// Collaborators wired into a pipeline, kept for call assertions
pub struct Collaborators {
    pub authorities: Arc<MockAuthorities>,
    pub rug_check: Arc<MockVerdict>,
    pub rug_pull: Arc<MockVerdict>,
}

impl Collaborators {
    /// Everything passes
    pub fn passing() -> Self {
        Self {
            authorities: MockAuthorities::secure(),
            rug_check: MockVerdict::returning(true),
            rug_pull: MockVerdict::returning(false),
        }
    }

    pub fn pipeline(&self, mode: Mode, policy: CheckPolicy) -> DecisionPipeline {
        DecisionPipeline::new(
            mode,
            policy,
            self.authorities.clone(),
            self.rug_check.clone(),
            self.rug_pull.clone(),
        )
    }
}

pub fn asset(s: &str) -> CandidateAsset {
    CandidateAsset::parse(s).unwrap()
}
