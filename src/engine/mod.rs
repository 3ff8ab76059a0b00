//! Ingestion engine for the pool sniper
//!
//! Consumes raw transport payloads, normalizes them, gates admission and runs
//! each admitted asset through the decision pipeline on its own task.

mod buyer;
mod dispatcher;

pub use buyer::*;
pub use dispatcher::*;

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::gate::{Admission, AdmissionGate, AdmissionPermit};
use crate::metrics::MetricsState;
use crate::normalizer::{CandidateAsset, Normalized, Normalizer, RawEvent};
use crate::notifications::{CompositeNotifier, NotificationEvent};
use crate::pipeline::{CheckStep, DecisionPipeline, Verdict};
use crate::token::SignatureResolver;

/// Final result of one admitted evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvaluationOutcome {
    /// Pipeline accepted and the action did not fail
    Accepted(ActionOutcome),
    /// A check step rejected the asset
    Rejected { step: CheckStep, reason: String },
    /// Pipeline accepted but the purchase failed
    PurchaseFailed(String),
}

impl EvaluationOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accepted(_) => "accepted",
            Self::Rejected { .. } => "rejected",
            Self::PurchaseFailed(_) => "purchase_failed",
        }
    }
}

/// Gate, pipeline and dispatcher shared by all evaluation tasks
pub struct Evaluator {
    gate: Arc<AdmissionGate>,
    pipeline: DecisionPipeline,
    dispatcher: ActionDispatcher,
    metrics: Arc<MetricsState>,
    notifier: Arc<CompositeNotifier>,
}

impl Evaluator {
    pub fn new(
        gate: Arc<AdmissionGate>,
        pipeline: DecisionPipeline,
        dispatcher: ActionDispatcher,
        metrics: Arc<MetricsState>,
        notifier: Arc<CompositeNotifier>,
    ) -> Self {
        Self {
            gate,
            pipeline,
            dispatcher,
            metrics,
            notifier,
        }
    }

    pub fn gate(&self) -> &Arc<AdmissionGate> {
        &self.gate
    }

    /// Ask the gate to admit `asset`
    pub fn admit(&self, asset: &CandidateAsset) -> Option<AdmissionPermit> {
        let admission = self.gate.try_admit(asset);
        self.metrics
            .admissions
            .with_label_values(&[admission.as_str()])
            .inc();

        match admission {
            Admission::Admitted(permit) => {
                self.metrics.in_flight.set(self.gate.in_flight() as i64);
                tracing::info!(
                    mint = %asset,
                    in_flight = self.gate.in_flight(),
                    "Pool creation admitted"
                );
                self.notifier.spawn_notify(NotificationEvent::PoolDetected {
                    mint: asset.to_string(),
                    mode: self.pipeline.mode().to_string(),
                });
                Some(permit)
            }
            Admission::Duplicate => {
                tracing::debug!(mint = %asset, "Duplicate asset dropped");
                None
            }
            Admission::Saturated => {
                tracing::debug!(
                    mint = %asset,
                    limit = self.gate.limit(),
                    "Concurrency limit reached, asset dropped"
                );
                None
            }
        }
    }

    /// Run the pipeline and dispatcher for an admitted asset
    ///
    /// The permit is finalized before this returns.
    pub async fn evaluate(&self, mut permit: AdmissionPermit) -> EvaluationOutcome {
        let started = std::time::Instant::now();
        let asset = permit.asset().clone();

        let outcome = match self.pipeline.evaluate(&asset).await {
            Verdict::Reject { step, reason } => EvaluationOutcome::Rejected { step, reason },
            Verdict::Accept => match self.dispatcher.dispatch(&mut permit).await {
                ActionOutcome::PurchaseFailed(reason) => EvaluationOutcome::PurchaseFailed(reason),
                action => EvaluationOutcome::Accepted(action),
            },
        };

        drop(permit);

        self.metrics
            .verdicts
            .with_label_values(&[outcome.label()])
            .inc();
        self.metrics.in_flight.set(self.gate.in_flight() as i64);
        self.metrics
            .evaluation_latency
            .observe(started.elapsed().as_secs_f64() * 1000.0);

        tracing::info!(
            mint = %asset,
            outcome = outcome.label(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Evaluation finished"
        );

        outcome
    }

    /// Admit and evaluate inline; `None` when the gate dropped the asset
    pub async fn process(&self, asset: &CandidateAsset) -> Option<EvaluationOutcome> {
        let permit = self.admit(asset)?;
        Some(self.evaluate(permit).await)
    }
}

/// Event loop between the transport and the evaluator
pub struct Engine {
    normalizer: Normalizer,
    resolver: Option<Arc<dyn SignatureResolver>>,
    /// Bounds concurrent signature lookups
    resolving: Arc<Semaphore>,
    evaluator: Arc<Evaluator>,
    metrics: Arc<MetricsState>,
}

impl Engine {
    /// `resolve_limit` caps signature lookups in progress; extra signatures are dropped
    pub fn new(
        normalizer: Normalizer,
        resolver: Option<Arc<dyn SignatureResolver>>,
        resolve_limit: usize,
        evaluator: Arc<Evaluator>,
        metrics: Arc<MetricsState>,
    ) -> Self {
        Self {
            normalizer,
            resolver,
            resolving: Arc::new(Semaphore::new(resolve_limit.max(1))),
            evaluator,
            metrics,
        }
    }

    /// Process events until the channel closes or shutdown is requested
    ///
    /// In-flight evaluations are not awaited.
    pub async fn run(self, mut events: mpsc::Receiver<RawEvent>, shutdown: CancellationToken) {
        tracing::info!("Engine started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Engine shutting down");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        tracing::info!("Event channel closed, engine stopping");
                        break;
                    }
                },
            }
        }
    }

    /// Normalize one payload and start its evaluation without blocking the loop
    pub fn handle_event(&self, event: RawEvent) {
        self.metrics.events_received.inc();

        match self.normalizer.normalize(&event) {
            Normalized::Asset(asset) => {
                self.metrics.normalized.with_label_values(&["asset"]).inc();
                if let Some(permit) = self.evaluator.admit(&asset) {
                    let evaluator = Arc::clone(&self.evaluator);
                    tokio::spawn(async move {
                        evaluator.evaluate(permit).await;
                    });
                }
            }
            Normalized::Signature(signature) => {
                self.metrics
                    .normalized
                    .with_label_values(&["signature"])
                    .inc();
                let Some(resolver) = self.resolver.clone() else {
                    tracing::warn!(signature = %signature, "No signature resolver configured, dropping");
                    return;
                };
                let Ok(slot) = Arc::clone(&self.resolving).try_acquire_owned() else {
                    self.metrics
                        .admissions
                        .with_label_values(&["resolver_busy"])
                        .inc();
                    tracing::debug!(signature = %signature, "Resolver saturated, dropping signature");
                    return;
                };
                let evaluator = Arc::clone(&self.evaluator);
                tokio::spawn(resolve_and_evaluate(
                    resolver,
                    slot,
                    evaluator,
                    signature,
                    event.received_at,
                ));
            }
            Normalized::Skip(reason) => {
                self.metrics
                    .normalized
                    .with_label_values(&[reason.as_str()])
                    .inc();
            }
        }
    }
}

async fn resolve_and_evaluate(
    resolver: Arc<dyn SignatureResolver>,
    slot: OwnedSemaphorePermit,
    evaluator: Arc<Evaluator>,
    signature: String,
    received_at: DateTime<Utc>,
) {
    let resolved = resolver.resolve(&signature).await;
    drop(slot);

    let asset = match resolved {
        Ok(Some(asset)) => asset,
        Ok(None) => return,
        Err(e) => {
            tracing::debug!(signature = %signature, error = %e, "Signature resolution failed");
            return;
        }
    };

    tracing::debug!(
        signature = %signature,
        mint = %asset,
        resolve_ms = (Utc::now() - received_at).num_milliseconds(),
        "Signature resolved"
    );

    if let Some(permit) = evaluator.admit(&asset) {
        evaluator.evaluate(permit).await;
    }
}
