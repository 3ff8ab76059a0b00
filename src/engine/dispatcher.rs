//! Action dispatch for accepted assets

use std::sync::Arc;

use super::buyer::{Buyer, OrderTemplate};
use crate::gate::AdmissionPermit;
use crate::notifications::{CompositeNotifier, NotificationEvent};

/// What happened to an accepted asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Simulation mode, no call made
    Simulated,
    /// No live provider configured, no call made
    NoProvider,
    Purchased,
    /// Provider failed; the last-seen slot is released
    PurchaseFailed(String),
}

/// Invokes the buyer for accepted assets
pub struct ActionDispatcher {
    simulation_mode: bool,
    buyer: Option<Arc<dyn Buyer>>,
    template: OrderTemplate,
    notifier: Arc<CompositeNotifier>,
}

impl ActionDispatcher {
    pub fn new(
        simulation_mode: bool,
        buyer: Option<Arc<dyn Buyer>>,
        template: OrderTemplate,
        notifier: Arc<CompositeNotifier>,
    ) -> Self {
        Self {
            simulation_mode,
            buyer,
            template,
            notifier,
        }
    }

    /// Act on an accepted asset
    ///
    /// A failed purchase marks the permit so the gate clears its last-seen
    /// slot when the evaluation finalizes.
    pub async fn dispatch(&self, permit: &mut AdmissionPermit) -> ActionOutcome {
        let mint = permit.asset().to_string();

        if self.simulation_mode {
            tracing::info!(mint = %mint, amount_sol = self.template.amount_sol, "Simulation mode, skipping buy");
            self.notifier.spawn_notify(NotificationEvent::PurchaseSimulated {
                mint,
                amount_sol: self.template.amount_sol,
            });
            return ActionOutcome::Simulated;
        }

        let Some(buyer) = self.buyer.as_ref() else {
            tracing::warn!(mint = %mint, "No purchase provider configured, accepting without action");
            return ActionOutcome::NoProvider;
        };

        let order = self.template.order_for(&mint);
        let reason = match buyer.buy(&order).await {
            Ok(true) => {
                self.notifier.spawn_notify(NotificationEvent::PurchaseExecuted {
                    mint,
                    amount_sol: order.amount_sol,
                });
                return ActionOutcome::Purchased;
            }
            Ok(false) => "provider declined the order".to_string(),
            Err(e) => e.to_string(),
        };

        tracing::warn!(mint = %mint, reason = %reason, "Purchase failed");
        permit.purchase_failed();
        self.notifier.spawn_notify(NotificationEvent::PurchaseFailed {
            mint,
            reason: reason.clone(),
        });
        ActionOutcome::PurchaseFailed(reason)
    }
}
