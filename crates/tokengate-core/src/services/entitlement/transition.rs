//! Plan transitions and the checkout lifecycle

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use super::catalog::{PlanCatalog, PlanConfig};
use super::gateway::{to_minor_units, GatewayOrder, PaymentCapture, PaymentVerificationGateway};
use super::store::EntitlementStore;
use super::types::{NewPayment, PaymentRecord, PaymentStatus, PlanId, TransitionOutcome};
use crate::error::{Error, Result};

/// Moves users between plans.
///
/// Upgrades require a gateway-confirmed payment and are keyed on the
/// payment id, so a replayed confirmation is answered with success and
/// applies nothing. Downgrades are always permitted.
pub struct SubscriptionTransitionManager<S: EntitlementStore + ?Sized> {
    store: Arc<S>,
    gateway: Arc<dyn PaymentVerificationGateway>,
    catalog: Arc<PlanCatalog>,
}

impl<S: EntitlementStore + ?Sized> SubscriptionTransitionManager<S> {
    pub fn new(
        store: Arc<S>,
        gateway: Arc<dyn PaymentVerificationGateway>,
        catalog: Arc<PlanCatalog>,
    ) -> Self {
        Self {
            store,
            gateway,
            catalog,
        }
    }

    pub fn gateway(&self) -> &dyn PaymentVerificationGateway {
        self.gateway.as_ref()
    }

    fn paid_plan(&self, target_plan: &str) -> Result<&PlanConfig> {
        let plan = self.catalog.resolve(target_plan)?;
        if !plan.is_paid() {
            return Err(Error::validation(format!(
                "Plan {} is free; use downgrade instead",
                plan.plan_id
            )));
        }
        Ok(plan)
    }

    async fn require_entitlement(&self, user_id: &str) -> Result<()> {
        match self.store.get(user_id).await? {
            Some(_) => Ok(()),
            None => Err(Error::not_found(format!("No entitlement for user {}", user_id))),
        }
    }

    /// Apply a paid upgrade.
    ///
    /// The ledger is keyed on the order the gateway reports for the
    /// capture, so an order id and a payment id naming the same money land
    /// on one record. The captured amount must match the plan's price, and
    /// unless the gateway opts out the caller must have opened the checkout.
    /// The entitlement change and the record completion commit together.
    pub async fn upgrade(
        &self,
        user_id: &str,
        target_plan: &str,
        payment_id: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome> {
        let plan = self.paid_plan(target_plan)?;
        if payment_id.trim().is_empty() {
            return Err(Error::validation("Payment id is required"));
        }
        self.require_entitlement(user_id).await?;

        // Cheap replay answer before asking the gateway
        if let Some(outcome) = self.replayed(user_id, payment_id).await? {
            return Ok(outcome);
        }

        let capture = self.gateway.confirm(payment_id).await?;
        if !capture.captured {
            log::warn!(
                "[entitlement:transition] {} did not confirm payment {} for user {}",
                self.gateway.name(),
                payment_id,
                user_id
            );
            return Err(Error::PaymentNotConfirmed(format!(
                "Payment {} is not captured",
                payment_id
            )));
        }
        Self::check_amount(plan, &capture)?;

        if capture.order_id != payment_id {
            if let Some(outcome) = self.replayed(user_id, &capture.order_id).await? {
                return Ok(outcome);
            }
        }

        let payment = NewPayment {
            order_id: capture.order_id.clone(),
            user_id: user_id.to_string(),
            amount: capture.amount.unwrap_or(plan.price),
            currency: capture.currency.unwrap_or_else(|| plan.currency.clone()),
            plan: plan.plan_id,
            payment_method: capture
                .method
                .or_else(|| Some(self.gateway.name().to_string())),
        };
        let require_checkout = self.gateway.requires_checkout();

        match self
            .store
            .apply_upgrade(user_id, plan, &payment, require_checkout, today, now)
            .await
        {
            Ok(entitlement) => Ok(TransitionOutcome {
                success: true,
                plan: entitlement.plan,
                applied: true,
            }),
            // Lost a race with a concurrent delivery of the same confirmation
            Err(Error::DuplicateTransition { payment_id }) => {
                log::info!(
                    "[entitlement:transition] Concurrent replay of payment {} ignored",
                    payment_id
                );
                Ok(TransitionOutcome {
                    success: true,
                    plan: plan.plan_id,
                    applied: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Answer for a ledger record that is already settled, if any.
    /// A record owned by someone else rejects the upgrade.
    async fn replayed(&self, user_id: &str, order_id: &str) -> Result<Option<TransitionOutcome>> {
        let Some(record) = self.store.find_payment(order_id).await? else {
            return Ok(None);
        };

        if record.user_id != user_id {
            return Err(Error::validation(format!(
                "Payment {} belongs to another user",
                order_id
            )));
        }
        if record.status != PaymentStatus::Completed {
            return Ok(None);
        }

        log::info!(
            "[entitlement:transition] Payment {} already applied for user {}",
            order_id,
            user_id
        );
        Ok(Some(TransitionOutcome {
            success: true,
            plan: record.plan,
            applied: false,
        }))
    }

    /// A capture that reports its amount must pay exactly the plan's price
    fn check_amount(plan: &PlanConfig, capture: &PaymentCapture) -> Result<()> {
        if let Some(amount) = capture.amount {
            if to_minor_units(amount) != to_minor_units(plan.price) {
                return Err(Error::validation(format!(
                    "Payment {} is for {:.2}, plan {} costs {:.2}",
                    capture.payment_id, amount, plan.plan_id, plan.price
                )));
            }
        }
        if let Some(currency) = &capture.currency {
            if !currency.eq_ignore_ascii_case(&plan.currency) {
                return Err(Error::validation(format!(
                    "Payment {} is in {}, plan {} is priced in {}",
                    capture.payment_id, currency, plan.plan_id, plan.currency
                )));
            }
        }
        Ok(())
    }

    /// Return to the free tier. Today's elevated allowance is discarded.
    pub async fn downgrade(
        &self,
        user_id: &str,
        target_plan: Option<&str>,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome> {
        let plan = match target_plan {
            Some(id) => self.catalog.resolve(id)?,
            None => self.catalog.free_plan(),
        };
        if plan.plan_id != PlanId::Basic {
            return Err(Error::validation(format!(
                "Cannot downgrade to {}; only {} is allowed",
                plan.plan_id,
                PlanId::Basic
            )));
        }

        let entitlement = self.store.apply_downgrade(user_id, plan, today, now).await?;
        Ok(TransitionOutcome {
            success: true,
            plan: entitlement.plan,
            applied: true,
        })
    }

    /// Open a checkout: record a pending payment for `order_id`
    pub async fn begin_checkout(
        &self,
        user_id: &str,
        target_plan: &str,
        order_id: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let plan = self.paid_plan(target_plan)?;
        let payment = NewPayment {
            order_id: order_id.to_string(),
            user_id: user_id.to_string(),
            amount: plan.price,
            currency: plan.currency.clone(),
            plan: plan.plan_id,
            payment_method: None,
        };
        self.store.begin_checkout(&payment, now).await
    }

    /// Ask the gateway for an order and open a checkout against it
    pub async fn create_order(&self, user_id: &str, target_plan: &str, now: DateTime<Utc>) -> Result<GatewayOrder> {
        let plan = self.paid_plan(target_plan)?;
        self.require_entitlement(user_id).await?;

        let receipt = format!("rcpt_{}_{}", user_id, now.timestamp());
        let order = self.gateway.create_order(plan, &receipt).await?;
        self.begin_checkout(user_id, target_plan, &order.order_id, now).await?;
        Ok(order)
    }

    /// Abandon a checkout. Returns false when nothing was pending.
    pub async fn fail_checkout(&self, user_id: &str, order_id: &str, now: DateTime<Utc>) -> Result<bool> {
        self.store.fail_checkout(user_id, order_id, now).await
    }

    pub async fn payment_history(&self, user_id: &str) -> Result<Vec<PaymentRecord>> {
        self.store.payment_history(user_id).await
    }
}
