//! Entitlement service facade
//!
//! Wires the components over one store and one catalog, stamps every call
//! with the configured calendar day, and retries a transient store failure
//! once. Every write underneath is all-or-nothing, so the retry never
//! observes partial state.

use std::future::Future;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use super::availability::AvailabilityChecker;
use super::catalog::{PlanCatalog, PlanConfig};
use super::consumer::TokenConsumer;
use super::gateway::{GatewayOrder, PaymentVerificationGateway};
use super::reset::QuotaResetPolicy;
use super::store::EntitlementStore;
use super::transition::SubscriptionTransitionManager;
use super::types::{Availability, ConsumeOutcome, PaymentRecord, TokenStatus, TransitionOutcome};
use crate::config::DayBoundary;
use crate::error::Result;

/// Run `op`, retrying once if it fails with a transient store error
pub async fn retry_once<T, F, Fut>(label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match op().await {
        Err(e) if e.is_transient() => {
            log::warn!("[entitlement:service] {} failed ({}), retrying once", label, e);
            op().await
        }
        other => other,
    }
}

/// Entry point used by the HTTP server and the CLI
pub struct EntitlementService<S: EntitlementStore + ?Sized> {
    store: Arc<S>,
    catalog: Arc<PlanCatalog>,
    day_boundary: DayBoundary,
    checker: AvailabilityChecker<S>,
    consumer: TokenConsumer<S>,
    transitions: SubscriptionTransitionManager<S>,
}

impl<S: EntitlementStore + ?Sized> EntitlementService<S> {
    pub fn new(
        store: Arc<S>,
        catalog: Arc<PlanCatalog>,
        gateway: Arc<dyn PaymentVerificationGateway>,
        day_boundary: DayBoundary,
    ) -> Self {
        let reset = QuotaResetPolicy::new(catalog.clone());
        Self {
            checker: AvailabilityChecker::new(store.clone(), reset.clone()),
            consumer: TokenConsumer::new(store.clone(), reset),
            transitions: SubscriptionTransitionManager::new(store.clone(), gateway, catalog.clone()),
            store,
            catalog,
            day_boundary,
        }
    }

    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    pub fn plans(&self) -> Vec<&PlanConfig> {
        self.catalog.list()
    }

    pub fn gateway(&self) -> &dyn PaymentVerificationGateway {
        self.transitions.gateway()
    }

    pub fn day_boundary(&self) -> &DayBoundary {
        &self.day_boundary
    }

    fn today(&self) -> NaiveDate {
        self.day_boundary.today()
    }

    /// Create free-tier defaults for a user without a record
    pub async fn ensure_entitlement(&self, user_id: &str) -> Result<bool> {
        let today = self.today();
        retry_once("ensure_entitlement", || {
            self.store.create_default(user_id, self.catalog.free_plan(), today)
        })
        .await
    }

    pub async fn check(&self, user_id: &str) -> Result<Availability> {
        let today = self.today();
        retry_once("check", || self.checker.check(user_id, today)).await
    }

    pub async fn status(&self, user_id: &str) -> Result<TokenStatus> {
        let today = self.today();
        retry_once("status", || self.checker.status(user_id, today)).await
    }

    pub async fn consume(&self, user_id: &str, operation: &str) -> Result<ConsumeOutcome> {
        let today = self.today();
        retry_once("consume", || self.consumer.consume(user_id, operation, today)).await
    }

    pub async fn upgrade(&self, user_id: &str, target_plan: &str, payment_id: &str) -> Result<TransitionOutcome> {
        let now = Utc::now();
        let today = self.day_boundary.date_of(now);
        retry_once("upgrade", || {
            self.transitions.upgrade(user_id, target_plan, payment_id, today, now)
        })
        .await
    }

    pub async fn downgrade(&self, user_id: &str, target_plan: Option<&str>) -> Result<TransitionOutcome> {
        let now = Utc::now();
        let today = self.day_boundary.date_of(now);
        retry_once("downgrade", || {
            self.transitions.downgrade(user_id, target_plan, today, now)
        })
        .await
    }

    pub async fn begin_checkout(&self, user_id: &str, target_plan: &str, order_id: &str) -> Result<()> {
        let now = Utc::now();
        retry_once("begin_checkout", || {
            self.transitions.begin_checkout(user_id, target_plan, order_id, now)
        })
        .await
    }

    /// Not retried: a second attempt would open a second gateway order
    pub async fn create_order(&self, user_id: &str, target_plan: &str) -> Result<GatewayOrder> {
        self.transitions.create_order(user_id, target_plan, Utc::now()).await
    }

    pub async fn fail_checkout(&self, user_id: &str, order_id: &str) -> Result<bool> {
        let now = Utc::now();
        retry_once("fail_checkout", || self.transitions.fail_checkout(user_id, order_id, now)).await
    }

    pub async fn payment_history(&self, user_id: &str) -> Result<Vec<PaymentRecord>> {
        retry_once("payment_history", || self.transitions.payment_history(user_id)).await
    }
}
