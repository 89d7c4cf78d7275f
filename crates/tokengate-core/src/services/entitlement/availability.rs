//! Read-side quota queries

use std::sync::Arc;

use chrono::NaiveDate;

use super::reset::QuotaResetPolicy;
use super::store::EntitlementStore;
use super::types::{Availability, TokenStatus};
use crate::error::Result;

/// Answers "may this user spend a token right now" without spending one.
///
/// Advisory only: the authoritative decision is made atomically when a
/// token is consumed.
pub struct AvailabilityChecker<S: EntitlementStore + ?Sized> {
    store: Arc<S>,
    reset: QuotaResetPolicy,
}

impl<S: EntitlementStore + ?Sized> AvailabilityChecker<S> {
    pub fn new(store: Arc<S>, reset: QuotaResetPolicy) -> Self {
        Self { store, reset }
    }

    pub async fn check(&self, user_id: &str, today: NaiveDate) -> Result<Availability> {
        let entitlement = self.reset.refresh(self.store.as_ref(), user_id, today).await?;
        let tokens_remaining = entitlement.remaining();

        Ok(Availability {
            available: tokens_remaining.has_quota(),
            tokens_remaining,
        })
    }

    /// Full usage report, after any due rollover
    pub async fn status(&self, user_id: &str, today: NaiveDate) -> Result<TokenStatus> {
        let entitlement = self.reset.refresh(self.store.as_ref(), user_id, today).await?;
        log::debug!(
            "[entitlement:availability] User {} on {}: {}/{} used",
            user_id,
            entitlement.plan,
            entitlement.used_today,
            entitlement.daily_limit
        );
        Ok(entitlement.status_report())
    }
}
