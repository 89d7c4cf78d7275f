//! Lazy daily quota rollover
//!
//! There is no scheduler: the first touch of an entitlement on a new
//! calendar day rolls `used_today` back to zero. Only calendar dates are
//! compared, so an idle week still rolls over on the next touch.

use std::sync::Arc;

use chrono::NaiveDate;

use super::catalog::PlanCatalog;
use super::store::EntitlementStore;
use super::types::Entitlement;
use crate::error::{Error, Result};

/// Rolls a user's daily usage counter back to zero on a new day
#[derive(Debug, Clone)]
pub struct QuotaResetPolicy {
    catalog: Arc<PlanCatalog>,
}

impl QuotaResetPolicy {
    pub fn new(catalog: Arc<PlanCatalog>) -> Self {
        Self { catalog }
    }

    /// Only a later day rolls over. A request whose `today` was computed
    /// before midnight must not rewind a row already moved to the new day.
    pub fn needs_reset(&self, entitlement: &Entitlement, today: NaiveDate) -> bool {
        entitlement.last_reset_date < today
    }

    /// Pure rollover. The daily limit is re-read from the catalog so an
    /// allowance change takes effect at the next natural reset.
    pub fn apply(&self, entitlement: Entitlement, today: NaiveDate) -> Entitlement {
        if !self.needs_reset(&entitlement, today) {
            return entitlement;
        }

        let plan = self.catalog.get(entitlement.plan);
        Entitlement {
            daily_limit: plan.daily_token_allowance,
            used_today: 0,
            last_reset_date: today,
            ..entitlement
        }
    }

    /// Load the entitlement and persist the rollover if it is due.
    ///
    /// The write only sets absolute values and is guarded on the old reset
    /// date, so two racing requests converge on the same row.
    pub async fn refresh<S>(&self, store: &S, user_id: &str, today: NaiveDate) -> Result<Entitlement>
    where
        S: EntitlementStore + ?Sized,
    {
        let current = store
            .get(user_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("No entitlement for user {}", user_id)))?;

        if !self.needs_reset(&current, today) {
            return Ok(current);
        }

        let reset = self.apply(current.clone(), today);
        let written = store
            .reset_daily(user_id, current.plan, current.last_reset_date, today, reset.daily_limit)
            .await?;

        if written {
            log::info!(
                "[entitlement:reset] Rolled over user {} from {} to {} (limit {})",
                user_id,
                current.last_reset_date,
                today,
                reset.daily_limit
            );
            return Ok(reset);
        }

        // Another request reset or transitioned the row first
        log::debug!("[entitlement:reset] Lost reset race for user {}, re-reading", user_id);
        store
            .get(user_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("No entitlement for user {}", user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::entitlement::types::{DailyLimit, PlanId, SubscriptionStatus};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entitlement(plan: PlanId, limit: DailyLimit, used: i64, last_reset: NaiveDate) -> Entitlement {
        Entitlement {
            user_id: "user-1".to_string(),
            plan,
            status: SubscriptionStatus::Active,
            daily_limit: limit,
            used_today: used,
            total_used: 42,
            last_reset_date: last_reset,
            subscription_start_date: None,
            subscription_end_date: None,
        }
    }

    fn policy() -> QuotaResetPolicy {
        QuotaResetPolicy::new(Arc::new(PlanCatalog::built_in()))
    }

    #[test]
    fn test_same_day_is_unchanged() {
        let today = date(2026, 5, 10);
        let ent = entitlement(PlanId::Basic, DailyLimit::Limited(10), 7, today);
        assert_eq!(policy().apply(ent.clone(), today), ent);
    }

    #[test]
    fn test_new_day_resets_usage_but_not_total() {
        let ent = entitlement(PlanId::Basic, DailyLimit::Limited(10), 10, date(2026, 5, 9));
        let reset = policy().apply(ent, date(2026, 5, 10));
        assert_eq!(reset.used_today, 0);
        assert_eq!(reset.total_used, 42);
        assert_eq!(reset.last_reset_date, date(2026, 5, 10));
    }

    #[test]
    fn test_idle_week_still_rolls_over() {
        let ent = entitlement(PlanId::Pro, DailyLimit::Limited(100), 55, date(2026, 5, 1));
        let reset = policy().apply(ent, date(2026, 5, 8));
        assert_eq!(reset.used_today, 0);
        assert_eq!(reset.last_reset_date, date(2026, 5, 8));
    }

    #[test]
    fn test_reset_picks_up_catalog_allowance() {
        // Stored limit is stale; the catalog says 100 for pro
        let ent = entitlement(PlanId::Pro, DailyLimit::Limited(50), 3, date(2026, 5, 9));
        let reset = policy().apply(ent, date(2026, 5, 10));
        assert_eq!(reset.daily_limit, DailyLimit::Limited(100));
    }

    #[test]
    fn test_earlier_day_does_not_rewind() {
        let ent = entitlement(PlanId::Basic, DailyLimit::Limited(10), 10, date(2026, 5, 10));
        assert!(!policy().needs_reset(&ent, date(2026, 5, 9)));
        assert_eq!(policy().apply(ent.clone(), date(2026, 5, 9)), ent);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let today = date(2026, 5, 10);
        let ent = entitlement(PlanId::Basic, DailyLimit::Limited(10), 4, date(2026, 5, 9));
        let once = policy().apply(ent, today);
        let twice = policy().apply(once.clone(), today);
        assert_eq!(once, twice);
    }
}
