//! Token debiting

use std::sync::Arc;

use chrono::NaiveDate;

use super::reset::QuotaResetPolicy;
use super::store::EntitlementStore;
use super::types::ConsumeOutcome;
use crate::error::{Error, Result};

/// Debits one unit of daily allowance per successful operation.
///
/// The ceiling check and the increment happen in one conditional store
/// write, so N concurrent consumers against `k` remaining units produce
/// exactly `min(N, k)` successes.
pub struct TokenConsumer<S: EntitlementStore + ?Sized> {
    store: Arc<S>,
    reset: QuotaResetPolicy,
}

impl<S: EntitlementStore + ?Sized> TokenConsumer<S> {
    pub fn new(store: Arc<S>, reset: QuotaResetPolicy) -> Self {
        Self { store, reset }
    }

    /// Spend one token for `operation`.
    ///
    /// Exhaustion is a normal outcome (`success: false`), not an error.
    pub async fn consume(&self, user_id: &str, operation: &str, today: NaiveDate) -> Result<ConsumeOutcome> {
        let operation = if operation.trim().is_empty() { "ai_processing" } else { operation };

        // Two passes at most: the second covers a row whose reset date moved
        // between the rollover and the debit.
        for attempt in 0..2 {
            let refreshed = self.reset.refresh(self.store.as_ref(), user_id, today).await?;
            // A caller whose clock is behind the row spends from the row's day
            let day = refreshed.last_reset_date.max(today);

            if let Some(updated) = self.store.try_consume(user_id, day).await? {
                let remaining = updated.remaining();
                log::info!(
                    "[entitlement:consume] User {} spent 1 token on {} ({} left)",
                    user_id,
                    operation,
                    remaining
                );
                return Ok(ConsumeOutcome::consumed(remaining, operation));
            }

            let current = self
                .store
                .get(user_id)
                .await?
                .ok_or_else(|| Error::not_found(format!("No entitlement for user {}", user_id)))?;

            if current.last_reset_date <= day {
                break;
            }
            log::debug!(
                "[entitlement:consume] Reset date moved for user {} (attempt {}), retrying",
                user_id,
                attempt + 1
            );
        }

        log::info!("[entitlement:consume] User {} is out of tokens for {}", user_id, today);
        Ok(ConsumeOutcome::exhausted())
    }
}
