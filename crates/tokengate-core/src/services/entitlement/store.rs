//! Entitlement storage layer
//!
//! The store is the only shared state between requests and server
//! instances, so every correctness rule is enforced by a single
//! conditional statement or a transaction here, never by read-then-write
//! logic in callers.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};

use super::catalog::PlanConfig;
use super::types::{
    DailyLimit, Entitlement, NewPayment, PaymentRecord, PaymentStatus, PlanId, SubscriptionStatus,
};
use crate::error::{Error, Result};

const ENTITLEMENT_COLUMNS: &str = "user_id, plan, status, daily_limit, used_today, total_used, \
     last_reset_date, subscription_start_date, subscription_end_date";

const PAYMENT_COLUMNS: &str =
    "order_id, user_id, amount, currency, status, plan, payment_method, created_at, completed_at";

// ============================================================================
// Database Row Types
// ============================================================================

/// Database row representation of an entitlement
#[derive(Debug, Clone, FromRow)]
pub struct StoredEntitlement {
    pub user_id: String,
    pub plan: String,
    pub status: String,
    pub daily_limit: i64,
    pub used_today: i64,
    pub total_used: i64,
    pub last_reset_date: NaiveDate,
    pub subscription_start_date: Option<DateTime<Utc>>,
    pub subscription_end_date: Option<DateTime<Utc>>,
}

impl StoredEntitlement {
    /// Convert database row to Entitlement
    pub fn to_entitlement(&self) -> Result<Entitlement> {
        let corrupt = |what: String| {
            Error::internal(format!("Corrupt entitlement for user {}: {}", self.user_id, what))
        };

        Ok(Entitlement {
            user_id: self.user_id.clone(),
            plan: self.plan.parse::<PlanId>().map_err(corrupt)?,
            status: self.status.parse::<SubscriptionStatus>().map_err(corrupt)?,
            daily_limit: DailyLimit::try_from(self.daily_limit).map_err(corrupt)?,
            used_today: self.used_today,
            total_used: self.total_used,
            last_reset_date: self.last_reset_date,
            subscription_start_date: self.subscription_start_date,
            subscription_end_date: self.subscription_end_date,
        })
    }
}

/// Database row representation of a payment record
#[derive(Debug, Clone, FromRow)]
pub struct StoredPaymentRecord {
    pub order_id: String,
    pub user_id: String,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    pub plan: String,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl StoredPaymentRecord {
    /// Convert database row to PaymentRecord
    pub fn to_payment_record(&self) -> Result<PaymentRecord> {
        let corrupt = |what: String| {
            Error::internal(format!("Corrupt payment record {}: {}", self.order_id, what))
        };

        Ok(PaymentRecord {
            order_id: self.order_id.clone(),
            user_id: self.user_id.clone(),
            amount: self.amount,
            currency: self.currency.clone(),
            status: self.status.parse::<PaymentStatus>().map_err(corrupt)?,
            plan: self.plan.parse::<PlanId>().map_err(corrupt)?,
            payment_method: self.payment_method.clone(),
            timestamp: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

// ============================================================================
// Store Trait
// ============================================================================

/// Persistent per-user entitlement records and the payment ledger
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// Load the entitlement for a user
    async fn get(&self, user_id: &str) -> Result<Option<Entitlement>>;

    /// Insert the free-tier defaults unless a record already exists.
    /// Returns true when a row was created.
    async fn create_default(&self, user_id: &str, plan: &PlanConfig, today: NaiveDate) -> Result<bool>;

    /// Daily rollover. Applied only while the row still has `plan` and
    /// `last_reset`, and only forward in time; returns false when another
    /// writer got there first or `today` is not after `last_reset`.
    async fn reset_daily(
        &self,
        user_id: &str,
        plan: PlanId,
        last_reset: NaiveDate,
        today: NaiveDate,
        daily_limit: DailyLimit,
    ) -> Result<bool>;

    /// Debit one unit if, and only if, quota remains for `today`.
    /// Returns the updated entitlement, or None when nothing was debited.
    async fn try_consume(&self, user_id: &str, today: NaiveDate) -> Result<Option<Entitlement>>;

    /// Complete `payment` and move the user onto `plan` in one transaction.
    /// Fails with `DuplicateTransition` when the payment is already completed.
    ///
    /// With `require_checkout` the pending record must already exist;
    /// otherwise one is appended first.
    async fn apply_upgrade(
        &self,
        user_id: &str,
        plan: &PlanConfig,
        payment: &NewPayment,
        require_checkout: bool,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Entitlement>;

    /// Move the user onto `plan` with a fresh day of its allowance
    async fn apply_downgrade(
        &self,
        user_id: &str,
        plan: &PlanConfig,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Entitlement>;

    /// Append a pending payment and mark the entitlement pending
    async fn begin_checkout(&self, payment: &NewPayment, now: DateTime<Utc>) -> Result<()>;

    /// Mark a pending payment failed and return the entitlement to active.
    /// Returns false when no pending payment matched.
    async fn fail_checkout(&self, user_id: &str, order_id: &str, now: DateTime<Utc>) -> Result<bool>;

    /// Look up a payment by order id
    async fn find_payment(&self, order_id: &str) -> Result<Option<PaymentRecord>>;

    /// All payments of a user, newest first
    async fn payment_history(&self, user_id: &str) -> Result<Vec<PaymentRecord>>;
}

// ============================================================================
// SqliteEntitlementStore
// ============================================================================

/// SQLite implementation of [`EntitlementStore`]
#[derive(Clone)]
pub struct SqliteEntitlementStore {
    pool: SqlitePool,
}

impl SqliteEntitlementStore {
    /// Create a new store with the given database pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a pending ledger row inside `tx`; false if the order id exists
    async fn insert_pending_payment(
        tx: &mut Transaction<'_, Sqlite>,
        payment: &NewPayment,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO payment_records
            (order_id, user_id, amount, currency, status, plan, payment_method, created_at)
            VALUES (?, ?, ?, ?, 'pending', ?, ?, ?)
            ON CONFLICT(order_id) DO NOTHING
            "#,
        )
        .bind(&payment.order_id)
        .bind(&payment.user_id)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(payment.plan.as_str())
        .bind(&payment.payment_method)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_payment_in(
        tx: &mut Transaction<'_, Sqlite>,
        order_id: &str,
    ) -> Result<Option<PaymentRecord>> {
        let row = sqlx::query_as::<_, StoredPaymentRecord>(&format!(
            "SELECT {} FROM payment_records WHERE order_id = ?",
            PAYMENT_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&mut **tx)
        .await?;

        row.map(|r| r.to_payment_record()).transpose()
    }
}

#[async_trait]
impl EntitlementStore for SqliteEntitlementStore {
    async fn get(&self, user_id: &str) -> Result<Option<Entitlement>> {
        let row = sqlx::query_as::<_, StoredEntitlement>(&format!(
            "SELECT {} FROM entitlements WHERE user_id = ?",
            ENTITLEMENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.to_entitlement()).transpose()
    }

    async fn create_default(&self, user_id: &str, plan: &PlanConfig, today: NaiveDate) -> Result<bool> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO entitlements
            (user_id, plan, status, daily_limit, used_today, total_used, last_reset_date,
             subscription_start_date, subscription_end_date, updated_at)
            VALUES (?, ?, 'active', ?, 0, 0, ?, ?, NULL, ?)
            ON CONFLICT(user_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(plan.plan_id.as_str())
        .bind(i64::from(plan.daily_token_allowance))
        .bind(today)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() > 0;
        if created {
            log::info!("[entitlement:store] Created {} entitlement for user {}", plan.plan_id, user_id);
        }
        Ok(created)
    }

    async fn reset_daily(
        &self,
        user_id: &str,
        plan: PlanId,
        last_reset: NaiveDate,
        today: NaiveDate,
        daily_limit: DailyLimit,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE entitlements
            SET used_today = 0, daily_limit = ?, last_reset_date = ?, updated_at = ?
            WHERE user_id = ? AND plan = ? AND last_reset_date = ? AND last_reset_date < ?
            "#,
        )
        .bind(i64::from(daily_limit))
        .bind(today)
        .bind(Utc::now())
        .bind(user_id)
        .bind(plan.as_str())
        .bind(last_reset)
        .bind(today)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn try_consume(&self, user_id: &str, today: NaiveDate) -> Result<Option<Entitlement>> {
        // Single conditional statement: the ceiling check and the increment
        // cannot be interleaved by another writer.
        let row = sqlx::query_as::<_, StoredEntitlement>(&format!(
            r#"
            UPDATE entitlements
            SET used_today = used_today + 1, total_used = total_used + 1, updated_at = ?
            WHERE user_id = ?
              AND last_reset_date = ?
              AND (daily_limit = -1 OR used_today < daily_limit)
            RETURNING {}
            "#,
            ENTITLEMENT_COLUMNS
        ))
        .bind(Utc::now())
        .bind(user_id)
        .bind(today)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.to_entitlement()).transpose()
    }

    async fn apply_upgrade(
        &self,
        user_id: &str,
        plan: &PlanConfig,
        payment: &NewPayment,
        require_checkout: bool,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Entitlement> {
        // Dropping `tx` on any early return rolls everything back
        let mut tx = self.pool.begin().await?;

        // Either first statement is a write, so the transaction takes the
        // write lock up front
        if !require_checkout {
            Self::insert_pending_payment(&mut tx, payment, now).await?;
        }

        let completed = sqlx::query(
            r#"
            UPDATE payment_records
            SET status = 'completed', completed_at = ?, payment_method = COALESCE(?, payment_method)
            WHERE order_id = ? AND user_id = ? AND plan = ? AND status = 'pending'
            "#,
        )
        .bind(now)
        .bind(&payment.payment_method)
        .bind(&payment.order_id)
        .bind(user_id)
        .bind(plan.plan_id.as_str())
        .execute(&mut *tx)
        .await?;

        if completed.rows_affected() == 0 {
            let existing = Self::find_payment_in(&mut tx, &payment.order_id).await?;
            return Err(match existing {
                Some(record) if record.user_id != user_id => Error::validation(format!(
                    "Payment {} belongs to another user",
                    payment.order_id
                )),
                Some(record) if record.status == PaymentStatus::Completed => {
                    Error::DuplicateTransition {
                        payment_id: payment.order_id.clone(),
                    }
                }
                Some(record) if record.status == PaymentStatus::Failed => Error::PaymentNotConfirmed(
                    format!("Payment {} is marked failed", payment.order_id),
                ),
                Some(record) => Error::validation(format!(
                    "Payment {} was opened for plan {}, not {}",
                    payment.order_id, record.plan, plan.plan_id
                )),
                None if require_checkout => Error::validation(format!(
                    "No checkout was opened for order {}",
                    payment.order_id
                )),
                None => Error::internal(format!("Payment {} vanished mid-transaction", payment.order_id)),
            });
        }

        let row = sqlx::query_as::<_, StoredEntitlement>(&format!(
            r#"
            UPDATE entitlements
            SET plan = ?, status = 'active', daily_limit = ?, used_today = 0,
                last_reset_date = ?, subscription_start_date = ?, subscription_end_date = NULL,
                updated_at = ?
            WHERE user_id = ?
            RETURNING {}
            "#,
            ENTITLEMENT_COLUMNS
        ))
        .bind(plan.plan_id.as_str())
        .bind(i64::from(plan.daily_token_allowance))
        .bind(today)
        .bind(now)
        .bind(now)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::not_found(format!("No entitlement for user {}", user_id)))?;

        let entitlement = row.to_entitlement()?;
        tx.commit().await?;

        log::info!(
            "[entitlement:store] Upgraded user {} to {} with payment {}",
            user_id,
            plan.plan_id,
            payment.order_id
        );
        Ok(entitlement)
    }

    async fn apply_downgrade(
        &self,
        user_id: &str,
        plan: &PlanConfig,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Entitlement> {
        let row = sqlx::query_as::<_, StoredEntitlement>(&format!(
            r#"
            UPDATE entitlements
            SET plan = ?, status = 'active', daily_limit = ?, used_today = 0,
                last_reset_date = ?, subscription_start_date = ?, subscription_end_date = NULL,
                updated_at = ?
            WHERE user_id = ?
            RETURNING {}
            "#,
            ENTITLEMENT_COLUMNS
        ))
        .bind(plan.plan_id.as_str())
        .bind(i64::from(plan.daily_token_allowance))
        .bind(today)
        .bind(now)
        .bind(now)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::not_found(format!("No entitlement for user {}", user_id)))?;

        log::info!("[entitlement:store] Downgraded user {} to {}", user_id, plan.plan_id);
        row.to_entitlement()
    }

    async fn begin_checkout(&self, payment: &NewPayment, now: DateTime<Utc>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        if !Self::insert_pending_payment(&mut tx, payment, now).await? {
            return Err(Error::validation(format!(
                "Order {} is already recorded",
                payment.order_id
            )));
        }

        let updated = sqlx::query(
            "UPDATE entitlements SET status = 'pending', updated_at = ? WHERE user_id = ?",
        )
        .bind(now)
        .bind(&payment.user_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(Error::not_found(format!(
                "No entitlement for user {}",
                payment.user_id
            )));
        }

        tx.commit().await?;
        log::info!(
            "[entitlement:store] Opened checkout {} for user {} ({})",
            payment.order_id,
            payment.user_id,
            payment.plan
        );
        Ok(())
    }

    async fn fail_checkout(&self, user_id: &str, order_id: &str, now: DateTime<Utc>) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let failed = sqlx::query(
            r#"
            UPDATE payment_records SET status = 'failed', completed_at = ?
            WHERE order_id = ? AND user_id = ? AND status = 'pending'
            "#,
        )
        .bind(now)
        .bind(order_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if failed.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE entitlements SET status = 'active', updated_at = ?
            WHERE user_id = ? AND status = 'pending'
            "#,
        )
        .bind(now)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        log::info!("[entitlement:store] Checkout {} failed for user {}", order_id, user_id);
        Ok(true)
    }

    async fn find_payment(&self, order_id: &str) -> Result<Option<PaymentRecord>> {
        let row = sqlx::query_as::<_, StoredPaymentRecord>(&format!(
            "SELECT {} FROM payment_records WHERE order_id = ?",
            PAYMENT_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.to_payment_record()).transpose()
    }

    async fn payment_history(&self, user_id: &str) -> Result<Vec<PaymentRecord>> {
        let rows = sqlx::query_as::<_, StoredPaymentRecord>(&format!(
            "SELECT {} FROM payment_records WHERE user_id = ? ORDER BY created_at DESC, rowid DESC",
            PAYMENT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        log::debug!(
            "[entitlement:store] Found {} payment records for user {}",
            rows.len(),
            user_id
        );

        rows.iter().map(|r| r.to_payment_record()).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::services::entitlement::catalog::PlanCatalog;
    use tempfile::TempDir;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    async fn create_store() -> (SqliteEntitlementStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Database::open(dir.path().join("test.db")).await.unwrap();
        (SqliteEntitlementStore::new(db.pool), dir)
    }

    fn payment(order_id: &str, user_id: &str, plan: PlanId) -> NewPayment {
        NewPayment {
            order_id: order_id.to_string(),
            user_id: user_id.to_string(),
            amount: 399.0,
            currency: "INR".to_string(),
            plan,
            payment_method: Some("card".to_string()),
        }
    }

    #[test]
    fn test_stored_entitlement_invalid_plan() {
        let stored = StoredEntitlement {
            user_id: "user-1".to_string(),
            plan: "gold".to_string(),
            status: "active".to_string(),
            daily_limit: 10,
            used_today: 0,
            total_used: 0,
            last_reset_date: today(),
            subscription_start_date: None,
            subscription_end_date: None,
        };
        assert!(matches!(stored.to_entitlement(), Err(Error::Internal(_))));
    }

    #[tokio::test]
    async fn test_create_default_is_idempotent() {
        let (store, _dir) = create_store().await;
        let catalog = PlanCatalog::built_in();

        assert!(store.create_default("user-1", catalog.free_plan(), today()).await.unwrap());
        assert!(!store.create_default("user-1", catalog.free_plan(), today()).await.unwrap());

        let ent = store.get("user-1").await.unwrap().unwrap();
        assert_eq!(ent.plan, PlanId::Basic);
        assert_eq!(ent.daily_limit, DailyLimit::Limited(10));
        assert_eq!(ent.used_today, 0);
        assert_eq!(ent.last_reset_date, today());
    }

    #[tokio::test]
    async fn test_try_consume_stops_at_ceiling() {
        let (store, _dir) = create_store().await;
        let catalog = PlanCatalog::built_in();
        store.create_default("user-1", catalog.free_plan(), today()).await.unwrap();

        for expected in 1..=10 {
            let ent = store.try_consume("user-1", today()).await.unwrap().unwrap();
            assert_eq!(ent.used_today, expected);
        }
        assert!(store.try_consume("user-1", today()).await.unwrap().is_none());

        let ent = store.get("user-1").await.unwrap().unwrap();
        assert_eq!(ent.used_today, 10);
        assert_eq!(ent.total_used, 10);
    }

    #[tokio::test]
    async fn test_try_consume_refuses_stale_day() {
        let (store, _dir) = create_store().await;
        let catalog = PlanCatalog::built_in();
        let yesterday = today().pred_opt().unwrap();
        store.create_default("user-1", catalog.free_plan(), yesterday).await.unwrap();

        assert!(store.try_consume("user-1", today()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reset_daily_guarded_on_old_date() {
        let (store, _dir) = create_store().await;
        let catalog = PlanCatalog::built_in();
        let yesterday = today().pred_opt().unwrap();
        store.create_default("user-1", catalog.free_plan(), yesterday).await.unwrap();

        let first = store
            .reset_daily("user-1", PlanId::Basic, yesterday, today(), DailyLimit::Limited(10))
            .await
            .unwrap();
        let second = store
            .reset_daily("user-1", PlanId::Basic, yesterday, today(), DailyLimit::Limited(10))
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
    }

    #[tokio::test]
    async fn test_apply_upgrade_twice_is_duplicate() {
        let (store, _dir) = create_store().await;
        let catalog = PlanCatalog::built_in();
        let pro = catalog.get(PlanId::Pro);
        store.create_default("user-1", catalog.free_plan(), today()).await.unwrap();

        let pay = payment("pay_1", "user-1", PlanId::Pro);
        let ent = store.apply_upgrade("user-1", pro, &pay, false, today(), Utc::now()).await.unwrap();
        assert_eq!(ent.plan, PlanId::Pro);

        let again = store.apply_upgrade("user-1", pro, &pay, false, today(), Utc::now()).await;
        assert!(matches!(again, Err(Error::DuplicateTransition { .. })));

        let record = store.find_payment("pay_1").await.unwrap().unwrap();
        assert_eq!(record.status, PaymentStatus::Completed);
        assert_eq!(store.payment_history("user-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_apply_upgrade_unknown_user_writes_nothing() {
        let (store, _dir) = create_store().await;
        let catalog = PlanCatalog::built_in();

        let pay = payment("pay_ghost", "ghost", PlanId::Pro);
        let result = store
            .apply_upgrade("ghost", catalog.get(PlanId::Pro), &pay, false, today(), Utc::now())
            .await;

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert!(store.find_payment("pay_ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_apply_upgrade_rejects_foreign_payment() {
        let (store, _dir) = create_store().await;
        let catalog = PlanCatalog::built_in();
        let pro = catalog.get(PlanId::Pro);
        store.create_default("alice", catalog.free_plan(), today()).await.unwrap();
        store.create_default("bob", catalog.free_plan(), today()).await.unwrap();

        let pay = payment("pay_shared", "alice", PlanId::Pro);
        store.apply_upgrade("alice", pro, &pay, false, today(), Utc::now()).await.unwrap();

        let stolen = payment("pay_shared", "bob", PlanId::Pro);
        let result = store.apply_upgrade("bob", pro, &stolen, false, today(), Utc::now()).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert_eq!(store.get("bob").await.unwrap().unwrap().plan, PlanId::Basic);
    }

    #[tokio::test]
    async fn test_reset_daily_never_moves_backwards() {
        let (store, _dir) = create_store().await;
        let catalog = PlanCatalog::built_in();
        let yesterday = today().pred_opt().unwrap();
        store.create_default("user-1", catalog.free_plan(), today()).await.unwrap();

        let rewound = store
            .reset_daily("user-1", PlanId::Basic, today(), yesterday, DailyLimit::Limited(10))
            .await
            .unwrap();
        let same_day = store
            .reset_daily("user-1", PlanId::Basic, today(), today(), DailyLimit::Limited(10))
            .await
            .unwrap();

        assert!(!rewound);
        assert!(!same_day);
        assert_eq!(store.get("user-1").await.unwrap().unwrap().last_reset_date, today());
    }

    #[tokio::test]
    async fn test_apply_upgrade_requires_opened_checkout() {
        let (store, _dir) = create_store().await;
        let catalog = PlanCatalog::built_in();
        let pro = catalog.get(PlanId::Pro);
        store.create_default("user-1", catalog.free_plan(), today()).await.unwrap();

        let pay = payment("order_missing", "user-1", PlanId::Pro);
        let result = store.apply_upgrade("user-1", pro, &pay, true, today(), Utc::now()).await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(store.find_payment("order_missing").await.unwrap().is_none());
        assert_eq!(store.get("user-1").await.unwrap().unwrap().plan, PlanId::Basic);

        let order = payment("order_open", "user-1", PlanId::Pro);
        store.begin_checkout(&order, Utc::now()).await.unwrap();
        let ent = store
            .apply_upgrade("user-1", pro, &order, true, today(), Utc::now())
            .await
            .unwrap();
        assert_eq!(ent.plan, PlanId::Pro);
    }

    #[tokio::test]
    async fn test_checkout_lifecycle() {
        let (store, _dir) = create_store().await;
        let catalog = PlanCatalog::built_in();
        store.create_default("user-1", catalog.free_plan(), today()).await.unwrap();

        let order = payment("order_1", "user-1", PlanId::Pro);
        store.begin_checkout(&order, Utc::now()).await.unwrap();
        assert_eq!(
            store.get("user-1").await.unwrap().unwrap().status,
            SubscriptionStatus::Pending
        );
        assert!(store.begin_checkout(&order, Utc::now()).await.is_err());

        assert!(store.fail_checkout("user-1", "order_1", Utc::now()).await.unwrap());
        assert!(!store.fail_checkout("user-1", "order_1", Utc::now()).await.unwrap());

        let ent = store.get("user-1").await.unwrap().unwrap();
        assert_eq!(ent.status, SubscriptionStatus::Active);
        assert_eq!(ent.plan, PlanId::Basic);
        assert_eq!(
            store.find_payment("order_1").await.unwrap().unwrap().status,
            PaymentStatus::Failed
        );
    }
}
