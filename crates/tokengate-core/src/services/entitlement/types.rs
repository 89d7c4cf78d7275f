//! Entitlement types
//!
//! Plan identifiers, subscription state, quota arithmetic and the payment
//! ledger row.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Plan Identifiers
// ============================================================================

/// Subscription plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanId {
    /// Free tier
    Basic,
    Pro,
    Enterprise,
}

impl PlanId {
    pub const ALL: [PlanId; 3] = [PlanId::Basic, PlanId::Pro, PlanId::Enterprise];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanId::Basic => "basic",
            PlanId::Pro => "pro",
            PlanId::Enterprise => "enterprise",
        }
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlanId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" => Ok(PlanId::Basic),
            "pro" => Ok(PlanId::Pro),
            "enterprise" => Ok(PlanId::Enterprise),
            _ => Err(format!("Unknown plan: {}", s)),
        }
    }
}

// ============================================================================
// Status Types
// ============================================================================

/// Subscription status
///
/// `Pending` while a checkout is open; every completed transition lands on
/// `Active`. There is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Pending,
    Cancelled,
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionStatus::Active => write!(f, "active"),
            SubscriptionStatus::Pending => write!(f, "pending"),
            SubscriptionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(SubscriptionStatus::Active),
            "pending" => Ok(SubscriptionStatus::Pending),
            "cancelled" | "canceled" => Ok(SubscriptionStatus::Cancelled),
            _ => Err(format!("Unknown subscription status: {}", s)),
        }
    }
}

/// Payment ledger status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Completed => write!(f, "completed"),
            PaymentStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "completed" => Ok(PaymentStatus::Completed),
            "failed" => Ok(PaymentStatus::Failed),
            _ => Err(format!("Unknown payment status: {}", s)),
        }
    }
}

// ============================================================================
// Quota Arithmetic
// ============================================================================

/// Raw value stored for an unlimited allowance
pub const UNLIMITED: i64 = -1;

/// Daily token allowance. Serialized as an integer, `-1` meaning unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum DailyLimit {
    Limited(i64),
    Unlimited,
}

impl DailyLimit {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, DailyLimit::Unlimited)
    }

    /// Remaining allowance after `used_today` units
    pub fn remaining(&self, used_today: i64) -> Remaining {
        match self {
            DailyLimit::Unlimited => Remaining::Unlimited,
            DailyLimit::Limited(limit) => Remaining::Limited((limit - used_today).max(0)),
        }
    }
}

impl From<DailyLimit> for i64 {
    fn from(limit: DailyLimit) -> Self {
        match limit {
            DailyLimit::Limited(n) => n,
            DailyLimit::Unlimited => UNLIMITED,
        }
    }
}

impl TryFrom<i64> for DailyLimit {
    type Error = String;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        match raw {
            UNLIMITED => Ok(DailyLimit::Unlimited),
            n if n >= 0 => Ok(DailyLimit::Limited(n)),
            n => Err(format!("Invalid daily limit: {}", n)),
        }
    }
}

impl std::fmt::Display for DailyLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DailyLimit::Limited(n) => write!(f, "{}", n),
            DailyLimit::Unlimited => write!(f, "unlimited"),
        }
    }
}

/// Tokens left for today. Serialized as an integer, `-1` meaning unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum Remaining {
    Limited(i64),
    Unlimited,
}

impl Remaining {
    pub fn has_quota(&self) -> bool {
        match self {
            Remaining::Unlimited => true,
            Remaining::Limited(n) => *n > 0,
        }
    }

    pub fn none() -> Self {
        Remaining::Limited(0)
    }
}

impl From<Remaining> for i64 {
    fn from(remaining: Remaining) -> Self {
        match remaining {
            Remaining::Limited(n) => n,
            Remaining::Unlimited => UNLIMITED,
        }
    }
}

impl TryFrom<i64> for Remaining {
    type Error = String;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        match raw {
            UNLIMITED => Ok(Remaining::Unlimited),
            n if n >= 0 => Ok(Remaining::Limited(n)),
            n => Err(format!("Invalid remaining count: {}", n)),
        }
    }
}

impl std::fmt::Display for Remaining {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Remaining::Limited(n) => write!(f, "{}", n),
            Remaining::Unlimited => write!(f, "unlimited"),
        }
    }
}

// ============================================================================
// Entitlement
// ============================================================================

/// A user's plan, status and quota bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    pub user_id: String,
    pub plan: PlanId,
    pub status: SubscriptionStatus,
    pub daily_limit: DailyLimit,
    pub used_today: i64,
    /// Lifetime counter, never decreases
    pub total_used: i64,
    pub last_reset_date: NaiveDate,
    pub subscription_start_date: Option<DateTime<Utc>>,
    pub subscription_end_date: Option<DateTime<Utc>>,
}

impl Entitlement {
    pub fn remaining(&self) -> Remaining {
        self.daily_limit.remaining(self.used_today)
    }

    pub fn status_report(&self) -> TokenStatus {
        TokenStatus {
            daily_limit: self.daily_limit,
            used_today: self.used_today,
            remaining: self.remaining(),
            total_used: self.total_used,
            last_reset_date: self.last_reset_date,
            plan: self.plan,
            status: self.status,
        }
    }
}

// ============================================================================
// Operation Results
// ============================================================================

/// Response of the status query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatus {
    pub daily_limit: DailyLimit,
    pub used_today: i64,
    pub remaining: Remaining,
    pub total_used: i64,
    pub last_reset_date: NaiveDate,
    pub plan: PlanId,
    pub status: SubscriptionStatus,
}

/// Response of the availability check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub available: bool,
    pub tokens_remaining: Remaining,
}

/// Response of a consume call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeOutcome {
    pub success: bool,
    pub tokens_remaining: Remaining,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ConsumeOutcome {
    pub fn consumed(tokens_remaining: Remaining, operation: &str) -> Self {
        Self {
            success: true,
            tokens_remaining,
            message: Some(format!("Token consumed for {}", operation)),
        }
    }

    pub fn exhausted() -> Self {
        Self {
            success: false,
            tokens_remaining: Remaining::none(),
            message: Some("Daily token limit reached".to_string()),
        }
    }
}

/// Response of an upgrade or downgrade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    pub success: bool,
    pub plan: PlanId,
    /// False when a replayed payment confirmation changed nothing
    pub applied: bool,
}

// ============================================================================
// Payment Ledger
// ============================================================================

/// One row of the append-only payment history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    pub order_id: String,
    pub user_id: String,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    pub plan: PlanId,
    pub payment_method: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Data for appending a ledger row
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: String,
    pub user_id: String,
    pub amount: f64,
    pub currency: String,
    pub plan: PlanId,
    pub payment_method: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_id_roundtrip() {
        for plan in PlanId::ALL {
            assert_eq!(plan.to_string().parse::<PlanId>().unwrap(), plan);
        }
        assert_eq!("PRO".parse::<PlanId>().unwrap(), PlanId::Pro);
        assert!("gold".parse::<PlanId>().is_err());
        assert!("free".parse::<PlanId>().is_err());
    }

    #[test]
    fn test_daily_limit_sentinel() {
        assert_eq!(DailyLimit::try_from(-1).unwrap(), DailyLimit::Unlimited);
        assert_eq!(DailyLimit::try_from(10).unwrap(), DailyLimit::Limited(10));
        assert!(DailyLimit::try_from(-2).is_err());
        assert_eq!(i64::from(DailyLimit::Unlimited), -1);
    }

    #[test]
    fn test_unlimited_remaining_ignores_usage() {
        let remaining = DailyLimit::Unlimited.remaining(1_000_000);
        assert_eq!(remaining, Remaining::Unlimited);
        assert!(remaining.has_quota());
    }

    #[test]
    fn test_limited_remaining_never_negative() {
        assert_eq!(DailyLimit::Limited(10).remaining(3), Remaining::Limited(7));
        assert_eq!(DailyLimit::Limited(10).remaining(10), Remaining::Limited(0));
        assert_eq!(DailyLimit::Limited(10).remaining(12), Remaining::Limited(0));
        assert!(!DailyLimit::Limited(0).remaining(0).has_quota());
    }

    #[test]
    fn test_consume_outcome_serialization() {
        let json = serde_json::to_value(ConsumeOutcome::exhausted()).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["tokensRemaining"], 0);

        let json = serde_json::to_value(ConsumeOutcome::consumed(Remaining::Unlimited, "chat")).unwrap();
        assert_eq!(json["tokensRemaining"], -1);
    }
}
