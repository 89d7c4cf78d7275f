//! Entitlement and usage-quota engine
//!
//! Gates metered operations behind a daily token allowance tied to a
//! subscription plan, and moves users between plans once a payment is
//! confirmed.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ EntitlementService (facade, day stamping, retry once)   │
//! └─────────────────────────────────────────────────────────┘
//!      │                 │                      │
//!      ▼                 ▼                      ▼
//! ┌──────────────┐ ┌─────────────┐ ┌──────────────────────────────┐
//! │Availability  │ │TokenConsumer│ │SubscriptionTransitionManager │
//! │Checker       │ │             │ │   ──▶ PaymentVerification-   │
//! └──────────────┘ └─────────────┘ │       Gateway                │
//!      │                 │         └──────────────────────────────┘
//!      └──── QuotaResetPolicy ──── PlanCatalog   │
//!                        │                      │
//!                        ▼                      ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │ trait EntitlementStore (SqliteEntitlementStore)         │
//! │   - try_consume()   single conditional UPDATE           │
//! │   - apply_upgrade() payment + entitlement, one tx       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use tokengate_core::services::entitlement::*;
//!
//! let store = Arc::new(SqliteEntitlementStore::new(db.pool.clone()));
//! let service = EntitlementService::new(
//!     store,
//!     Arc::new(PlanCatalog::built_in()),
//!     Arc::new(DevelopmentGateway::new()),
//!     DayBoundary::Utc,
//! );
//!
//! let outcome = service.consume(&user_id, "species_recognition").await?;
//! if !outcome.success {
//!     // render upgrade prompt
//! }
//! ```

pub mod availability;
pub mod catalog;
pub mod consumer;
pub mod gateway;
pub mod reset;
pub mod service;
pub mod store;
pub mod transition;
pub mod types;

pub use availability::AvailabilityChecker;
pub use catalog::{PlanCatalog, PlanConfig};
pub use consumer::TokenConsumer;
pub use gateway::{
    checkout_signature, DevelopmentGateway, GatewayOrder, OperatorConfirmedGateway,
    PaymentCapture, PaymentVerificationGateway, RazorpayGateway,
};
pub use reset::QuotaResetPolicy;
pub use service::{retry_once, EntitlementService};
pub use store::{EntitlementStore, SqliteEntitlementStore};
pub use transition::SubscriptionTransitionManager;
pub use types::{
    Availability, ConsumeOutcome, DailyLimit, Entitlement, NewPayment, PaymentRecord,
    PaymentStatus, PlanId, Remaining, SubscriptionStatus, TokenStatus, TransitionOutcome,
    UNLIMITED,
};

pub use crate::config::DayBoundary;
