//! # tokengate-core
//!
//! Core entitlement and usage-quota engine for Tokengate - shared between
//! the HTTP server and the CLI.
//!
//! This crate provides:
//! - Database operations (`db` module)
//! - Data models (`models` module)
//! - Plan catalog, quota accounting and plan transitions (`services::entitlement`)
//! - User accounts (`services::accounts`)
//! - Authentication utilities (`auth` module)
//! - Environment configuration (`config` module)
//! - Unified error handling (`error` module)

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

// Re-exports for convenience
pub use config::{AppConfig, DayBoundary};
pub use db::Database;
pub use error::{Error, Result};

pub use models::{Claims, LoginRequest, RegisterRequest, TokenResponse, User, UserResponse};

pub use services::entitlement::{
    Availability, ConsumeOutcome, DailyLimit, Entitlement, EntitlementService, EntitlementStore,
    PaymentRecord, PaymentStatus, PaymentVerificationGateway, PlanCatalog, PlanConfig, PlanId,
    Remaining, SqliteEntitlementStore, SubscriptionStatus, TokenStatus, TransitionOutcome,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Returns the library version
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!version().is_empty());
    }
}
