//! Services module

pub mod accounts;
pub mod entitlement;

pub use accounts::{find_user, login, register_user, SqliteUserRepository, UserRepository};
pub use entitlement::{
    EntitlementService, EntitlementStore, PaymentVerificationGateway, PlanCatalog,
    SqliteEntitlementStore,
};
