//! # tokengate-server
//!
//! Axum HTTP front end for the entitlement engine.

pub mod api;
pub mod auth;
pub mod error;

use std::sync::Arc;

use anyhow::Context;
use tokengate_core::auth::{AuthResolver, JwtAuthResolver};
use tokengate_core::services::entitlement::{
    DevelopmentGateway, PaymentVerificationGateway, RazorpayGateway,
};
use tokengate_core::services::SqliteUserRepository;
use tokengate_core::{AppConfig, Database, DayBoundary, EntitlementService, PlanCatalog, SqliteEntitlementStore};

pub use api::create_router;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub entitlements: Arc<EntitlementService<SqliteEntitlementStore>>,
    pub users: Arc<SqliteUserRepository>,
    pub tokens: Arc<JwtAuthResolver>,
    pub auth: Arc<dyn AuthResolver>,
}

impl AppState {
    pub fn new(
        db: &Database,
        catalog: PlanCatalog,
        gateway: Arc<dyn PaymentVerificationGateway>,
        jwt_secret: Vec<u8>,
        day_boundary: DayBoundary,
    ) -> Self {
        let tokens = Arc::new(JwtAuthResolver::new(jwt_secret));
        let entitlements = EntitlementService::new(
            Arc::new(SqliteEntitlementStore::new(db.pool.clone())),
            Arc::new(catalog),
            gateway,
            day_boundary,
        );

        Self {
            entitlements: Arc::new(entitlements),
            users: Arc::new(SqliteUserRepository::new(db.pool.clone())),
            auth: tokens.clone(),
            tokens,
        }
    }

    /// Open the database and wire everything from configuration
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let db = Database::open(config.db_path.clone())
            .await
            .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?;

        let catalog = PlanCatalog::load(config.plan_catalog_path.as_deref())
            .context("Failed to load plan catalog")?;

        let gateway: Arc<dyn PaymentVerificationGateway> = match &config.razorpay {
            Some(credentials) => {
                log::info!("[server] Using Razorpay gateway ({})", credentials.key_id);
                Arc::new(RazorpayGateway::new(credentials.clone())?)
            }
            None => {
                log::warn!("[server] Razorpay credentials not configured, using development gateway");
                Arc::new(DevelopmentGateway::new())
            }
        };

        Ok(Self::new(
            &db,
            catalog,
            gateway,
            config.jwt_secret.clone(),
            config.day_boundary,
        ))
    }
}
