//! CLI commands module
//!
//! Contains all CLI command implementations.

pub mod config;
pub mod payment;
pub mod plan;
pub mod tokens;
pub mod user;

use anyhow::Result;
use tokengate_core::services::{accounts, SqliteUserRepository};
use tokengate_core::{AppConfig, EntitlementService, SqliteEntitlementStore, User};

use crate::output::OutputFormat;

/// Shared context for all commands
pub struct Context {
    pub users: SqliteUserRepository,
    pub entitlements: EntitlementService<SqliteEntitlementStore>,
    pub config: AppConfig,
    pub format: OutputFormat,
    pub quiet: bool,
}

impl Context {
    /// Resolve a `<user>` argument given as id or username
    pub async fn resolve_user(&self, user: &str) -> Result<User> {
        Ok(accounts::find_user(&self.users, user).await?)
    }
}
