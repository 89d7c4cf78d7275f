//! Tokengate CLI - token quota and plan administration
//!
//! Operates directly on the Tokengate database: register users, inspect
//! and spend daily tokens, and move users between plans.

mod commands;
mod output;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokengate_core::config::ENV_DB_PATH;
use tokengate_core::services::entitlement::OperatorConfirmedGateway;
use tokengate_core::services::SqliteUserRepository;
use tokengate_core::{AppConfig, Database, EntitlementService, PlanCatalog, SqliteEntitlementStore};

#[derive(Parser)]
#[command(name = "tokengate")]
#[command(author, version, about = "Token quota and subscription plan CLI", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format: table (default) or json
    #[arg(long, global = true, default_value = "table")]
    format: output::OutputFormat,

    /// Suppress progress messages
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Override database path (or set TOKENGATE_DB_PATH env var)
    #[arg(long, env = "TOKENGATE_DB_PATH", global = true)]
    db: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },

    /// Inspect and spend daily tokens
    Tokens {
        #[command(subcommand)]
        action: commands::tokens::TokensAction,
    },

    /// List plans and change a user's plan
    Plan {
        #[command(subcommand)]
        action: commands::plan::PlanAction,
    },

    /// Payment history
    Payment {
        #[command(subcommand)]
        action: commands::payment::PaymentAction,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    // Set up database path if provided
    if let Some(db_path) = &cli.db {
        std::env::set_var(ENV_DB_PATH, db_path);
    }

    let config = AppConfig::from_env()?;
    log::debug!("Using database {}", config.db_path.display());
    let db = Database::open(config.db_path.clone()).await?;
    let catalog = PlanCatalog::load(config.plan_catalog_path.as_deref())?;

    // Upgrades from the CLI are operator-confirmed
    let entitlements = EntitlementService::new(
        Arc::new(SqliteEntitlementStore::new(db.pool.clone())),
        Arc::new(catalog),
        Arc::new(OperatorConfirmedGateway),
        config.day_boundary,
    );

    let ctx = commands::Context {
        users: SqliteUserRepository::new(db.pool.clone()),
        entitlements,
        config,
        format: cli.format,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::User { action } => commands::user::execute(&ctx, action).await,
        Commands::Tokens { action } => commands::tokens::execute(&ctx, action).await,
        Commands::Plan { action } => commands::plan::execute(&ctx, action).await,
        Commands::Payment { action } => commands::payment::execute(&ctx, action).await,
        Commands::Config { action } => commands::config::execute(&ctx, action).await,
    }
}
