//! Token quota commands

use anyhow::{bail, Result};
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;
use tokengate_core::TokenStatus;

use super::Context;
use crate::output::{print_single, print_success, OutputFormat};

#[derive(Subcommand)]
pub enum TokensAction {
    /// Show today's usage for a user
    Status {
        /// User id or username
        user: String,
    },

    /// Spend one token on behalf of a user
    Consume {
        /// User id or username
        user: String,

        /// Operation tag recorded in the logs
        #[arg(long, default_value = "cli")]
        operation: String,
    },
}

/// Token status row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct StatusRow {
    #[tabled(rename = "Plan")]
    pub plan: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Daily Limit")]
    pub daily_limit: String,
    #[tabled(rename = "Used Today")]
    pub used_today: i64,
    #[tabled(rename = "Remaining")]
    pub remaining: String,
    #[tabled(rename = "Total Used")]
    pub total_used: i64,
    #[tabled(rename = "Last Reset")]
    pub last_reset_date: String,
}

impl From<&TokenStatus> for StatusRow {
    fn from(status: &TokenStatus) -> Self {
        Self {
            plan: status.plan.to_string(),
            status: status.status.to_string(),
            daily_limit: status.daily_limit.to_string(),
            used_today: status.used_today,
            remaining: status.remaining.to_string(),
            total_used: status.total_used,
            last_reset_date: status.last_reset_date.to_string(),
        }
    }
}

pub async fn execute(ctx: &Context, action: TokensAction) -> Result<()> {
    match action {
        TokensAction::Status { user } => show_status(ctx, &user).await,
        TokensAction::Consume { user, operation } => consume(ctx, &user, &operation).await,
    }
}

async fn show_status(ctx: &Context, user: &str) -> Result<()> {
    let user = ctx.resolve_user(user).await?;
    let status = ctx.entitlements.status(&user.id).await?;
    print_single(&StatusRow::from(&status), &status, ctx.format)
}

async fn consume(ctx: &Context, user: &str, operation: &str) -> Result<()> {
    let user = ctx.resolve_user(user).await?;
    let outcome = ctx.entitlements.consume(&user.id, operation).await?;

    if ctx.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    if !outcome.success {
        bail!("Daily token limit reached for {} (0 remaining)", user.username);
    }

    print_success(
        &format!("Consumed 1 token for {} ({} remaining)", user.username, outcome.tokens_remaining),
        ctx.quiet || ctx.format == OutputFormat::Json,
    );
    Ok(())
}
