//! Plan commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;
use tokengate_core::{PlanConfig, TransitionOutcome};

use super::Context;
use crate::output::{print_info, print_output, print_success, OutputFormat};

#[derive(Subcommand)]
pub enum PlanAction {
    /// List available plans
    List,

    /// Upgrade a user after confirming their payment out of band
    Upgrade {
        /// User id or username
        user: String,

        /// Target plan (pro, enterprise)
        plan: String,

        /// Gateway payment or order id; replays are ignored
        #[arg(long)]
        payment_id: String,
    },

    /// Move a user back to the free plan
    Downgrade {
        /// User id or username
        user: String,
    },
}

/// Plan row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct PlanRow {
    #[tabled(rename = "Plan")]
    pub plan_id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Tokens/Day")]
    pub daily_tokens: String,
    #[tabled(rename = "Price")]
    pub price: String,
}

impl From<&PlanConfig> for PlanRow {
    fn from(plan: &PlanConfig) -> Self {
        Self {
            plan_id: plan.plan_id.to_string(),
            name: plan.name.clone(),
            daily_tokens: plan.daily_token_allowance.to_string(),
            price: if plan.is_paid() {
                format!("{:.0} {}", plan.price, plan.currency)
            } else {
                "free".to_string()
            },
        }
    }
}

pub async fn execute(ctx: &Context, action: PlanAction) -> Result<()> {
    match action {
        PlanAction::List => list_plans(ctx),
        PlanAction::Upgrade {
            user,
            plan,
            payment_id,
        } => upgrade(ctx, &user, &plan, &payment_id).await,
        PlanAction::Downgrade { user } => downgrade(ctx, &user).await,
    }
}

fn list_plans(ctx: &Context) -> Result<()> {
    let plans = ctx.entitlements.plans();
    let rows: Vec<PlanRow> = plans.iter().map(|p| PlanRow::from(*p)).collect();
    print_output(&rows, &plans, ctx.format)
}

fn report(ctx: &Context, username: &str, outcome: &TransitionOutcome) -> Result<()> {
    if ctx.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else if outcome.applied {
        print_success(&format!("{} is now on the {} plan", username, outcome.plan), ctx.quiet);
    } else {
        print_info(
            &format!("Payment already applied; {} stays on {}", username, outcome.plan),
            ctx.quiet,
        );
    }
    Ok(())
}

async fn upgrade(ctx: &Context, user: &str, plan: &str, payment_id: &str) -> Result<()> {
    let user = ctx.resolve_user(user).await?;
    let outcome = ctx.entitlements.upgrade(&user.id, plan, payment_id).await?;
    report(ctx, &user.username, &outcome)
}

async fn downgrade(ctx: &Context, user: &str) -> Result<()> {
    let user = ctx.resolve_user(user).await?;
    let outcome = ctx.entitlements.downgrade(&user.id, None).await?;
    report(ctx, &user.username, &outcome)
}
