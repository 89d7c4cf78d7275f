//! Payment commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;
use tokengate_core::PaymentRecord;

use super::Context;
use crate::output::print_output;

#[derive(Subcommand)]
pub enum PaymentAction {
    /// Show a user's payments, newest first
    History {
        /// User id or username
        user: String,
    },
}

/// Payment row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct PaymentRow {
    #[tabled(rename = "Order")]
    pub order_id: String,
    #[tabled(rename = "Plan")]
    pub plan: String,
    #[tabled(rename = "Amount")]
    pub amount: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Created")]
    pub created: String,
}

impl From<&PaymentRecord> for PaymentRow {
    fn from(record: &PaymentRecord) -> Self {
        Self {
            order_id: record.order_id.clone(),
            plan: record.plan.to_string(),
            amount: format!("{:.2} {}", record.amount, record.currency),
            status: record.status.to_string(),
            created: record.timestamp.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

pub async fn execute(ctx: &Context, action: PaymentAction) -> Result<()> {
    match action {
        PaymentAction::History { user } => {
            let user = ctx.resolve_user(&user).await?;
            let records = ctx.entitlements.payment_history(&user.id).await?;
            let rows: Vec<PaymentRow> = records.iter().map(PaymentRow::from).collect();
            print_output(&rows, &records, ctx.format)
        }
    }
}
