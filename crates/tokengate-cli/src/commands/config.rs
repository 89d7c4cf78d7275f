//! Config commands

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;
use tabled::Tabled;
use tokengate_core::config::ConfigEntry;

use super::Context;
use crate::output::print_output;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show effective configuration
    Show,
}

/// Config row for table display
#[derive(Debug, Serialize, Tabled)]
pub struct ConfigRow {
    #[tabled(rename = "Key")]
    pub key: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Source")]
    pub source: String,
}

impl From<ConfigEntry> for ConfigRow {
    fn from(entry: ConfigEntry) -> Self {
        Self {
            key: entry.key,
            value: entry.value,
            source: entry.source,
        }
    }
}

pub async fn execute(ctx: &Context, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let rows: Vec<ConfigRow> = ctx.config.entries().into_iter().map(ConfigRow::from).collect();
            print_output(&rows, &rows, ctx.format)
        }
    }
}
