//! Output formatting module
//!
//! Table and JSON rendering shared by every command.

use serde::Serialize;
use std::fmt::Display;
use tabled::{Table, Tabled};

/// Output format enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Invalid format: {}. Use 'table' or 'json'", s)),
        }
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Print rows as a table, or `json` as JSON
pub fn print_output<T, J>(rows: &[T], json: &J, format: OutputFormat) -> anyhow::Result<()>
where
    T: Tabled,
    J: Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("No items found.");
            } else {
                println!("{}", Table::new(rows));
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(json)?),
    }
    Ok(())
}

/// Print one row as a table, or `json` as JSON
pub fn print_single<T, J>(row: &T, json: &J, format: OutputFormat) -> anyhow::Result<()>
where
    T: Tabled,
    J: Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => println!("{}", Table::new([row])),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(json)?),
    }
    Ok(())
}

/// Print a success message (respects quiet mode)
pub fn print_success(message: &str, quiet: bool) {
    if !quiet {
        println!("{}", colored::Colorize::green(message));
    }
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{}", colored::Colorize::yellow(message));
}

/// Print an info message (respects quiet mode)
pub fn print_info(message: &str, quiet: bool) {
    if !quiet {
        println!("{}", message);
    }
}
