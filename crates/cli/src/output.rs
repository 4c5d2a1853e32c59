//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use snapshot_lib::{PodScheduleStatus, Quantity};
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table of rows, or the underlying records as JSON
pub fn print_rows<R: Tabled, T: Serialize>(
    rows: &[R],
    records: &T,
    format: OutputFormat,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("{}", "No items found".yellow());
            } else {
                println!("{}", Table::new(rows).with(Style::rounded()));
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(records)?),
    }
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Shorten a hex digest for tables
pub fn short_hash(hash: &str) -> String {
    hash.chars().take(12).collect()
}

/// Color a quantity red when it went negative
pub fn color_quantity(quantity: Option<&Quantity>) -> String {
    match quantity {
        Some(q) if q.is_negative() => q.to_string().red().bold().to_string(),
        Some(q) => q.to_string(),
        None => "-".dimmed().to_string(),
    }
}

/// Color a pod schedule status
pub fn color_status(status: PodScheduleStatus) -> String {
    match status {
        PodScheduleStatus::Committed => "committed".green().to_string(),
        PodScheduleStatus::Nominated => "nominated".blue().to_string(),
        PodScheduleStatus::Pending => "pending".yellow().to_string(),
        PodScheduleStatus::Unscheduled => "unscheduled".red().to_string(),
    }
}
