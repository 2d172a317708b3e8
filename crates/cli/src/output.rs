//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Prefix a formatted amount with the currency sign, dimming
/// unavailable figures instead of coloring them.
pub fn format_currency(amount: &str) -> String {
    if amount == "N/A" {
        amount.dimmed().to_string()
    } else {
        format!("${}", amount)
    }
}

/// Render an optional numeric field for display
pub fn format_field(value: &Option<f64>) -> String {
    match value {
        Some(v) => format!("{v}"),
        None => "N/A".dimmed().to_string(),
    }
}
