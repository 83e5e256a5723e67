//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Format a probability as percentage
pub fn format_probability(probability: f32) -> String {
    format!("{:.1}%", probability * 100.0)
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "unhealthy" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color a risk category
pub fn color_risk(risk: &str) -> String {
    match risk {
        "High" => risk.green().to_string(),
        "Medium" => risk.yellow().to_string(),
        "Low" => risk.red().to_string(),
        _ => risk.to_string(),
    }
}

/// Color confidence based on value
pub fn color_confidence(confidence: f32) -> String {
    let formatted = format!("{:.2}", confidence);
    if confidence >= 0.8 {
        formatted.green().to_string()
    } else if confidence >= 0.5 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}
