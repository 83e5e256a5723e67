//! Trip Prediction CLI
//!
//! A command-line tool for submitting prediction requests to the trip
//! prediction API and inspecting service health.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{health, predict};

/// Trip Prediction CLI
#[derive(Parser)]
#[command(name = "trip")]
#[command(author, version, about = "CLI for the trip prediction API", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via TRIP_API_URL env var)
    #[arg(long, env = "TRIP_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a prediction from a JSON record
    #[command(subcommand)]
    Predict(PredictCommands),

    /// Show service health and cache state
    Health,
}

#[derive(Subcommand)]
pub enum PredictCommands {
    /// Assign a customer to a behavioral segment
    Segmentation {
        /// Path to the JSON record, or "-" for stdin
        #[arg(long, short, default_value = "-")]
        file: String,
    },

    /// Score the likelihood of a repurchase within 30 days
    Repurchase {
        /// Path to the JSON record, or "-" for stdin
        #[arg(long, short, default_value = "-")]
        file: String,
    },

    /// Recommend the next routes for a customer
    Routes {
        /// Path to the JSON record, or "-" for stdin
        #[arg(long, short, default_value = "-")]
        file: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = client::ApiClient::new(&cli.api_url)?;

    let result = match cli.command {
        Commands::Predict(command) => predict::run(&client, command, cli.format).await,
        Commands::Health => health::run(&client, cli.format).await,
    };

    if let Err(error) = result {
        output::print_error(&format!("{error:#}"));
        std::process::exit(1);
    }

    Ok(())
}
