//! Database Migration Cost Estimator CLI
//!
//! A command-line tool for parsing database performance dumps and
//! projecting the cost of a migration to managed cloud instances.

mod commands;
mod output;
mod quotes;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::estimate::EstimateOverrides;

/// Database Migration Cost Estimator CLI
#[derive(Parser)]
#[command(name = "dbcost")]
#[command(author, version, about = "Database migration cost estimator", long_about = None)]
pub struct Cli {
    /// Pricing catalog file overriding the built-in rates
    #[arg(long, env = "DBCOST_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Estimate migration cost from performance dumps
    Estimate {
        /// Dump file, or directory holding dumps and assessment reports
        input: PathBuf,

        /// Price quote file (JSON)
        #[arg(long, short, env = "DBCOST_QUOTES")]
        quotes: PathBuf,

        /// Target region (catalog default when omitted)
        #[arg(long, env = "DBCOST_REGION")]
        region: Option<String>,

        /// Override the target engine from the assessment
        #[arg(long)]
        engine: Option<String>,

        /// Yearly storage growth rate, percent
        #[arg(long)]
        growth_rate: Option<f64>,

        /// Provisioned IOPS on the target volume
        #[arg(long)]
        iops: Option<f64>,

        /// Provisioned throughput on the target volume, MBps
        #[arg(long)]
        throughput: Option<f64>,
    },

    /// Parse the input and show what was extracted, without pricing
    Parse {
        /// Dump file, or directory holding dumps and assessment reports
        input: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Estimate {
            input,
            quotes,
            region,
            engine,
            growth_rate,
            iops,
            throughput,
        } => {
            let overrides = EstimateOverrides {
                region,
                engine,
                growth_rate_percent: growth_rate,
                provisioned_iops: iops,
                provisioned_throughput_mbps: throughput,
            };
            commands::estimate::run(&input, &quotes, cli.catalog.as_deref(), overrides, cli.format)
                .await?;
        }
        Commands::Parse { input } => {
            commands::parse::run(&input, cli.format)?;
        }
    }

    Ok(())
}
