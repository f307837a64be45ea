//! nodefit — EC2 instance-type recommender for Kubernetes clusters
//!
//! Collects pod resource usage, simulates bin-packing onto candidate
//! instance fleets, and reports a ranked list of configurations.

mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use nodefit_core::simulation::CancelFlag;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// EC2 instance-type recommender for Kubernetes clusters
#[derive(Parser)]
#[command(name = "nodefit")]
#[command(author, version, about = "EC2 instance-type recommender for Kubernetes clusters", long_about = None)]
pub struct Cli {
    /// Path to a configuration file (can also be set via NODEFIT_CONFIG)
    #[arg(long, env = "NODEFIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose logging
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze cluster metrics and recommend instance types
    Recommend(RecommendArgs),

    /// Run simulations on a saved cluster snapshot
    Simulate(SimulateArgs),

    /// Collect and display the current cluster workload state
    Inspect(InspectArgs),
}

#[derive(Args)]
pub struct RecommendArgs {
    /// Metrics lookback window in hours
    #[arg(long)]
    pub window_hours: Option<u64>,

    /// Sizing percentile, in (0, 1]
    #[arg(long)]
    pub percentile: Option<f64>,

    /// Instance families to consider (comma-separated; default: auto)
    #[arg(long, value_delimiter = ',')]
    pub families: Vec<String>,

    /// Fraction of nodes to run as spot (0.0-1.0)
    #[arg(long)]
    pub spot_ratio: Option<f64>,

    /// Scenario strategy: homogeneous, mixed, or both
    #[arg(long)]
    pub strategy: Option<String>,

    /// Minimum nodes to provision (HA floor)
    #[arg(long)]
    pub min_nodes: Option<u32>,

    /// Maximum nodes per scenario (0 = unlimited)
    #[arg(long)]
    pub max_nodes: Option<u32>,

    /// Number of recommendations to show
    #[arg(long)]
    pub top: Option<usize>,

    /// Prometheus endpoint URL
    #[arg(long, env = "NODEFIT_PROMETHEUS_URL")]
    pub prometheus_url: Option<String>,

    /// Disable the file cache
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Args)]
pub struct SimulateArgs {
    /// Path to a cluster snapshot JSON file (from 'nodefit inspect')
    #[arg(long, short)]
    pub input: PathBuf,

    /// Instance families to consider (comma-separated; default: auto)
    #[arg(long, value_delimiter = ',')]
    pub families: Vec<String>,

    /// Scenario strategy: homogeneous, mixed, or both
    #[arg(long)]
    pub strategy: Option<String>,

    /// Fraction of nodes to run as spot (0.0-1.0)
    #[arg(long)]
    pub spot_ratio: Option<f64>,

    /// Minimum nodes to provision (HA floor)
    #[arg(long)]
    pub min_nodes: Option<u32>,

    /// Number of recommendations to show
    #[arg(long)]
    pub top: Option<usize>,
}

#[derive(Args)]
pub struct InspectArgs {
    /// Metrics lookback window in hours
    #[arg(long)]
    pub window_hours: Option<u64>,

    /// Sizing percentile, in (0, 1]
    #[arg(long)]
    pub percentile: Option<f64>,

    /// Prometheus endpoint URL
    #[arg(long, env = "NODEFIT_PROMETHEUS_URL")]
    pub prometheus_url: Option<String>,

    /// Write the snapshot JSON to a file (consumable by 'simulate')
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Sort workloads by: cpu, memory, or name
    #[arg(long, default_value = "cpu")]
    pub sort_by: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    // Interrupts cancel in-flight simulations rather than killing mid-run.
    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, cancelling");
                cancel.cancel();
            }
        });
    }

    match cli.command {
        Commands::Recommend(args) => {
            commands::recommend::run(cli.config.as_deref(), cli.format, args, cancel).await
        }
        Commands::Simulate(args) => {
            commands::simulate::run(cli.config.as_deref(), cli.format, args, cancel).await
        }
        Commands::Inspect(args) => {
            commands::inspect::run(cli.config.as_deref(), cli.format, args).await
        }
    }
}
