//! Recall - conversation context cache tooling
//!
//! Main entry point for the Recall CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::prelude::*;

mod commands;

use commands::{config, simulate, soak};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Recall - conversation context cache tooling
#[derive(Parser)]
#[command(name = "recall")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// User config directory (default: platform config dir)
    #[arg(long, global = true, env = "RECALL_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Configuration management
    Config(config::ConfigArgs),

    /// Run a deterministic workload against a cache on a simulated clock
    Simulate(simulate::SimulateArgs),

    /// Drive a live cache with a background sweeper for a fixed duration
    Soak(soak::SoakArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

const QUIET_FILTER: &str = "recall=info,recall_session=info,recall_config=info,warn";
const VERBOSE_FILTER: &str = "recall=debug,recall_session=debug,recall_config=debug,info";
const FILE_FILTER: &str = "recall=trace,recall_session=trace,recall_config=trace,info";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = cli
        .config_dir
        .clone()
        .or_else(recall_config::user_config_dir);
    let loaded = recall_config::load_config_with_options(None, config_dir.as_deref())?;
    let logging = loaded.config.logging();

    // Initialize tracing: console on stderr, optional rotating JSON file
    let console_filter = if cli.verbose {
        VERBOSE_FILTER.to_string()
    } else {
        logging.filter.clone().unwrap_or_else(|| QUIET_FILTER.to_string())
    };

    let (file_layer, _guard) = if logging.file {
        let log_dir = logging
            .directory
            .clone()
            .or_else(|| config_dir.as_ref().map(|d| d.join("logs")))
            .unwrap_or_else(|| PathBuf::from("logs"));
        let file_appender = tracing_appender::rolling::daily(&log_dir, "recall.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_filter(tracing_subscriber::EnvFilter::new(FILE_FILTER));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(console_filter)),
        )
        .with(file_layer)
        .init();

    for warning in &loaded.warnings {
        tracing::warn!("{warning}");
    }

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        config_dir,
        loaded,
    };

    match cli.command {
        Commands::Config(args) => config::run(args, &ctx).await,
        Commands::Simulate(args) => simulate::run(args, &ctx).await,
        Commands::Soak(args) => soak::run(args, &ctx).await,
    }
}
