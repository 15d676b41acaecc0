//! # objects-dispatch
//!
//! Command-line entry point.
//!
//! Provides:
//! - batching NDJSON records from a file or stdin to the objects API
//! - configuration validation and inspection

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_send, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(version = dispatcher::VERSION, "objects-dispatch starting");

    let result = match &cli.command {
        Commands::Send(args) => run_send(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Install the tracing subscriber (and the Prometheus exporter for `send`)
fn init_logging(cli: &Cli) -> Result<()> {
    let metrics_port = match &cli.command {
        Commands::Send(args) if args.metrics_port != 0 => Some(args.metrics_port),
        _ => None,
    };

    let config =
        ObservabilityConfig::for_verbosity(cli.log_format.into(), cli.verbose, cli.quiet)
            .with_metrics_port(metrics_port);
    observability::init_with_config(config)
}
