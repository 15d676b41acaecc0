//! `send` command implementation.

use anyhow::{Context, Result};
use contracts::Transport;
use dispatcher::{Dispatcher, MemoryTransport, MetricsSnapshot};
use serde::Serialize;
use std::path::Path;
use tokio::io::{AsyncBufRead, BufReader};
use tokio::time::Instant;
use tracing::{info, warn};

use super::config::{load_config, source_label};
use super::input::{submit_lines, InputStats};
use crate::cli::SendArgs;

/// Run summary for JSON output
#[derive(Serialize)]
struct SendSummary {
    input: InputStats,
    interrupted: bool,
    duration_secs: f64,
    records_dropped: u64,
    batches_sent: u64,
    batches_failed: u64,
    items_sent: u64,
    retries: u64,
    buffers: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    requests_captured: Option<usize>,
}

impl SendSummary {
    fn new(input: InputStats, interrupted: bool, duration_secs: f64, m: &MetricsSnapshot) -> Self {
        Self {
            input,
            interrupted,
            duration_secs,
            records_dropped: m.records_dropped,
            batches_sent: m.batches_sent,
            batches_failed: m.batches_failed,
            items_sent: m.items_sent,
            retries: m.retries(),
            buffers: m.active_buffers,
            requests_captured: None,
        }
    }
}

/// Execute the `send` command
pub async fn run_send(args: &SendArgs) -> Result<()> {
    let config = load_config(&args.config).with_context(|| {
        format!("Failed to load config from {}", source_label(&args.config))
    })?;

    info!(
        endpoint = %config.endpoint,
        max_batch_count = config.max_batch_count,
        max_batch_bytes = config.max_batch_bytes,
        max_concurrent_sends = config.max_concurrent_sends,
        "Configuration loaded"
    );

    let summary = if args.dry_run {
        info!("Dry run mode - requests are kept in memory");
        let transport = MemoryTransport::new();
        let dispatcher = Dispatcher::with_transport(config, transport.clone());
        let mut summary = drive(&dispatcher, args).await?;
        summary.requests_captured = Some(transport.request_count());
        summary
    } else {
        let dispatcher = Dispatcher::new(config).context("Failed to create dispatcher")?;
        drive(&dispatcher, args).await?
    };

    if args.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
        println!("{}", json);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

/// Feed the input through `dispatcher`, then close it
async fn drive<T>(dispatcher: &Dispatcher<T>, args: &SendArgs) -> Result<SendSummary>
where
    T: Transport + Sync + 'static,
{
    let reader = open_input(args.input.as_deref()).await?;

    let started = Instant::now();
    let mut stats = InputStats::default();

    let interrupted = tokio::select! {
        result = submit_lines(dispatcher, reader, args.collection.as_deref(), &mut stats) => {
            result?;
            false
        }
        _ = shutdown_signal() => true,
    };

    if interrupted {
        warn!(submitted = stats.submitted, "Received shutdown signal, draining buffers...");
    } else {
        info!(lines = stats.lines, submitted = stats.submitted, "Input exhausted");
    }

    dispatcher.close().await;

    Ok(SendSummary::new(
        stats,
        interrupted,
        started.elapsed().as_secs_f64(),
        &dispatcher.metrics(),
    ))
}

async fn open_input(path: Option<&Path>) -> Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match path {
        Some(path) if path != Path::new("-") => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input {}", path.display()))?;
            info!(input = %path.display(), "Reading records from file");
            Ok(Box::new(BufReader::new(file)))
        }
        _ => {
            info!("Reading records from stdin");
            Ok(Box::new(BufReader::new(tokio::io::stdin())))
        }
    }
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn print_summary(summary: &SendSummary) {
    println!("\n=== Send Summary ===\n");
    println!("Input:");
    println!("  Lines read: {}", summary.input.lines);
    println!("  Records submitted: {}", summary.input.submitted);
    println!("  Lines skipped: {}", summary.input.skipped);
    if summary.interrupted {
        println!("  (interrupted before end of input)");
    }
    println!("\nDelivery:");
    println!("  Collections: {}", summary.buffers);
    println!("  Batches sent: {}", summary.batches_sent);
    println!("  Items sent: {}", summary.items_sent);
    println!("  Batches failed: {}", summary.batches_failed);
    println!("  Records dropped: {}", summary.records_dropped);
    println!("  Retries: {}", summary.retries);
    if let Some(captured) = summary.requests_captured {
        println!("  Requests captured (dry run): {}", captured);
    }
    println!("\nDuration: {:.2}s", summary.duration_secs);
    println!();
}
