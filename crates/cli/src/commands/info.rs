//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::ClientConfig;
use serde::Serialize;
use tracing::info;

use super::config::{load_config, mask_secret, source_label};
use crate::cli::InfoArgs;

/// Effective configuration for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    client_version: &'static str,
    source: String,
    send_url: String,
    #[serde(flatten)]
    config: ClientConfig,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %source_label(&args.config), "Loading configuration info");

    let mut config = load_config(&args.config).with_context(|| {
        format!("Failed to load config from {}", source_label(&args.config))
    })?;
    if !args.show_secrets {
        config.write_key = mask_secret(&config.write_key);
    }

    let info = ConfigInfo {
        client_version: dispatcher::VERSION,
        source: source_label(&args.config),
        send_url: format!(
            "{}{}",
            config.endpoint.trim_end_matches('/'),
            dispatcher::SET_PATH
        ),
        config,
    };

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn print_config_info(info: &ConfigInfo) {
    let config = &info.config;

    println!("\n=== objects-dispatch {} ===\n", info.client_version);
    println!("Source: {}", info.source);

    println!("\nEndpoint:");
    println!("  URL: {}", info.send_url);
    println!("  Write key: {}", config.write_key);
    println!("  Request timeout: {}ms", config.request_timeout_ms);

    println!("\nBatching:");
    println!("  Max bytes: {}", config.max_batch_bytes);
    println!("  Max count: {}", config.max_batch_count);
    println!("  Interval: {}ms", config.max_batch_interval_ms);
    println!("  Concurrent sends: {}", config.max_concurrent_sends);

    let retry = &config.retry;
    println!("\nRetry:");
    println!("  Initial interval: {}ms", retry.initial_interval_ms);
    println!("  Multiplier: {}", retry.multiplier);
    println!("  Randomization: {}", retry.randomization_factor);
    println!("  Max interval: {}ms", retry.max_interval_ms);
    println!("  Max elapsed: {}ms", retry.max_elapsed_ms);
    println!();
}
