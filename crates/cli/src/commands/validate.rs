//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::ClientConfig;
use serde::Serialize;
use tracing::info;

use super::config::{load_config, source_label};
use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %source_label(&args.config), "Validating configuration");

    let result = match load_config(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                source: source_label(&args.config),
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            source: source_label(&args.config),
            error: Some(e.to_string()),
            warnings: None,
        },
    };

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

/// Non-fatal issues worth pointing out
fn collect_warnings(config: &ClientConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.endpoint.starts_with("http://") {
        warnings.push("endpoint is not HTTPS; the write key is sent in clear text".to_string());
    }

    if config.request_timeout_ms == config.retry.max_elapsed_ms {
        warnings.push(format!(
            "request_timeout_ms equals retry.max_elapsed_ms ({}); one slow attempt uses the whole retry budget",
            config.retry.max_elapsed_ms
        ));
    }

    if config.max_batch_count == 1 {
        warnings.push("max_batch_count = 1 sends one request per record".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.source);

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.source);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_warns_about_timeout() {
        let warnings = collect_warnings(&ClientConfig::new("wk"));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("request_timeout_ms"));

        let mut config = ClientConfig::new("wk");
        config.request_timeout_ms = 5_000;
        assert!(collect_warnings(&config).is_empty());
    }

    #[test]
    fn test_plain_http_warns() {
        let mut config = ClientConfig::new("wk").with_endpoint("http://localhost:8080");
        config.request_timeout_ms = 1_000;
        let warnings = collect_warnings(&config);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("HTTPS"));
    }
}
