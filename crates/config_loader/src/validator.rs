//! Config validation
//!
//! Rules:
//! - field ranges declared on `ClientConfig` (endpoint URL, non-empty write_key, positive limits)
//! - retry initial_interval <= max_interval
//! - retry max_elapsed >= initial_interval
//! - request_timeout <= retry max_elapsed

use contracts::{ClientConfig, ContractError};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate a `ClientConfig`
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &ClientConfig) -> Result<(), ContractError> {
    validate_fields(config)?;
    validate_retry(config)?;
    Ok(())
}

/// Declarative per-field rules
fn validate_fields(config: &ClientConfig) -> Result<(), ContractError> {
    config
        .validate()
        .map_err(|errors| first_error(&errors, String::new()))
}

/// Cross-field retry rules
fn validate_retry(config: &ClientConfig) -> Result<(), ContractError> {
    let retry = &config.retry;

    if retry.initial_interval_ms > retry.max_interval_ms {
        return Err(ContractError::config_validation(
            "retry.initial_interval_ms / retry.max_interval_ms",
            format!(
                "initial_interval_ms ({}) must be <= max_interval_ms ({})",
                retry.initial_interval_ms, retry.max_interval_ms
            ),
        ));
    }

    if retry.max_elapsed_ms < retry.initial_interval_ms {
        return Err(ContractError::config_validation(
            "retry.max_elapsed_ms",
            format!(
                "max_elapsed_ms ({}) must be >= initial_interval_ms ({})",
                retry.max_elapsed_ms, retry.initial_interval_ms
            ),
        ));
    }

    if config.request_timeout_ms > retry.max_elapsed_ms {
        return Err(ContractError::config_validation(
            "request_timeout_ms",
            format!(
                "request_timeout_ms ({}) must be <= retry.max_elapsed_ms ({})",
                config.request_timeout_ms, retry.max_elapsed_ms
            ),
        ));
    }

    Ok(())
}

/// Flatten validator's error tree into the first dotted field path
fn first_error(errors: &ValidationErrors, prefix: String) -> ContractError {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                let message = list
                    .first()
                    .map(|e| match &e.message {
                        Some(m) => m.to_string(),
                        None => format!("failed '{}' check", e.code),
                    })
                    .unwrap_or_else(|| "invalid value".to_string());
                return ContractError::config_validation(path, message);
            }
            ValidationErrorsKind::Struct(inner) => return first_error(inner, path),
            ValidationErrorsKind::List(items) => {
                if let Some((idx, inner)) = items.iter().next() {
                    return first_error(inner, format!("{path}[{idx}]"));
                }
            }
        }
    }

    ContractError::config_validation(prefix, "invalid configuration")
}
