//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
///
/// None of these reach the caller of `Dispatcher::submit`; they are logged
/// where they happen and returned only from internal send paths.
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// HTTP client construction failed
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// Endpoint answered with a non-2xx status
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// Every attempt failed before the retry ceiling
    #[error("gave up after {attempts} attempts in {elapsed_ms}ms: {last}")]
    RetriesExhausted {
        attempts: u32,
        elapsed_ms: u128,
        #[source]
        last: Box<DispatcherError>,
    },

    /// Transport, encoding or normalization error (from contract)
    #[error(transparent)]
    Contract(#[from] contracts::ContractError),
}

impl DispatcherError {
    /// Create a status error
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }
}
