//! ClientConfig - Config Loader output
//!
//! Endpoint, credential, flush thresholds, admission pool size and retry policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

/// Default base endpoint of the objects API
pub const DEFAULT_ENDPOINT: &str = "https://objects.segment.com";

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ClientConfig {
    /// Base endpoint URL; batches are POSTed to `<endpoint>/v1/set`
    #[serde(default = "default_endpoint")]
    #[validate(url(message = "endpoint must be an absolute URL"))]
    pub endpoint: String,

    /// API credential sent as `writeKey`
    #[serde(default)]
    #[validate(length(min = 1, message = "write_key cannot be empty"))]
    pub write_key: String,

    /// Flush before a batch would reach this many bytes
    #[serde(default = "default_max_batch_bytes")]
    #[validate(range(min = 1))]
    pub max_batch_bytes: usize,

    /// Flush as soon as a batch holds this many items
    #[serde(default = "default_max_batch_count")]
    #[validate(range(min = 1))]
    pub max_batch_count: usize,

    /// Periodic flush interval (milliseconds)
    #[serde(default = "default_max_batch_interval_ms")]
    #[validate(range(min = 1))]
    pub max_batch_interval_ms: u64,

    /// Admission pool size (concurrent outbound sends)
    #[serde(default = "default_max_concurrent_sends")]
    #[validate(range(min = 1))]
    pub max_concurrent_sends: usize,

    /// Per-attempt request timeout (milliseconds); at most `retry.max_elapsed_ms`
    #[serde(default = "default_request_timeout_ms")]
    #[validate(range(min = 1))]
    pub request_timeout_ms: u64,

    /// Send retry policy
    #[serde(default)]
    #[validate(nested)]
    pub retry: RetryConfig,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_max_batch_bytes() -> usize {
    500 << 10
}

fn default_max_batch_count() -> usize {
    100
}

fn default_max_batch_interval_ms() -> u64 {
    10_000
}

fn default_max_concurrent_sends() -> usize {
    10
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl ClientConfig {
    /// Defaults with the given credential
    pub fn new(write_key: impl Into<String>) -> Self {
        Self {
            endpoint: default_endpoint(),
            write_key: write_key.into(),
            max_batch_bytes: default_max_batch_bytes(),
            max_batch_count: default_max_batch_count(),
            max_batch_interval_ms: default_max_batch_interval_ms(),
            max_concurrent_sends: default_max_concurrent_sends(),
            request_timeout_ms: default_request_timeout_ms(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn max_batch_interval(&self) -> Duration {
        Duration::from_millis(self.max_batch_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Exponential backoff with jitter, bounded by total elapsed time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RetryConfig {
    /// First retry delay (milliseconds)
    #[validate(range(min = 1))]
    pub initial_interval_ms: u64,

    /// Delay growth per attempt
    #[validate(range(min = 1.0))]
    pub multiplier: f64,

    /// Jitter: each delay is drawn from `delay * (1 ± factor)`
    #[validate(range(min = 0.0, exclusive_max = 1.0))]
    pub randomization_factor: f64,

    /// Cap on a single delay (milliseconds)
    #[validate(range(min = 1))]
    pub max_interval_ms: u64,

    /// Give up once this much time has passed since the first attempt (milliseconds)
    #[validate(range(min = 1))]
    pub max_elapsed_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: 500,
            multiplier: 1.5,
            randomization_factor: 0.5,
            max_interval_ms: 60_000,
            max_elapsed_ms: 10_000,
        }
    }
}

impl RetryConfig {
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }

    pub fn max_elapsed(&self) -> Duration {
        Duration::from_millis(self.max_elapsed_ms)
    }
}
