//! # Dispatcher
//!
//! Batching client for the objects API.
//!
//! Responsibilities:
//! - route each `Record` to the worker owning its key, creating it once
//! - flush per-key buffers on size, count, interval and shutdown
//! - bound outstanding sends and retry failed ones with backoff
//! - drain everything on `close`

pub mod buffer;
pub mod dispatcher;
pub mod error;
pub mod flusher;
pub mod metrics;
pub mod normalize;
pub mod registry;
pub mod retry;
pub mod sender;
pub mod transports;
pub mod worker;

/// Client version, sent in the `User-Agent` header
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use contracts::{ClientConfig, Record, RetryConfig};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use error::DispatcherError;
pub use metrics::{DispatcherMetrics, MetricsSnapshot};
pub use normalize::FlattenNormalizer;
pub use sender::SET_PATH;
pub use transports::{HttpTransport, MemoryTransport, RecordedRequest, Reply};
pub use worker::{BatchLimits, WorkerState};
