//! Dispatch pipeline metric recorders
//!
//! Thin wrappers over the `metrics` facade. Without an installed recorder
//! every call is a no-op.

use metrics::{counter, gauge, histogram};

/// What caused a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// Next item would reach `max_batch_bytes`
    Bytes,
    /// Buffer reached `max_batch_count`
    Count,
    /// Periodic interval elapsed
    Interval,
    /// Final flush after draining on close
    Shutdown,
}

impl FlushTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bytes => "bytes",
            Self::Count => "count",
            Self::Interval => "interval",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Why a record never made it into a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Attribute flattening failed
    Normalize,
    /// JSON encoding failed
    Serialize,
    /// Intake channel closed while the record was in flight
    Closed,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normalize => "normalize",
            Self::Serialize => "serialize",
            Self::Closed => "closed",
        }
    }
}

/// Record accepted by `submit`
pub fn record_record_submitted(key: &str) {
    counter!("objects_records_submitted_total", "collection" => key.to_string()).increment(1);
}

/// Record dropped before reaching a batch
pub fn record_record_dropped(key: &str, reason: DropReason) {
    counter!(
        "objects_records_dropped_total",
        "collection" => key.to_string(),
        "reason" => reason.as_str()
    )
    .increment(1);
}

/// Batch built from a buffer
pub fn record_batch_flushed(key: &str, trigger: FlushTrigger, items: usize, bytes: usize) {
    counter!(
        "objects_batches_flushed_total",
        "collection" => key.to_string(),
        "trigger" => trigger.as_str()
    )
    .increment(1);
    histogram!("objects_batch_items").record(items as f64);
    histogram!("objects_batch_bytes").record(bytes as f64);
}

/// Final outcome of sending one batch
pub fn record_send_result(key: &str, success: bool, attempts: u32, elapsed_ms: f64) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "objects_batches_sent_total",
        "collection" => key.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!("objects_send_attempts").record(attempts as f64);
    histogram!("objects_send_duration_ms", "status" => status).record(elapsed_ms);
}

/// Time a flush waited for an admission slot
pub fn record_admission_wait_ms(wait_ms: f64) {
    histogram!("objects_admission_wait_ms").record(wait_ms);
}

/// Number of live per-key buffers
pub fn record_active_buffers(count: usize) {
    gauge!("objects_active_buffers").set(count as f64);
}
