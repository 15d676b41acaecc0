//! Dispatcher counters for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Lock-free counters shared by the dispatcher, its workers and its senders
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    /// Records accepted by `submit`
    records_submitted: AtomicU64,
    /// Records encoded into a buffer
    records_buffered: AtomicU64,
    /// Records dropped (encode failure or closed intake)
    records_dropped: AtomicU64,
    /// Batches built by a flush
    batches_flushed: AtomicU64,
    /// Batches delivered
    batches_sent: AtomicU64,
    /// Batches discarded (encode failure or retries exhausted)
    batches_failed: AtomicU64,
    /// Items inside delivered batches
    items_sent: AtomicU64,
    /// Request attempts, retries included
    send_attempts: AtomicU64,
    /// Live per-key buffers
    active_buffers: AtomicUsize,
}

impl DispatcherMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records_submitted(&self) -> u64 {
        self.records_submitted.load(Ordering::Relaxed)
    }

    pub fn inc_records_submitted(&self) {
        self.records_submitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn records_buffered(&self) -> u64 {
        self.records_buffered.load(Ordering::Relaxed)
    }

    pub fn inc_records_buffered(&self) {
        self.records_buffered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn records_dropped(&self) -> u64 {
        self.records_dropped.load(Ordering::Relaxed)
    }

    pub fn inc_records_dropped(&self) {
        self.records_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn batches_flushed(&self) -> u64 {
        self.batches_flushed.load(Ordering::Relaxed)
    }

    pub fn inc_batches_flushed(&self) {
        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn batches_sent(&self) -> u64 {
        self.batches_sent.load(Ordering::Relaxed)
    }

    /// Count a delivered batch of `items` items
    pub fn inc_batches_sent(&self, items: usize) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.items_sent.fetch_add(items as u64, Ordering::Relaxed);
    }

    pub fn batches_failed(&self) -> u64 {
        self.batches_failed.load(Ordering::Relaxed)
    }

    pub fn inc_batches_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn items_sent(&self) -> u64 {
        self.items_sent.load(Ordering::Relaxed)
    }

    pub fn send_attempts(&self) -> u64 {
        self.send_attempts.load(Ordering::Relaxed)
    }

    pub fn inc_send_attempts(&self) {
        self.send_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn active_buffers(&self) -> usize {
        self.active_buffers.load(Ordering::Relaxed)
    }

    /// Count a newly created buffer, returning the new total
    pub fn inc_active_buffers(&self) -> usize {
        self.active_buffers.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_submitted: self.records_submitted(),
            records_buffered: self.records_buffered(),
            records_dropped: self.records_dropped(),
            batches_flushed: self.batches_flushed(),
            batches_sent: self.batches_sent(),
            batches_failed: self.batches_failed(),
            items_sent: self.items_sent(),
            send_attempts: self.send_attempts(),
            active_buffers: self.active_buffers(),
        }
    }
}

/// Snapshot of dispatcher metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_submitted: u64,
    pub records_buffered: u64,
    pub records_dropped: u64,
    pub batches_flushed: u64,
    pub batches_sent: u64,
    pub batches_failed: u64,
    pub items_sent: u64,
    pub send_attempts: u64,
    pub active_buffers: usize,
}

impl MetricsSnapshot {
    /// Attempts beyond the first per batch
    pub fn retries(&self) -> u64 {
        self.send_attempts
            .saturating_sub(self.batches_sent + self.batches_failed)
    }
}
