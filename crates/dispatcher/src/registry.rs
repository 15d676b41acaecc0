//! BufferRegistry - key -> buffer routing
//!
//! Uses DashMap so lookups for existing keys only take a shard read lock;
//! creation goes through the entry API, which holds the shard write lock
//! while the create function runs. That makes creation happen at most once
//! per key no matter how many callers race on a new key.

use std::sync::Arc;

use contracts::Record;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Caller-side endpoint of one key's buffer: its intake channel and shutdown signal
#[derive(Debug, Clone)]
pub struct BufferHandle {
    key: Arc<str>,
    tx: mpsc::UnboundedSender<Record>,
    shutdown: CancellationToken,
}

impl BufferHandle {
    pub fn new(
        key: impl Into<Arc<str>>,
        tx: mpsc::UnboundedSender<Record>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            key: key.into(),
            tx,
            shutdown,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Queue a record for the worker
    ///
    /// Returns the record back if the worker has already closed its intake.
    pub fn send(&self, record: Record) -> Result<(), Record> {
        self.tx.send(record).map_err(|e| e.0)
    }

    /// Ask the worker to drain and stop
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Whether both handles feed the same buffer
    pub fn same_buffer(&self, other: &BufferHandle) -> bool {
        self.tx.same_channel(&other.tx)
    }
}

/// Concurrent map from stream key to buffer handle
///
/// Entries are only ever added; they live as long as the registry.
#[derive(Debug, Default)]
pub struct BufferRegistry {
    buffers: DashMap<String, BufferHandle>,
}

impl BufferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the handle for `key`, running `create` if the key is new
    ///
    /// `create` runs at most once per key, under the shard lock, and must
    /// not call back into the registry.
    pub fn get_or_create<F>(&self, key: &str, create: F) -> BufferHandle
    where
        F: FnOnce(&str) -> BufferHandle,
    {
        if let Some(handle) = self.buffers.get(key).map(|entry| entry.value().clone()) {
            return handle;
        }

        self.buffers
            .entry(key.to_string())
            .or_insert_with(|| create(key))
            .value()
            .clone()
    }

    /// Point-in-time copy of all entries
    ///
    /// Keys inserted while the snapshot is taken may or may not appear.
    pub fn snapshot(&self) -> Vec<(String, BufferHandle)> {
        self.buffers
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}
