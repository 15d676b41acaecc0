//! Dispatcher - routes records to per-key workers and owns shutdown

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use contracts::{ClientConfig, Normalizer, Record, Transport};
use observability::DropReason;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument, warn};

use crate::error::DispatcherError;
use crate::flusher::Flusher;
use crate::metrics::{DispatcherMetrics, MetricsSnapshot};
use crate::normalize::FlattenNormalizer;
use crate::registry::{BufferHandle, BufferRegistry};
use crate::sender::Sender;
use crate::transports::HttpTransport;
use crate::worker::{BatchLimits, FlushWorker};

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder<T> {
    config: ClientConfig,
    transport: T,
    normalizer: Arc<dyn Normalizer>,
    runtime: Option<Handle>,
}

impl<T: Transport + Sync + 'static> DispatcherBuilder<T> {
    pub fn new(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            normalizer: Arc::new(FlattenNormalizer::default()),
            runtime: None,
        }
    }

    /// Replace the default flattening normalizer
    pub fn normalizer(mut self, normalizer: impl Normalizer + 'static) -> Self {
        self.normalizer = Arc::new(normalizer);
        self
    }

    /// Runtime that hosts the per-key workers
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// # Panics
    ///
    /// Without an explicit [`runtime`](Self::runtime), panics when called
    /// outside a tokio runtime.
    pub fn build(self) -> Dispatcher<T> {
        let metrics = Arc::new(DispatcherMetrics::new());
        let sender = Sender::new(
            self.transport,
            self.config.retry.clone(),
            Arc::clone(&metrics),
        );
        let flusher = Flusher::new(
            self.config.write_key.clone(),
            self.config.max_concurrent_sends,
            sender,
            Arc::clone(&metrics),
        );

        Dispatcher {
            limits: BatchLimits::from_config(&self.config),
            config: self.config,
            registry: BufferRegistry::new(),
            runtime: self.runtime.unwrap_or_else(Handle::current),
            workers: TaskTracker::new(),
            shutdown: CancellationToken::new(),
            closed: AtomicBool::new(false),
            normalizer: self.normalizer,
            flusher: Arc::new(flusher),
            metrics,
        }
    }
}

/// Fire-and-forget batching client
///
/// `submit` routes each record to the worker for its key, creating the
/// worker on first use. `close` drains every worker and waits for all
/// outstanding sends. Nothing is reported back to the caller of `submit`;
/// failures surface only in logs and metrics.
///
/// Workers run on the runtime captured at build time, so `submit` may be
/// called from any thread.
pub struct Dispatcher<T = HttpTransport> {
    config: ClientConfig,
    limits: BatchLimits,
    registry: BufferRegistry,
    runtime: Handle,
    workers: TaskTracker,
    /// Root of every per-key shutdown signal
    shutdown: CancellationToken,
    closed: AtomicBool,
    normalizer: Arc<dyn Normalizer>,
    flusher: Arc<Flusher<T>>,
    metrics: Arc<DispatcherMetrics>,
}

impl Dispatcher<HttpTransport> {
    /// Dispatcher sending over HTTP to `config.endpoint`
    pub fn new(config: ClientConfig) -> Result<Self, DispatcherError> {
        let transport = HttpTransport::from_config(&config)?;
        Ok(DispatcherBuilder::new(config, transport).build())
    }
}

impl<T: Transport + Sync + 'static> Dispatcher<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        DispatcherBuilder::new(config, transport).build()
    }

    pub fn builder(config: ClientConfig, transport: T) -> DispatcherBuilder<T> {
        DispatcherBuilder::new(config, transport)
    }

    /// Queue a record for batching
    ///
    /// Ignored once `close` has begun. A record racing a close can still pass
    /// the flag check and find its buffer already draining; it is then
    /// logged and counted as dropped.
    pub fn submit(&self, record: Record) {
        if self.closed.load(Ordering::Acquire) {
            debug!(key = %record.key, record_id = %record.id, "Dispatcher closed, record ignored");
            return;
        }

        self.metrics.inc_records_submitted();
        observability::record_record_submitted(&record.key);

        let handle = self
            .registry
            .get_or_create(&record.key, |key| self.spawn_worker(key));
        if let Err(record) = handle.send(record) {
            warn!(
                key = %record.key,
                record_id = %record.id,
                "Buffer already draining, record dropped"
            );
            self.metrics.inc_records_dropped();
            observability::record_record_dropped(&record.key, DropReason::Closed);
        }
    }

    /// Drain every buffer and wait for all sends to finish
    ///
    /// Idempotent; only the first call does any work.
    #[instrument(name = "dispatcher_close", skip(self))]
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            debug!("Dispatcher already closed");
            return;
        }

        let buffers = self.registry.snapshot();
        info!(buffers = buffers.len(), "Closing dispatcher, draining buffers");
        for (_, handle) in &buffers {
            handle.shutdown();
        }
        // Buffers created after the snapshot start out cancelled
        self.shutdown.cancel();
        self.workers.close();
        self.workers.wait().await;

        debug!(in_flight = self.flusher.in_flight(), "Buffers drained, waiting for sends");
        self.flusher.wait_idle().await;

        let snapshot = self.metrics.snapshot();
        info!(
            records = snapshot.records_submitted,
            dropped = snapshot.records_dropped,
            batches_sent = snapshot.batches_sent,
            batches_failed = snapshot.batches_failed,
            "Dispatcher closed"
        );
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Number of keys that have a buffer
    pub fn buffer_count(&self) -> usize {
        self.registry.len()
    }

    /// Keys that have a buffer, in no particular order
    pub fn keys(&self) -> Vec<String> {
        self.registry
            .snapshot()
            .into_iter()
            .map(|(key, _)| key)
            .collect()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        self.flusher.sender().transport()
    }

    /// Start the worker for a new key; runs under the registry's shard lock
    fn spawn_worker(&self, key: &str) -> BufferHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = self.shutdown.child_token();
        let worker = FlushWorker::new(
            key,
            rx,
            shutdown.clone(),
            Arc::clone(&self.normalizer),
            Arc::clone(&self.flusher),
            self.limits,
            Arc::clone(&self.metrics),
        );
        self.workers.spawn_on(worker.run(), &self.runtime);

        let active = self.metrics.inc_active_buffers();
        observability::record_active_buffers(active);
        debug!(key, active, "Buffer created");

        BufferHandle::new(key, tx, shutdown)
    }
}
