//! FlushWorker - the control loop owning one key's buffer

use contracts::{ClientConfig, Normalizer, Record, SerializedItem, Transport};
use observability::{DropReason, FlushTrigger};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::buffer::KeyedBuffer;
use crate::flusher::Flusher;
use crate::metrics::DispatcherMetrics;

/// Flush thresholds applied by every worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_bytes: usize,
    pub max_count: usize,
    pub interval: Duration,
}

impl BatchLimits {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_bytes: config.max_batch_bytes,
            max_count: config.max_batch_count.max(1),
            // A zero period would make the ticker panic
            interval: config.max_batch_interval().max(Duration::from_millis(1)),
        }
    }
}

/// Lifecycle of a worker; never moves backwards
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Running,
    Draining,
    Terminated,
}

/// Owns one `KeyedBuffer` and reacts to records, the flush timer and shutdown
pub struct FlushWorker<T> {
    buffer: KeyedBuffer,
    rx: mpsc::UnboundedReceiver<Record>,
    shutdown: CancellationToken,
    normalizer: Arc<dyn Normalizer>,
    flusher: Arc<Flusher<T>>,
    limits: BatchLimits,
    metrics: Arc<DispatcherMetrics>,
    state: WorkerState,
}

impl<T: Transport + Sync + 'static> FlushWorker<T> {
    pub fn new(
        key: impl Into<String>,
        rx: mpsc::UnboundedReceiver<Record>,
        shutdown: CancellationToken,
        normalizer: Arc<dyn Normalizer>,
        flusher: Arc<Flusher<T>>,
        limits: BatchLimits,
        metrics: Arc<DispatcherMetrics>,
    ) -> Self {
        Self {
            buffer: KeyedBuffer::new(key),
            rx,
            shutdown,
            normalizer,
            flusher,
            limits,
            metrics,
            state: WorkerState::Running,
        }
    }

    /// Run until shutdown, then drain and flush what is left
    ///
    /// Records, ticks and the shutdown signal are taken in whichever order
    /// they become ready. Returns the terminal state.
    #[instrument(name = "flush_worker", skip(self), fields(key = %self.buffer.key()))]
    pub async fn run(mut self) -> WorkerState {
        let period = self.limits.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!("Worker started");
        while self.state == WorkerState::Running {
            tokio::select! {
                received = self.rx.recv() => match received {
                    Some(record) => self.accept(record).await,
                    // Every sender gone; nothing more can arrive
                    None => self.state = WorkerState::Draining,
                },
                _ = ticker.tick() => {
                    self.flusher.flush(&mut self.buffer, FlushTrigger::Interval).await;
                }
                _ = self.shutdown.cancelled() => self.state = WorkerState::Draining,
            }
        }

        self.drain().await;
        self.state
    }

    async fn drain(&mut self) {
        self.state = WorkerState::Draining;
        self.rx.close();

        let mut drained = 0usize;
        while let Some(record) = self.rx.recv().await {
            self.accept(record).await;
            drained += 1;
        }

        self.flusher
            .flush(&mut self.buffer, FlushTrigger::Shutdown)
            .await;
        self.state = WorkerState::Terminated;
        debug!(drained, "Worker terminated");
    }

    /// Encode one record and apply the size and count thresholds
    async fn accept(&mut self, record: Record) {
        let Some(item) = self.encode(&record) else {
            return;
        };

        if !self.buffer.is_empty()
            && self.buffer.reaches_bytes(item.len(), self.limits.max_bytes)
        {
            self.flusher.flush(&mut self.buffer, FlushTrigger::Bytes).await;
        }

        self.buffer.append(item);
        self.metrics.inc_records_buffered();

        if self.buffer.count() >= self.limits.max_count {
            self.flusher.flush(&mut self.buffer, FlushTrigger::Count).await;
        }
    }

    fn encode(&self, record: &Record) -> Option<SerializedItem> {
        let normalized = match self.normalizer.normalize(&record.id, &record.attributes) {
            Ok(normalized) => normalized,
            Err(e) => {
                warn!(record_id = %record.id, error = %e, "Record failed to normalize, dropping it");
                self.drop_record(DropReason::Normalize);
                return None;
            }
        };

        match SerializedItem::encode(&record.id, &normalized) {
            Ok(item) => Some(item),
            Err(e) => {
                warn!(record_id = %record.id, error = %e, "Record failed to serialize, dropping it");
                self.drop_record(DropReason::Serialize);
                None
            }
        }
    }

    fn drop_record(&self, reason: DropReason) {
        self.metrics.inc_records_dropped();
        observability::record_record_dropped(self.buffer.key(), reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::FlattenNormalizer;
    use crate::sender::Sender;
    use crate::transports::MemoryTransport;
    use contracts::{Attributes, ContractError, NormalizedRecord, RetryConfig};
    use serde_json::json;

    struct Harness {
        tx: mpsc::UnboundedSender<Record>,
        shutdown: CancellationToken,
        flusher: Arc<Flusher<MemoryTransport>>,
        transport: MemoryTransport,
        metrics: Arc<DispatcherMetrics>,
        worker: Option<FlushWorker<MemoryTransport>>,
    }

    impl Harness {
        fn new(limits: BatchLimits) -> Self {
            Self::with_normalizer(limits, Arc::new(FlattenNormalizer::default()))
        }

        fn with_normalizer(limits: BatchLimits, normalizer: Arc<dyn Normalizer>) -> Self {
            let transport = MemoryTransport::new();
            let metrics = Arc::new(DispatcherMetrics::new());
            let sender = Sender::new(
                transport.clone(),
                RetryConfig::default(),
                Arc::clone(&metrics),
            );
            let flusher = Arc::new(Flusher::new("wk", 10, sender, Arc::clone(&metrics)));
            let (tx, rx) = mpsc::unbounded_channel();
            let shutdown = CancellationToken::new();
            let worker = FlushWorker::new(
                "users",
                rx,
                shutdown.clone(),
                normalizer,
                Arc::clone(&flusher),
                limits,
                Arc::clone(&metrics),
            );
            Self {
                tx,
                shutdown,
                flusher,
                transport,
                metrics,
                worker: Some(worker),
            }
        }

        fn submit(&self, record: Record) {
            self.tx.send(record).unwrap();
        }

        fn spawn(&mut self) -> tokio::task::JoinHandle<WorkerState> {
            let worker = self.worker.take().unwrap();
            tokio::spawn(worker.run())
        }

        /// Signal shutdown, wait for the worker and every send
        async fn finish(&self, handle: tokio::task::JoinHandle<WorkerState>) -> WorkerState {
            self.shutdown.cancel();
            let state = handle.await.unwrap();
            self.flusher.wait_idle().await;
            state
        }

        fn batch_sizes(&self) -> Vec<usize> {
            self.transport
                .delivered_batches("users")
                .iter()
                .map(Vec::len)
                .collect()
        }

        fn ids(&self) -> Vec<String> {
            self.transport
                .delivered_batches("users")
                .into_iter()
                .flatten()
                .map(|o| o["id"].as_str().unwrap().to_string())
                .collect()
        }
    }

    fn limits(max_bytes: usize, max_count: usize, interval: Duration) -> BatchLimits {
        BatchLimits {
            max_bytes,
            max_count,
            interval,
        }
    }

    fn record(id: usize) -> Record {
        Record::new("users", format!("{id:04}")).with_attribute("n", id as u64)
    }

    fn item_len(record: &Record) -> usize {
        let normalized = FlattenNormalizer::default()
            .normalize(&record.id, &record.attributes)
            .unwrap();
        SerializedItem::encode(&record.id, &normalized).unwrap().len()
    }

    struct Rejecting(&'static str);

    impl Normalizer for Rejecting {
        fn normalize(
            &self,
            record_id: &str,
            attributes: &Attributes,
        ) -> Result<NormalizedRecord, ContractError> {
            if record_id == self.0 {
                return Err(ContractError::normalization(record_id, "rejected"));
            }
            FlattenNormalizer::default().normalize(record_id, attributes)
        }
    }

    #[test]
    fn test_limits_clamp_zero_values() {
        let mut config = ClientConfig::new("wk");
        config.max_batch_count = 0;
        config.max_batch_interval_ms = 0;
        let limits = BatchLimits::from_config(&config);
        assert_eq!(limits.max_count, 1);
        assert_eq!(limits.interval, Duration::from_millis(1));
    }

    #[tokio::test]
    async fn test_count_trigger_splits_at_max_count() {
        let mut harness = Harness::new(limits(usize::MAX, 100, Duration::from_secs(3600)));
        for i in 0..150 {
            harness.submit(record(i));
        }
        let handle = harness.spawn();
        let state = harness.finish(handle).await;

        assert_eq!(state, WorkerState::Terminated);
        assert_eq!(harness.batch_sizes(), vec![100, 50]);
    }

    #[tokio::test]
    async fn test_bytes_trigger_flushes_before_crossing_item() {
        let len = item_len(&record(0));
        let mut harness = Harness::new(limits(3 * len, 100, Duration::from_secs(3600)));
        for i in 0..6 {
            harness.submit(record(i));
        }
        let handle = harness.spawn();
        harness.finish(handle).await;

        // Two items fit; the third would reach the limit and starts a new batch
        assert_eq!(harness.batch_sizes(), vec![2, 2, 2]);
    }

    #[tokio::test]
    async fn test_oversize_item_forms_its_own_batch() {
        let mut harness = Harness::new(limits(1, 100, Duration::from_secs(3600)));
        for i in 0..3 {
            harness.submit(record(i));
        }
        let handle = harness.spawn();
        harness.finish(handle).await;

        assert_eq!(harness.batch_sizes(), vec![1, 1, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_flushes_idle_buffer() {
        let mut harness = Harness::new(limits(usize::MAX, 100, Duration::from_secs(10)));
        let handle = harness.spawn();
        let started = Instant::now();
        harness.submit(record(1));
        harness.submit(record(2));

        tokio::time::sleep(Duration::from_secs(15)).await;
        let requests = harness.transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].objects().len(), 2);
        let at = requests[0].at.duration_since(started);
        assert!(at >= Duration::from_secs(10) && at < Duration::from_secs(11), "{at:?}");

        // Nothing left for the final flush
        harness.finish(handle).await;
        assert_eq!(harness.transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_normalization_failure_drops_only_that_record() {
        let mut harness = Harness::with_normalizer(
            limits(usize::MAX, 100, Duration::from_secs(3600)),
            Arc::new(Rejecting("0001")),
        );
        for i in 0..3 {
            harness.submit(record(i));
        }
        let handle = harness.spawn();
        harness.finish(handle).await;

        assert_eq!(harness.ids(), vec!["0000", "0002"]);
        assert_eq!(harness.metrics.records_dropped(), 1);
        assert_eq!(harness.metrics.records_buffered(), 2);
    }

    #[tokio::test]
    async fn test_order_preserved_across_batches() {
        let mut harness = Harness::new(limits(usize::MAX, 7, Duration::from_secs(3600)));
        for i in 0..30 {
            harness.submit(record(i));
        }
        let handle = harness.spawn();
        harness.finish(handle).await;

        let expected: Vec<_> = (0..30).map(|i| format!("{i:04}")).collect();
        assert_eq!(harness.ids(), expected);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queued_records() {
        let mut harness = Harness::new(limits(usize::MAX, 100, Duration::from_secs(3600)));
        let handle = harness.spawn();
        // Shutdown already signalled when the records are queued
        harness.shutdown.cancel();
        for i in 0..5 {
            harness.submit(record(i));
        }
        let state = handle.await.unwrap();
        harness.flusher.wait_idle().await;

        assert_eq!(state, WorkerState::Terminated);
        assert_eq!(harness.batch_sizes(), vec![5]);
        assert!(harness.tx.send(record(99)).is_err());
    }

    #[tokio::test]
    async fn test_nested_attributes_are_flattened_on_the_wire() {
        let mut harness = Harness::new(limits(usize::MAX, 100, Duration::from_secs(3600)));
        harness.submit(
            Record::new("users", "u1")
                .with_attribute("address", json!({"city": "Oslo", "zip": "0150"})),
        );
        let handle = harness.spawn();
        harness.finish(handle).await;

        let batches = harness.transport.delivered_batches("users");
        assert_eq!(
            batches[0][0],
            json!({"id": "u1", "properties": {"address.city": "Oslo", "address.zip": "0150"}})
        );
    }
}
