//! Flusher - turns a buffer into a batch and hands it to the admission pool

use contracts::{Batch, Transport};
use observability::FlushTrigger;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

use crate::buffer::KeyedBuffer;
use crate::metrics::DispatcherMetrics;
use crate::sender::Sender;

/// Shared by every flush worker
///
/// At most `max_concurrent_sends` batches are in flight; a flush that finds
/// the pool full waits for a slot, stalling only the worker that issued it.
pub struct Flusher<T> {
    write_key: String,
    admission: Arc<Semaphore>,
    in_flight: TaskTracker,
    sender: Arc<Sender<T>>,
    metrics: Arc<DispatcherMetrics>,
}

impl<T: Transport + Sync + 'static> Flusher<T> {
    pub fn new(
        write_key: impl Into<String>,
        max_concurrent_sends: usize,
        sender: Sender<T>,
        metrics: Arc<DispatcherMetrics>,
    ) -> Self {
        Self {
            write_key: write_key.into(),
            admission: Arc::new(Semaphore::new(max_concurrent_sends.max(1))),
            in_flight: TaskTracker::new(),
            sender: Arc::new(sender),
            metrics,
        }
    }

    /// Flush `buffer` if it holds anything
    ///
    /// The buffer is emptied before waiting for an admission slot.
    pub async fn flush(&self, buffer: &mut KeyedBuffer, trigger: FlushTrigger) {
        if buffer.count() == 0 {
            return;
        }

        let bytes = buffer.size();
        let items = buffer.take();
        let batch = match Batch::from_items(buffer.key(), &self.write_key, &items) {
            Ok(batch) => batch,
            Err(e) => {
                error!(
                    collection = %buffer.key(),
                    items = items.len(),
                    error = %e,
                    "Batch failed to build, dropping it"
                );
                self.metrics.inc_batches_failed();
                return;
            }
        };

        self.metrics.inc_batches_flushed();
        observability::record_batch_flushed(buffer.key(), trigger, batch.len(), bytes);
        debug!(
            collection = %buffer.key(),
            trigger = trigger.as_str(),
            items = batch.len(),
            bytes,
            "Flushing batch"
        );

        let waited = Instant::now();
        let permit = match Arc::clone(&self.admission).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                error!(collection = %buffer.key(), "Admission pool closed, dropping batch");
                self.metrics.inc_batches_failed();
                return;
            }
        };
        observability::record_admission_wait_ms(waited.elapsed().as_secs_f64() * 1000.0);

        let sender = Arc::clone(&self.sender);
        self.in_flight.spawn(async move {
            let _permit = permit;
            // Outcome already logged by the sender
            let _ = sender.send(batch).await;
        });
    }

    /// Wait until every admitted send has finished
    pub async fn wait_idle(&self) {
        self.in_flight.close();
        self.in_flight.wait().await;
    }

    /// Sends currently admitted and not yet finished
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn sender(&self) -> &Sender<T> {
        &self.sender
    }
}
