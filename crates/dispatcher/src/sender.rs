//! Sender - one batch, one request, retried with backoff

use bytes::Bytes;
use contracts::{Batch, RetryConfig, Transport};
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, instrument, warn};

use crate::error::DispatcherError;
use crate::metrics::DispatcherMetrics;
use crate::retry::ExponentialBackoff;

/// Path batches are POSTed to, relative to the endpoint
pub const SET_PATH: &str = "/v1/set";

/// Delivers batches through a transport, retrying until the elapsed-time ceiling
pub struct Sender<T> {
    transport: T,
    retry: RetryConfig,
    metrics: Arc<DispatcherMetrics>,
}

impl<T: Transport> Sender<T> {
    pub fn new(transport: T, retry: RetryConfig, metrics: Arc<DispatcherMetrics>) -> Self {
        Self {
            transport,
            retry,
            metrics,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send one batch
    ///
    /// Transport errors and non-2xx statuses are retried with exponential
    /// backoff. When the ceiling is reached the batch is logged once and
    /// discarded; the returned error is informational only.
    #[instrument(
        name = "sender_send",
        skip(self, batch),
        fields(collection = %batch.collection, items = batch.len())
    )]
    pub async fn send(&self, batch: Batch) -> Result<(), DispatcherError> {
        let body = match batch.to_json() {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "Batch failed to marshal, dropping it");
                self.metrics.inc_batches_failed();
                return Err(e.into());
            }
        };

        let started = Instant::now();
        let mut backoff = ExponentialBackoff::new(&self.retry);
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            self.metrics.inc_send_attempts();

            let err = match self.attempt(body.clone()).await {
                Ok(()) => {
                    let elapsed = started.elapsed();
                    debug!(
                        attempts,
                        elapsed_ms = elapsed.as_millis() as u64,
                        transport = self.transport.name(),
                        "Batch sent"
                    );
                    self.metrics.inc_batches_sent(batch.len());
                    observability::record_send_result(
                        &batch.collection,
                        true,
                        attempts,
                        elapsed.as_secs_f64() * 1000.0,
                    );
                    return Ok(());
                }
                Err(e) => e,
            };

            match backoff.next_backoff(started.elapsed()) {
                Some(delay) => {
                    warn!(
                        attempt = attempts,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %err,
                        "Send failed, retrying"
                    );
                    sleep(delay).await;
                }
                None => {
                    let elapsed = started.elapsed();
                    error!(
                        attempts,
                        elapsed_ms = elapsed.as_millis() as u64,
                        error = %err,
                        "Send failed, giving up; batch dropped"
                    );
                    self.metrics.inc_batches_failed();
                    observability::record_send_result(
                        &batch.collection,
                        false,
                        attempts,
                        elapsed.as_secs_f64() * 1000.0,
                    );
                    return Err(DispatcherError::RetriesExhausted {
                        attempts,
                        elapsed_ms: elapsed.as_millis(),
                        last: Box::new(err),
                    });
                }
            }
        }
    }

    async fn attempt(&self, body: Bytes) -> Result<(), DispatcherError> {
        let response = self.transport.post_json(SET_PATH, body).await?;
        if response.is_success() {
            Ok(())
        } else {
            Err(DispatcherError::status(response.status, response.body))
        }
    }
}
