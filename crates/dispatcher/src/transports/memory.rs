//! MemoryTransport - records requests instead of sending them

use bytes::Bytes;
use contracts::{ContractError, Transport, TransportResponse};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Scripted answer to one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Respond with this status
    Status(u16),
    /// Fail without a response
    Fail(String),
}

/// One request as seen by the transport
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub body: Bytes,
    /// Status answered, `None` for a transport failure
    pub status: Option<u16>,
    pub at: Instant,
}

impl RecordedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn collection(&self) -> Option<String> {
        self.json()
            .get("collection")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub fn objects(&self) -> Vec<Value> {
        match self.json().get("objects") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        }
    }

    pub fn delivered(&self) -> bool {
        self.status.is_some_and(|s| (200..300).contains(&s))
    }
}

#[derive(Debug, Default)]
struct Shared {
    requests: Mutex<Vec<RecordedRequest>>,
    script: Mutex<VecDeque<Reply>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// In-process transport for tests and dry runs
///
/// Clones share the same request log, so a caller can keep one clone while
/// handing another to a dispatcher. Replies come from the script first, then
/// from the fallback.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    shared: Arc<Shared>,
    fallback: Reply,
    latency: Duration,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    /// Answer every request with 200
    pub fn new() -> Self {
        Self::always(Reply::Status(200))
    }

    /// Answer every request with `reply`
    pub fn always(reply: Reply) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            fallback: reply,
            latency: Duration::ZERO,
        }
    }

    /// Answer with `replies` in order, then 200
    pub fn scripted(replies: impl IntoIterator<Item = Reply>) -> Self {
        let transport = Self::new();
        lock(&transport.shared.script).extend(replies);
        transport
    }

    /// Hold every request for `latency` before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Every request received, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.shared.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.shared.requests).len()
    }

    /// `objects` arrays of delivered requests for `collection`, in arrival order
    pub fn delivered_batches(&self, collection: &str) -> Vec<Vec<Value>> {
        self.requests()
            .into_iter()
            .filter(|r| r.delivered() && r.collection().as_deref() == Some(collection))
            .map(|r| r.objects())
            .collect()
    }

    /// Highest number of requests observed in progress at once
    pub fn peak_in_flight(&self) -> usize {
        self.shared.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self) -> Reply {
        lock(&self.shared.script)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        "memory"
    }

    async fn post_json(
        &self,
        path: &str,
        body: Bytes,
    ) -> Result<TransportResponse, ContractError> {
        let now = self.shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let reply = self.next_reply();
        let status = match &reply {
            Reply::Status(status) => Some(*status),
            Reply::Fail(_) => None,
        };
        lock(&self.shared.requests).push(RecordedRequest {
            path: path.to_string(),
            body,
            status,
            at: Instant::now(),
        });
        self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            Reply::Status(status) => Ok(TransportResponse::new(status, "")),
            Reply::Fail(message) => Err(ContractError::transport(message)),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
