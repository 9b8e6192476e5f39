//! # In-Memory Batch Transport
//!
//! Size-limited transport that keeps everything in process. Used for local
//! runs and throughout the test suite; it behaves like a hosted event hub as
//! far as the engine can observe:
//!
//! - every batch has a fixed serialized-size ceiling
//! - each event carries a per-event framing overhead
//! - individual send attempts can be made to fail
//! - disposal is recorded so session discipline can be asserted
//!
//! ## Usage
//!
//! ```rust
//! use eventpump::messaging::{InMemoryTransport, Payload};
//! use eventpump::producer::discover_capacity;
//!
//! # tokio_test::block_on(async {
//! let mut transport = InMemoryTransport::new(10_000);
//! let capacity = discover_capacity(&mut transport, &Payload::sample(1000)).await?;
//! assert_eq!(capacity, 10);
//! # Ok::<(), eventpump::EventPumpError>(())
//! # }).unwrap();
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::error::{EventPumpError, Result};
use crate::messaging::payload::Payload;
use crate::messaging::transport::{BatchTransport, EventBatch};

/// A batch captured by the in-memory transport after a successful send
#[derive(Debug, Clone)]
pub struct SentBatch {
    /// Zero-based index of the send attempt that delivered this batch
    pub attempt: usize,
    pub payloads: Vec<Payload>,
    pub size_in_bytes: usize,
}

impl SentBatch {
    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

#[derive(Debug, Default)]
struct TransportLog {
    batches_created: usize,
    send_attempts: usize,
    sent: Vec<SentBatch>,
    failing_attempts: HashSet<usize>,
    fail_dispose: bool,
    dispose_calls: usize,
}

/// Read-side view of an [`InMemoryTransport`] that outlives the transport
/// itself, since dispatch takes ownership of the session.
#[derive(Debug, Clone)]
pub struct InMemoryTransportHandle {
    log: Arc<Mutex<TransportLog>>,
}

impl InMemoryTransportHandle {
    pub fn sent_batches(&self) -> Vec<SentBatch> {
        self.log.lock().sent.clone()
    }

    /// Sizes of the successfully sent batches, in send order
    pub fn sent_batch_sizes(&self) -> Vec<usize> {
        self.log.lock().sent.iter().map(SentBatch::len).collect()
    }

    pub fn sent_event_count(&self) -> usize {
        self.log.lock().sent.iter().map(SentBatch::len).sum()
    }

    pub fn send_attempts(&self) -> usize {
        self.log.lock().send_attempts
    }

    pub fn batches_created(&self) -> usize {
        self.log.lock().batches_created
    }

    pub fn dispose_calls(&self) -> usize {
        self.log.lock().dispose_calls
    }

    pub fn is_disposed(&self) -> bool {
        self.dispose_calls() > 0
    }
}

/// Batch produced by [`InMemoryTransport`]
#[derive(Debug)]
pub struct InMemoryBatch {
    max_bytes: usize,
    per_event_overhead: usize,
    size_in_bytes: usize,
    payloads: Vec<Payload>,
}

impl EventBatch for InMemoryBatch {
    fn try_add(&mut self, payload: &Payload) -> bool {
        let event_size = payload.len() + self.per_event_overhead;
        if self.size_in_bytes + event_size > self.max_bytes {
            return false;
        }
        self.size_in_bytes += event_size;
        self.payloads.push(payload.clone());
        true
    }

    fn len(&self) -> usize {
        self.payloads.len()
    }

    fn size_in_bytes(&self) -> usize {
        self.size_in_bytes
    }
}

/// In-process transport with a fixed per-batch size limit
#[derive(Debug)]
pub struct InMemoryTransport {
    max_batch_bytes: usize,
    per_event_overhead: usize,
    log: Arc<Mutex<TransportLog>>,
}

impl InMemoryTransport {
    /// Transport whose batches hold at most `max_batch_bytes` serialized bytes
    pub fn new(max_batch_bytes: usize) -> Self {
        Self {
            max_batch_bytes,
            per_event_overhead: 0,
            log: Arc::new(Mutex::new(TransportLog::default())),
        }
    }

    /// Charge `bytes` of framing overhead for every event added to a batch
    pub fn with_per_event_overhead(mut self, bytes: usize) -> Self {
        self.per_event_overhead = bytes;
        self
    }

    /// Make the given zero-based send attempts fail
    pub fn with_failing_sends(self, attempts: impl IntoIterator<Item = usize>) -> Self {
        self.log.lock().failing_attempts.extend(attempts);
        self
    }

    /// Make [`BatchTransport::dispose`] report an error (it is still recorded)
    pub fn with_failing_dispose(self) -> Self {
        self.log.lock().fail_dispose = true;
        self
    }

    pub fn handle(&self) -> InMemoryTransportHandle {
        InMemoryTransportHandle {
            log: Arc::clone(&self.log),
        }
    }

    pub fn max_batch_bytes(&self) -> usize {
        self.max_batch_bytes
    }
}

#[async_trait]
impl BatchTransport for InMemoryTransport {
    type Batch = InMemoryBatch;

    async fn create_batch(&mut self) -> Result<Self::Batch> {
        let mut log = self.log.lock();
        if log.dispose_calls > 0 {
            return Err(EventPumpError::transport(
                "create_batch",
                "transport session already disposed",
            ));
        }
        log.batches_created += 1;
        Ok(InMemoryBatch {
            max_bytes: self.max_batch_bytes,
            per_event_overhead: self.per_event_overhead,
            size_in_bytes: 0,
            payloads: Vec::new(),
        })
    }

    async fn send(&mut self, batch: Self::Batch) -> Result<()> {
        let mut log = self.log.lock();
        let attempt = log.send_attempts;
        log.send_attempts += 1;

        if log.failing_attempts.contains(&attempt) {
            debug!(attempt, events = batch.len(), "Injected send failure");
            return Err(EventPumpError::transport(
                "send",
                format!("send attempt {attempt} rejected by broker"),
            ));
        }

        log.sent.push(SentBatch {
            attempt,
            size_in_bytes: batch.size_in_bytes,
            payloads: batch.payloads,
        });
        Ok(())
    }

    async fn dispose(&mut self) -> Result<()> {
        let mut log = self.log.lock();
        log.dispose_calls += 1;
        if log.fail_dispose {
            return Err(EventPumpError::transport("dispose", "link detach timed out"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_batch_rejects_payload_past_limit() {
        let mut transport = InMemoryTransport::new(250);
        let mut batch = transport.create_batch().await.unwrap();
        let payload = Payload::sample(100);

        assert!(batch.try_add(&payload));
        assert!(batch.try_add(&payload));
        assert!(!batch.try_add(&payload));
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.size_in_bytes(), 200);
    }

    #[tokio::test]
    async fn test_per_event_overhead_counts_against_limit() {
        let mut transport = InMemoryTransport::new(280).with_per_event_overhead(30);
        let mut batch = transport.create_batch().await.unwrap();
        let payload = Payload::sample(100);

        assert!(batch.try_add(&payload));
        assert!(batch.try_add(&payload));
        assert!(!batch.try_add(&Payload::sample(1)));
        assert_eq!(batch.size_in_bytes(), 260);
    }

    #[tokio::test]
    async fn test_failing_send_is_not_recorded() {
        let mut transport = InMemoryTransport::new(1_000).with_failing_sends([0]);
        let handle = transport.handle();

        let mut first = transport.create_batch().await.unwrap();
        assert!(first.try_add(&Payload::sample(10)));
        assert!(transport.send(first).await.is_err());

        let mut second = transport.create_batch().await.unwrap();
        assert!(second.try_add(&Payload::sample(10)));
        transport.send(second).await.unwrap();

        assert_eq!(handle.send_attempts(), 2);
        assert_eq!(handle.sent_batch_sizes(), vec![1]);
        assert_eq!(handle.sent_batches()[0].attempt, 1);
    }

    #[tokio::test]
    async fn test_disposed_session_refuses_new_batches() {
        let mut transport = InMemoryTransport::new(1_000);
        let handle = transport.handle();

        transport.dispose().await.unwrap();
        assert!(handle.is_disposed());
        assert!(matches!(
            transport.create_batch().await,
            Err(EventPumpError::Transport { .. })
        ));
    }
}
