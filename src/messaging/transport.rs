//! # Batch Transport Contracts
//!
//! Abstraction over a pub/sub producer client with a hard but undisclosed
//! per-batch size limit. The engine only ever learns that limit through
//! [`EventBatch::try_add`] returning `false`.
//!
//! A transport value is the top-level session resource: it is owned by one
//! dispatch at a time and released through [`BatchTransport::dispose`].

use async_trait::async_trait;

use crate::error::Result;
use crate::messaging::payload::Payload;

/// An append-only, size-bounded collection of payloads
pub trait EventBatch: Send {
    /// Append a payload. Returns `false` when the payload would exceed the
    /// batch's size limit; that is a capacity signal, not an error.
    fn try_add(&mut self, payload: &Payload) -> bool;

    /// Number of payloads accepted so far
    fn len(&self) -> usize;

    /// Serialized size of the accepted payloads, as measured by the transport
    fn size_in_bytes(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Producer-side session with a pub/sub transport
#[async_trait]
pub trait BatchTransport: Send + 'static {
    type Batch: EventBatch;

    /// Create a fresh, empty batch
    async fn create_batch(&mut self) -> Result<Self::Batch>;

    /// Send a batch. The batch is consumed: a batch is never reused after a
    /// send attempt, whether it succeeded or not.
    async fn send(&mut self, batch: Self::Batch) -> Result<()>;

    /// Release the session (connections, links, buffers)
    async fn dispose(&mut self) -> Result<()>;
}
