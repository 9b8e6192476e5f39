//! # Messaging Module
//!
//! Transport-facing data model: payloads, the batch transport contract, the
//! in-memory transport, and inbound event structures for the consumer side.

pub mod in_memory;
pub mod message;
pub mod payload;
pub mod transport;

pub use in_memory::{InMemoryBatch, InMemoryTransport, InMemoryTransportHandle, SentBatch};
pub use message::{InboundEvent, InboundEventMetadata, InboundGroup};
pub use payload::{Payload, PayloadSource, SequencedPayloads};
pub use transport::{BatchTransport, EventBatch};
