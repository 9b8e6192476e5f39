#![allow(clippy::doc_markdown)] // Allow technical terms in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # EventPump Core
//!
//! Adaptive batch dispatch for event streaming, plus consumer-side
//! partial-failure handling for inbound event groups.
//!
//! ## Overview
//!
//! On the producer side a run is three steps over one transport session:
//!
//! 1. **Capacity probe**: fill a scratch batch with a sample payload until the
//!    transport rejects one, giving the events-per-batch for that size
//! 2. **Batch partitioner**: split the requested count into full batches plus
//!    one remainder batch
//! 3. **Sequential dispatcher**: send the batches in order, isolating
//!    per-batch failures and honouring cancellation between batches
//!
//! On the consumer side every item of a delivered group is processed, and the
//! failures are folded into one group-level result: success, the single error
//! as-is, or a combined error listing every failed item.
//!
//! ## Module Organization
//!
//! - [`messaging`] - payloads, the batch transport contract and inbound events
//! - [`producer`] - probe, partitioner, dispatcher and the [`producer::EventProducer`] facade
//! - [`consumer`] - partial-failure aggregation and the archiving handler
//! - [`config`] - layered configuration
//! - [`error`] - structured error handling
//! - [`logging`] - structured logging setup
//!
//! ## Quick Start
//!
//! ```rust
//! use eventpump::messaging::InMemoryTransport;
//! use eventpump::producer::{CancellationSignal, EventProducer};
//!
//! # tokio_test::block_on(async {
//! eventpump::logging::init_structured_logging();
//!
//! let transport = InMemoryTransport::new(1_048_576);
//! let report = EventProducer::new()
//!     .send_test_events(transport, 2_500, 1000, &CancellationSignal::new())
//!     .await?;
//!
//! assert_eq!(report.plan.sizes(), &[1048, 1048, 404]);
//! # Ok::<(), eventpump::EventPumpError>(())
//! # }).unwrap();
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit, integration and property tests
//! ```

pub mod config;
pub mod consumer;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod producer;

pub use config::{ConfigManager, ConsumerConfig, EventPumpConfig, ProducerConfig};
pub use consumer::{EventArchiver, GroupError, GroupOutcome, GroupProcessor, ItemHandler};
pub use error::{EventPumpError, Result};
pub use messaging::{BatchTransport, EventBatch, InboundEvent, InboundGroup, Payload};
pub use producer::{
    BatchPlan, CancellationSignal, CapacityProbe, DispatchOutcome, EventProducer, SendReport,
    SequentialDispatcher,
};
