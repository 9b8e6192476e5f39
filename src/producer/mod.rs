//! # Producer Module
//!
//! Adaptive batch publishing: probe the transport for the batch capacity of
//! a payload size, partition the requested event count into a [`BatchPlan`],
//! then dispatch the plan batch by batch.
//!
//! Probe and partitioner are separate, individually testable steps; the
//! [`EventProducer`] composes them with the [`SequentialDispatcher`] over a
//! single transport session.
//!
//! ```rust
//! use eventpump::messaging::{InMemoryTransport, SequencedPayloads};
//! use eventpump::producer::{CancellationSignal, EventProducer};
//!
//! # tokio_test::block_on(async {
//! let transport = InMemoryTransport::new(1_048_576);
//! let report = EventProducer::new()
//!     .send_events(transport, 5_000, &SequencedPayloads::new(1000), &CancellationSignal::new())
//!     .await?;
//!
//! assert_eq!(report.capacity, 1048);
//! assert_eq!(report.outcome.sent_count(), 5_000);
//! # Ok::<(), eventpump::EventPumpError>(())
//! # }).unwrap();
//! ```

pub mod cancellation;
pub mod capacity;
pub mod dispatcher;
pub mod plan;
pub mod session;

pub use cancellation::CancellationSignal;
pub use capacity::{discover_capacity, CapacityProbe, DEFAULT_PROBE_CEILING};
pub use dispatcher::{
    BatchFailure, DispatchOutcome, DispatchStatus, ProgressSink, SequentialDispatcher,
    TracingProgressSink,
};
pub use plan::{plan, BatchPlan, BatchSizes};
pub use session::TransportSession;

use tracing::{info, warn};

use crate::config::ProducerConfig;
use crate::error::Result;
use crate::logging::log_error;
use crate::messaging::{BatchTransport, PayloadSource, SequencedPayloads};

/// Summary of one send session
#[derive(Debug)]
pub struct SendReport {
    /// Batch capacity the plan was built with
    pub capacity: usize,
    /// Whether `capacity` came from a probe rather than configuration
    pub probed: bool,
    pub plan: BatchPlan,
    pub outcome: DispatchOutcome,
}

/// Probe, plan and dispatch over one transport session
#[derive(Debug, Clone, Default)]
pub struct EventProducer {
    dispatcher: SequentialDispatcher,
    probe: CapacityProbe,
    batch_capacity: Option<usize>,
}

impl EventProducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ProducerConfig) -> Self {
        Self {
            dispatcher: SequentialDispatcher::new(),
            probe: CapacityProbe::with_ceiling(config.probe_ceiling),
            batch_capacity: config.max_batch_events,
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: SequentialDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Plan with a fixed capacity instead of probing
    pub fn with_batch_capacity(mut self, capacity: usize) -> Self {
        self.batch_capacity = Some(capacity);
        self
    }

    /// Send `total` events drawn from `payloads`.
    ///
    /// Errors only when the batch capacity cannot be established (for
    /// example [`crate::EventPumpError::PayloadTooLarge`]); per-batch failures
    /// and cancellation are reported in [`SendReport::outcome`]. The transport
    /// is disposed on every path.
    pub async fn send_events<T, P>(
        &self,
        transport: T,
        total: usize,
        payloads: &P,
        cancel: &CancellationSignal,
    ) -> Result<SendReport>
    where
        T: BatchTransport,
        P: PayloadSource + ?Sized,
    {
        let mut session = TransportSession::open(transport);

        let (capacity, probed, plan) = match self.prepare(&mut session, total, payloads).await {
            Ok(prepared) => prepared,
            Err(e) => {
                log_error("producer", "prepare_plan", &e.to_string(), None);
                if let Err(dispose_error) = session.close().await {
                    warn!(error = %dispose_error, "Failed to dispose transport session");
                }
                return Err(e);
            }
        };
        info!(plan = %plan, probed = probed, "🗂️ Batch plan ready");

        let outcome = self
            .dispatcher
            .dispatch_in(&mut session, &plan, payloads, cancel)
            .await;

        if let Err(e) = session.close().await {
            warn!(error = %e, "Failed to dispose transport session after dispatch");
        }

        Ok(SendReport {
            capacity,
            probed,
            plan,
            outcome,
        })
    }

    /// Send `total` test events of `size_bytes` each (`"Event {n}"` bodies)
    pub async fn send_test_events<T: BatchTransport>(
        &self,
        transport: T,
        total: usize,
        size_bytes: usize,
        cancel: &CancellationSignal,
    ) -> Result<SendReport> {
        let payloads = SequencedPayloads::new(size_bytes);
        self.send_events(transport, total, &payloads, cancel).await
    }

    /// Resolve the capacity and build the plan; every error here happens
    /// before the first send.
    async fn prepare<T, P>(
        &self,
        session: &mut TransportSession<T>,
        total: usize,
        payloads: &P,
    ) -> Result<(usize, bool, BatchPlan)>
    where
        T: BatchTransport,
        P: PayloadSource + ?Sized,
    {
        let (capacity, probed) = self.resolve_capacity(session, total, payloads).await?;
        let plan = if total == 0 {
            BatchPlan::empty(capacity)
        } else {
            BatchPlan::new(total, capacity)?
        };
        Ok((capacity, probed, plan))
    }

    async fn resolve_capacity<T, P>(
        &self,
        session: &mut TransportSession<T>,
        total: usize,
        payloads: &P,
    ) -> Result<(usize, bool)>
    where
        T: BatchTransport,
        P: PayloadSource + ?Sized,
    {
        if total == 0 {
            return Ok((self.batch_capacity.unwrap_or(1).max(1), false));
        }

        let sample = payloads.payload_at(0);
        let transport = session.transport_mut()?;

        match self.batch_capacity {
            Some(configured) => {
                // A configured capacity still has to admit at least one payload.
                CapacityProbe::with_ceiling(1)
                    .discover(transport, &sample)
                    .await?;
                Ok((configured, false))
            }
            None => Ok((self.probe.discover(transport, &sample).await?, true)),
        }
    }
}
