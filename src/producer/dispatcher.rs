//! # Sequential Dispatcher
//!
//! Owns the send loop of a session. For every entry of a [`BatchPlan`], in
//! order, it creates a fresh batch, fills it from a [`PayloadSource`], sends it
//! and records the result. Key properties:
//!
//! - a failed batch is recorded and the loop moves on to the next entry
//! - the running sent-count only includes batches the transport accepted
//! - cancellation is observed after each batch, never mid-batch
//! - the transport session is released on every exit path

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{EventPumpError, Result};
use crate::logging::{log_batch_operation, log_error};
use crate::messaging::{BatchTransport, EventBatch, PayloadSource};
use crate::producer::cancellation::CancellationSignal;
use crate::producer::plan::BatchPlan;
use crate::producer::session::TransportSession;

/// Receives one observation per successfully sent batch
pub trait ProgressSink: Send + Sync {
    /// `batch_size` events were published; `cumulative_sent` so far this session
    fn batch_sent(&self, batch_size: usize, cumulative_sent: usize);

    /// A batch was recorded as failed
    fn batch_failed(&self, _failure: &BatchFailure) {}
}

/// Default sink: one structured log line per published batch
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn batch_sent(&self, batch_size: usize, cumulative_sent: usize) {
        info!(
            batch_size = batch_size,
            cumulative_sent = cumulative_sent,
            "A batch of {} events has been published. Total events so far: {}",
            batch_size,
            cumulative_sent
        );
    }

    fn batch_failed(&self, failure: &BatchFailure) {
        let error = failure.error.to_string();
        log_batch_operation(
            "send",
            failure.batch_index,
            failure.batch_size,
            "failed",
            Some(&error),
        );
        log_error(
            "dispatcher",
            "send_batch",
            &error,
            Some("continuing with the rest of the plan"),
        );
    }
}

/// How a dispatch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchStatus {
    /// Every planned batch was attempted without a cancellation request
    Completed,
    /// Cancellation was observed after a batch; later batches were skipped
    Cancelled,
}

/// A single planned batch that did not reach the transport
#[derive(Debug)]
pub struct BatchFailure {
    /// Zero-based position in the plan
    pub batch_index: usize,
    pub batch_size: usize,
    pub error: EventPumpError,
}

/// Accumulated result of one dispatch
#[derive(Debug)]
pub struct DispatchOutcome {
    planned_count: usize,
    planned_batches: usize,
    sent_count: usize,
    batches_sent: usize,
    failures: Vec<BatchFailure>,
    status: DispatchStatus,
}

impl DispatchOutcome {
    fn new(plan: &BatchPlan) -> Self {
        Self {
            planned_count: plan.total(),
            planned_batches: plan.len(),
            sent_count: 0,
            batches_sent: 0,
            failures: Vec::new(),
            status: DispatchStatus::Completed,
        }
    }

    fn record_success(&mut self, batch_size: usize) {
        self.sent_count += batch_size;
        self.batches_sent += 1;
    }

    fn record_failure(&mut self, failure: BatchFailure) {
        self.failures.push(failure);
    }

    /// Events accepted by the transport
    pub fn sent_count(&self) -> usize {
        self.sent_count
    }

    /// Events the plan called for
    pub fn planned_count(&self) -> usize {
        self.planned_count
    }

    pub fn batches_sent(&self) -> usize {
        self.batches_sent
    }

    /// Batches that were created and either sent or recorded as failed
    pub fn batches_attempted(&self) -> usize {
        self.batches_sent + self.failures.len()
    }

    /// Batches never attempted because the dispatch was cancelled
    pub fn batches_skipped(&self) -> usize {
        self.planned_batches - self.batches_attempted()
    }

    pub fn had_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failures(&self) -> &[BatchFailure] {
        &self.failures
    }

    pub fn status(&self) -> DispatchStatus {
        self.status
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == DispatchStatus::Cancelled
    }

    /// Completed with every planned event accepted
    pub fn is_success(&self) -> bool {
        self.status == DispatchStatus::Completed && !self.had_failures()
    }
}

/// Sends a [`BatchPlan`] batch by batch over one transport session
#[derive(Clone)]
pub struct SequentialDispatcher {
    sink: Arc<dyn ProgressSink>,
}

impl Default for SequentialDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SequentialDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialDispatcher").finish_non_exhaustive()
    }
}

impl SequentialDispatcher {
    /// Dispatcher reporting progress through [`TracingProgressSink`]
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingProgressSink))
    }

    pub fn with_sink(sink: Arc<dyn ProgressSink>) -> Self {
        Self { sink }
    }

    /// Run `plan` over a session acquired from `transport`.
    ///
    /// The transport is disposed before this returns, whatever the outcome. A
    /// disposal failure is logged and does not change the returned outcome.
    pub async fn dispatch<T, P>(
        &self,
        transport: T,
        plan: &BatchPlan,
        payloads: &P,
        cancel: &CancellationSignal,
    ) -> DispatchOutcome
    where
        T: BatchTransport,
        P: PayloadSource + ?Sized,
    {
        let mut session = TransportSession::open(transport);
        let outcome = self.dispatch_in(&mut session, plan, payloads, cancel).await;

        if let Err(e) = session.close().await {
            warn!(error = %e, "Failed to dispose transport session after dispatch");
        }

        outcome
    }

    /// Run `plan` over an already-open session, leaving it open
    #[instrument(skip_all, fields(total = plan.total(), batches = plan.len()))]
    pub async fn dispatch_in<T, P>(
        &self,
        session: &mut TransportSession<T>,
        plan: &BatchPlan,
        payloads: &P,
        cancel: &CancellationSignal,
    ) -> DispatchOutcome
    where
        T: BatchTransport,
        P: PayloadSource + ?Sized,
    {
        let mut outcome = DispatchOutcome::new(plan);
        let mut next_sequence = 0usize;

        for (batch_index, batch_size) in plan.iter().enumerate() {
            match Self::send_batch(session, batch_index, batch_size, next_sequence, payloads)
                .await
            {
                Ok(()) => {
                    outcome.record_success(batch_size);
                    self.sink.batch_sent(batch_size, outcome.sent_count);
                }
                Err(error) => {
                    let failure = BatchFailure {
                        batch_index,
                        batch_size,
                        error,
                    };
                    self.sink.batch_failed(&failure);
                    outcome.record_failure(failure);
                }
            }
            next_sequence += batch_size;

            if cancel.is_cancelled() {
                warn!(
                    sent_count = outcome.sent_count,
                    batches_remaining = plan.len() - (batch_index + 1),
                    "🛑 Dispatch cancelled after batch"
                );
                outcome.status = DispatchStatus::Cancelled;
                break;
            }
        }

        info!(
            sent_count = outcome.sent_count,
            planned_count = outcome.planned_count,
            failed_batches = outcome.failures.len(),
            status = ?outcome.status,
            "📤 Dispatch finished"
        );
        outcome
    }

    async fn send_batch<T, P>(
        session: &mut TransportSession<T>,
        batch_index: usize,
        batch_size: usize,
        first_sequence: usize,
        payloads: &P,
    ) -> Result<()>
    where
        T: BatchTransport,
        P: PayloadSource + ?Sized,
    {
        let transport = session.transport_mut()?;
        let mut batch = transport.create_batch().await.map_err(|e| {
            EventPumpError::batch_send(batch_index, batch_size, format!("create batch: {e}"))
        })?;

        for offset in 0..batch_size {
            let payload = payloads.payload_at(first_sequence + offset);
            if !batch.try_add(&payload) {
                // Dropped unsent; the plan never ships a partial batch.
                return Err(EventPumpError::batch_overflow(
                    batch_index,
                    batch_size,
                    batch.len(),
                ));
            }
        }

        debug!(
            batch_index = batch_index,
            events = batch.len(),
            bytes = batch.size_in_bytes(),
            "Sending batch"
        );

        transport
            .send(batch)
            .await
            .map_err(|e| EventPumpError::batch_send(batch_index, batch_size, e.to_string()))
    }
}
