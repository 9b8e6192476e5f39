//! Shared helpers for integration tests

#![allow(dead_code)]

pub mod strategies;

use async_trait::async_trait;
use eventpump::consumer::ItemHandler;
use eventpump::messaging::{InboundEvent, InboundGroup};
use eventpump::producer::{BatchFailure, ProgressSink};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Batch size limit used across the suite: 1 MiB
pub const ONE_MIB: usize = 1_048_576;

/// Records every progress observation for later assertions
#[derive(Debug, Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<(usize, usize)>>,
    failed: Mutex<Vec<usize>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// `(batch_size, cumulative_sent)` pairs in the order they were reported
    pub fn sent(&self) -> Vec<(usize, usize)> {
        self.sent.lock().clone()
    }

    /// Plan positions of failed batches
    pub fn failed(&self) -> Vec<usize> {
        self.failed.lock().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn batch_sent(&self, batch_size: usize, cumulative_sent: usize) {
        self.sent.lock().push((batch_size, cumulative_sent));
    }

    fn batch_failed(&self, failure: &BatchFailure) {
        self.failed.lock().push(failure.batch_index);
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("item {0} failed")]
pub struct ItemFailed(pub i64);

/// Fails for events whose sequence number is in `failing`, counting calls
#[derive(Debug, Default)]
pub struct SelectiveHandler {
    failing: HashSet<i64>,
    calls: Mutex<Vec<i64>>,
}

impl SelectiveHandler {
    pub fn failing(sequence_numbers: impl IntoIterator<Item = i64>) -> Self {
        Self {
            failing: sequence_numbers.into_iter().collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<i64> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ItemHandler for SelectiveHandler {
    type Item = InboundEvent;
    type Error = ItemFailed;

    async fn handle(&self, event: &InboundEvent) -> Result<(), ItemFailed> {
        let sequence = event.metadata.sequence_number;
        self.calls.lock().push(sequence);
        if self.failing.contains(&sequence) {
            Err(ItemFailed(sequence))
        } else {
            Ok(())
        }
    }
}

/// A group of `len` events numbered from zero
pub fn numbered_group(len: i64) -> InboundGroup {
    (0..len)
        .map(|i| InboundEvent::new(format!("Event {i}").as_str()).with_sequence_number(i))
        .collect()
}
