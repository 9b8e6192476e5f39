//! # Batch Partitioner
//!
//! Splits a total event count into full batches of the discovered capacity
//! followed by at most one remainder batch. The plan is a pure function of
//! `(total, capacity)`: no I/O, no randomness, no reordering.
//!
//! Sizes are yielded on demand, so a plan costs the same to build whatever
//! the total.

use serde::Serialize;
use std::fmt;
use std::iter::FusedIterator;

use crate::error::{EventPumpError, Result};

/// Ordered batch sizes covering a send session exactly once.
///
/// Invariants: the sizes sum to `total`, every size is positive, and only the
/// last size may be smaller than `capacity`. Only [`BatchPlan::new`] and
/// [`BatchPlan::empty`] construct one, so `capacity` is never zero. A plan
/// can be serialized for reporting but not deserialized:
///
/// ```compile_fail
/// let plan: eventpump::BatchPlan =
///     serde_json::from_str(r#"{"total":10,"capacity":0}"#).unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchPlan {
    total: usize,
    capacity: usize,
}

impl BatchPlan {
    /// Partition `total` events into batches of `capacity`.
    ///
    /// `capacity` must be at least 1; a zero capacity is a configuration
    /// error because no number of batches could cover a non-empty total.
    pub fn new(total: usize, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(EventPumpError::configuration(
                "batch_plan",
                "batch capacity must be at least 1",
            ));
        }

        Ok(Self { total, capacity })
    }

    /// The empty plan: nothing to send
    pub fn empty(capacity: usize) -> Self {
        Self {
            total: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Batch sizes in send order, collected
    pub fn sizes(&self) -> Vec<usize> {
        self.iter().collect()
    }

    pub fn iter(&self) -> BatchSizes {
        BatchSizes {
            full_remaining: self.full_batches(),
            capacity: self.capacity,
            remainder: self.remainder(),
        }
    }

    /// Number of batches
    pub fn len(&self) -> usize {
        self.full_batches() + usize::from(self.remainder() > 0)
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn full_batches(&self) -> usize {
        self.total / self.capacity
    }

    /// Size of the trailing partial batch, zero when every batch is full
    pub fn remainder(&self) -> usize {
        self.total % self.capacity
    }
}

/// Lazy iterator over the sizes of a [`BatchPlan`]
#[derive(Debug, Clone)]
pub struct BatchSizes {
    full_remaining: usize,
    capacity: usize,
    remainder: usize,
}

impl Iterator for BatchSizes {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.full_remaining > 0 {
            self.full_remaining -= 1;
            Some(self.capacity)
        } else if self.remainder > 0 {
            Some(std::mem::take(&mut self.remainder))
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.full_remaining.checked_add(usize::from(self.remainder > 0));
        (left.unwrap_or(usize::MAX), left)
    }
}

impl FusedIterator for BatchSizes {}

impl<'a> IntoIterator for &'a BatchPlan {
    type Item = usize;
    type IntoIter = BatchSizes;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for BatchPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} events in {} batches (capacity {}, remainder {})",
            self.total,
            self.len(),
            self.capacity,
            self.remainder()
        )
    }
}

/// Shorthand for [`BatchPlan::new`]
pub fn plan(total: usize, capacity: usize) -> Result<BatchPlan> {
    BatchPlan::new(total, capacity)
}
