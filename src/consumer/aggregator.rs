//! # Partial-Failure Aggregator
//!
//! Processes an inbound group item by item. A failing item never stops its
//! siblings: every failure is captured under the item's original position and
//! the group ends in exactly one of three outcomes.
//!
//! | failures | outcome |
//! |---|---|
//! | 0 | [`GroupOutcome::Success`] |
//! | 1 | [`GroupOutcome::SingleFailure`], carrying the error itself |
//! | 2+ | [`GroupOutcome::CombinedFailure`], carrying the ordered [`FailureSet`] |
//!
//! The single-failure case is not wrapped, so a caller sees the
//! one concrete cause directly. The aggregator does no logging or retrying;
//! the outcome is the caller's signal for redelivery bookkeeping.

use async_trait::async_trait;
use futures::future::join_all;
use std::fmt;
use std::future::Future;
use tokio::sync::Semaphore;

use crate::config::ConsumerConfig;
use crate::messaging::InboundGroup;

/// Per-item failures of one group, ordered by item position
#[derive(Debug, Clone, PartialEq)]
pub struct FailureSet<E> {
    failures: Vec<(usize, E)>,
}

impl<E> Default for FailureSet<E> {
    fn default() -> Self {
        Self {
            failures: Vec::new(),
        }
    }
}

impl<E> FailureSet<E> {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, index: usize, error: E) {
        self.failures.push((index, error));
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// `(position, error)` pairs in item order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &E)> + '_ {
        self.failures.iter().map(|(index, error)| (*index, error))
    }

    /// Positions of the failed items
    pub fn indices(&self) -> Vec<usize> {
        self.failures.iter().map(|(index, _)| *index).collect()
    }

    /// Failure captured for the item at `index`, if it failed
    pub fn get(&self, index: usize) -> Option<&E> {
        self.failures
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, error)| error)
    }

    pub fn into_vec(self) -> Vec<(usize, E)> {
        self.failures
    }
}

impl<E: fmt::Display> fmt::Display for FailureSet<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} items failed: ", self.failures.len())?;
        for (n, (index, error)) in self.failures.iter().enumerate() {
            if n > 0 {
                write!(f, "; ")?;
            }
            write!(f, "[{index}] {error}")?;
        }
        Ok(())
    }
}

/// Terminal outcome of one group's processing pass
#[derive(Debug, Clone, PartialEq)]
pub enum GroupOutcome<E> {
    Success,
    SingleFailure { index: usize, error: E },
    CombinedFailure(FailureSet<E>),
}

impl<E> GroupOutcome<E> {
    /// Collapse a failure set into the outcome it stands for
    pub fn from_failures(failures: FailureSet<E>) -> Self {
        match failures.len() {
            0 => Self::Success,
            1 => {
                let mut failures = failures.into_vec();
                match failures.pop() {
                    Some((index, error)) => Self::SingleFailure { index, error },
                    None => Self::Success,
                }
            }
            _ => Self::CombinedFailure(failures),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn failure_count(&self) -> usize {
        match self {
            Self::Success => 0,
            Self::SingleFailure { .. } => 1,
            Self::CombinedFailure(failures) => failures.len(),
        }
    }

    /// Positions of every failed item
    pub fn failed_indices(&self) -> Vec<usize> {
        match self {
            Self::Success => Vec::new(),
            Self::SingleFailure { index, .. } => vec![*index],
            Self::CombinedFailure(failures) => failures.indices(),
        }
    }

    /// Convert into a `Result`, surfacing a lone failure as itself
    pub fn into_result(self) -> Result<(), GroupError<E>>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Self::Success => Ok(()),
            Self::SingleFailure { error, .. } => Err(GroupError::Single(error)),
            Self::CombinedFailure(failures) => Err(GroupError::Combined(failures)),
        }
    }
}

/// Error form of a failed [`GroupOutcome`]
#[derive(Debug, thiserror::Error)]
pub enum GroupError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Single(E),

    #[error("{0}")]
    Combined(FailureSet<E>),
}

/// Run `handler` on every item in order, capturing failures by position
pub async fn process_group<I, E, F, Fut>(
    items: impl IntoIterator<Item = I>,
    mut handler: F,
) -> GroupOutcome<E>
where
    F: FnMut(I) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    let mut failures = FailureSet::new();

    for (index, item) in items.into_iter().enumerate() {
        if let Err(error) = handler(item).await {
            failures.push(index, error);
        }
    }

    GroupOutcome::from_failures(failures)
}

/// Like [`process_group`], with up to `max_in_flight` handlers running at
/// once. Failures are still keyed and ordered by original position, whatever
/// the completion order.
pub async fn process_group_concurrent<I, E, F, Fut>(
    items: impl IntoIterator<Item = I>,
    mut handler: F,
    max_in_flight: usize,
) -> GroupOutcome<E>
where
    F: FnMut(I) -> Fut,
    Fut: Future<Output = Result<(), E>>,
{
    // Permits bound the number of handlers running at once.
    let semaphore = Semaphore::new(max_in_flight.max(1));
    let pending: Vec<_> = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let work = handler(item);
            let semaphore = &semaphore;
            async move {
                let _permit = semaphore.acquire().await.ok();
                (index, work.await)
            }
        })
        .collect();

    // join_all yields results in input order, whatever the completion order.
    let results = join_all(pending).await;

    let mut failures = FailureSet::new();
    for (index, result) in results {
        if let Err(error) = result {
            failures.push(index, error);
        }
    }

    GroupOutcome::from_failures(failures)
}

/// Application-supplied handling for one inbound item
#[async_trait]
pub trait ItemHandler: Send + Sync {
    type Item: Sync;
    type Error: Send;

    async fn handle(&self, item: &Self::Item) -> Result<(), Self::Error>;
}

/// Runs an [`ItemHandler`] over inbound groups
#[derive(Debug, Clone, Copy)]
pub struct GroupProcessor {
    max_in_flight: usize,
}

impl Default for GroupProcessor {
    fn default() -> Self {
        Self::sequential()
    }
}

impl GroupProcessor {
    /// One item at a time, in group order
    pub fn sequential() -> Self {
        Self { max_in_flight: 1 }
    }

    pub fn concurrent(max_in_flight: usize) -> Self {
        Self {
            max_in_flight: max_in_flight.max(1),
        }
    }

    pub fn from_config(config: &ConsumerConfig) -> Self {
        Self::concurrent(config.max_in_flight)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    pub async fn process<H: ItemHandler>(
        &self,
        group: &InboundGroup<H::Item>,
        handler: &H,
    ) -> GroupOutcome<H::Error> {
        if self.max_in_flight == 1 {
            process_group(group.iter(), |item| handler.handle(item)).await
        } else {
            process_group_concurrent(group.iter(), |item| handler.handle(item), self.max_in_flight)
                .await
        }
    }
}
