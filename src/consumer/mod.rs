//! # Consumer Module
//!
//! Consumer-side processing of inbound event groups. Each group is handled as
//! a unit by the partial-failure aggregator; the [`EventArchiver`] wires that
//! aggregator to the archiving handler and reports the group outcome.

pub mod aggregator;
pub mod archive;

pub use aggregator::{
    process_group, process_group_concurrent, FailureSet, GroupError, GroupOutcome,
    GroupProcessor, ItemHandler,
};
pub use archive::{ArchiveHandler, InMemoryObjectStore, ObjectStore};

use std::sync::Arc;

use crate::config::ConsumerConfig;
use crate::error::EventPumpError;
use crate::logging::log_group_operation;
use crate::messaging::InboundGroup;

/// Trigger entry point: archive every event of an inbound group
#[derive(Debug, Clone)]
pub struct EventArchiver {
    processor: GroupProcessor,
    handler: ArchiveHandler,
}

impl EventArchiver {
    pub fn new(processor: GroupProcessor, handler: ArchiveHandler) -> Self {
        Self { processor, handler }
    }

    pub fn from_config(store: Arc<dyn ObjectStore>, config: &ConsumerConfig) -> Self {
        Self::new(
            GroupProcessor::from_config(config),
            ArchiveHandler::from_config(store, config),
        )
    }

    /// Process one group and log its outcome.
    ///
    /// An `Err` means the group as a whole should be treated as failed by the
    /// messaging runtime; redelivery is the runtime's business.
    pub async fn on_events(&self, group: &InboundGroup) -> Result<(), GroupError<EventPumpError>> {
        let outcome = self.processor.process(group, &self.handler).await;

        let status = if outcome.is_success() { "success" } else { "failed" };
        let details = format!(
            "{} of {} events failed {:?}",
            outcome.failure_count(),
            group.len(),
            outcome.failed_indices()
        );
        log_group_operation("archive", group.len(), outcome.failure_count(), status, Some(&details));

        outcome.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::InboundEvent;

    fn group_of(n: i64) -> InboundGroup {
        (0..n)
            .map(|i| InboundEvent::new(format!("Event {i}").as_str()).with_sequence_number(i))
            .collect()
    }

    #[tokio::test]
    async fn test_archiver_uploads_whole_group() {
        let store = InMemoryObjectStore::new();
        let archiver = EventArchiver::from_config(Arc::new(store.clone()), &ConsumerConfig::default());

        archiver.on_events(&group_of(5)).await.unwrap();

        assert_eq!(store.len(), 5);
        assert!(store.keys().iter().all(|k| k.starts_with("SampleMessage-")));
    }

    #[tokio::test]
    async fn test_archiver_reports_single_failure_directly() {
        let store = InMemoryObjectStore::new().with_failing_puts([2]);
        let archiver = EventArchiver::from_config(Arc::new(store.clone()), &ConsumerConfig::default());

        let err = archiver.on_events(&group_of(5)).await.unwrap_err();

        assert!(matches!(err, GroupError::Single(EventPumpError::Storage { .. })));
        assert_eq!(store.put_calls(), 5);
        assert_eq!(store.len(), 4);
    }
}
