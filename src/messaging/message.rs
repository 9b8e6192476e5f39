//! # Inbound Message Structures
//!
//! Events delivered to the consumer side by the messaging trigger. A trigger
//! hands over an ordered, fixed-size [`InboundGroup`] which is processed once,
//! as a unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::messaging::payload::Payload;

/// Broker metadata attached to an inbound event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEventMetadata {
    /// Position of the event within its partition
    pub sequence_number: i64,
    /// When the broker accepted the event
    pub enqueued_at: DateTime<Utc>,
    /// Partition key supplied by the producer, if any
    pub partition_key: Option<String>,
    /// Application properties set by the producer
    pub properties: HashMap<String, serde_json::Value>,
}

impl Default for InboundEventMetadata {
    fn default() -> Self {
        Self {
            sequence_number: 0,
            enqueued_at: Utc::now(),
            partition_key: None,
            properties: HashMap::new(),
        }
    }
}

/// One event pulled from a subscription
#[derive(Debug, Clone)]
pub struct InboundEvent {
    pub body: Payload,
    pub metadata: InboundEventMetadata,
}

impl InboundEvent {
    pub fn new(body: impl Into<Payload>) -> Self {
        Self {
            body: body.into(),
            metadata: InboundEventMetadata::default(),
        }
    }

    pub fn with_sequence_number(mut self, sequence_number: i64) -> Self {
        self.metadata.sequence_number = sequence_number;
        self
    }

    pub fn with_partition_key(mut self, partition_key: impl Into<String>) -> Self {
        self.metadata.partition_key = Some(partition_key.into());
        self
    }

    pub fn body_text(&self) -> String {
        self.body.to_text_lossy()
    }
}

/// Ordered group of inbound items delivered by one trigger invocation
#[derive(Debug, Clone)]
pub struct InboundGroup<T = InboundEvent> {
    items: Vec<T>,
}

impl<T> InboundGroup<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

impl<T> From<Vec<T>> for InboundGroup<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T> FromIterator<T> for InboundGroup<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T> IntoIterator for InboundGroup<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_event_builders() {
        let event = InboundEvent::new("Event 7")
            .with_sequence_number(7)
            .with_partition_key("orders");

        assert_eq!(event.body_text(), "Event 7");
        assert_eq!(event.metadata.sequence_number, 7);
        assert_eq!(event.metadata.partition_key.as_deref(), Some("orders"));
    }

    #[test]
    fn test_group_preserves_delivery_order() {
        let group: InboundGroup = (0..3)
            .map(|n| InboundEvent::new(format!("Event {n}").as_str()).with_sequence_number(n))
            .collect();

        assert_eq!(group.len(), 3);
        let sequence: Vec<i64> = group.iter().map(|e| e.metadata.sequence_number).collect();
        assert_eq!(sequence, vec![0, 1, 2]);
    }

    #[test]
    fn test_metadata_serialization() {
        let metadata = InboundEventMetadata {
            sequence_number: 42,
            partition_key: Some("p-1".to_string()),
            ..Default::default()
        };

        let json = serde_json::to_value(&metadata).expect("Should serialize");
        assert_eq!(json["sequence_number"], 42);
        assert_eq!(json["partition_key"], "p-1");
    }
}
