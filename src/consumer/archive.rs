//! # Event Archiving
//!
//! Per-item handler that copies each inbound event body into an object store
//! under a fresh key. The object-store client itself is an external
//! collaborator reached through [`ObjectStore`].

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::config::ConsumerConfig;
use crate::consumer::aggregator::ItemHandler;
use crate::error::{EventPumpError, Result};
use crate::messaging::InboundEvent;

/// Length of the random suffix appended to the key prefix
const KEY_SUFFIX_LEN: usize = 10;

/// Minimal object-storage contract
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, body: &[u8]) -> Result<()>;
}

#[derive(Debug, Default)]
struct StoreState {
    objects: BTreeMap<String, Vec<u8>>,
    put_calls: usize,
    failing_calls: HashSet<usize>,
}

/// Object store kept in memory, with optional failure injection
#[derive(Debug, Default, Clone)]
pub struct InMemoryObjectStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the given zero-based `put` calls fail
    pub fn with_failing_puts(self, calls: impl IntoIterator<Item = usize>) -> Self {
        self.state.lock().failing_calls.extend(calls);
        self
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.state.lock().objects.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.state.lock().objects.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.lock().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn put_calls(&self) -> usize {
        self.state.lock().put_calls
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, key: &str, body: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        let call = state.put_calls;
        state.put_calls += 1;

        if state.failing_calls.contains(&call) {
            return Err(EventPumpError::storage(key, "upload rejected"));
        }

        state.objects.insert(key.to_string(), body.to_vec());
        Ok(())
    }
}

/// Uploads every inbound event body to an [`ObjectStore`]
#[derive(Clone)]
pub struct ArchiveHandler {
    store: Arc<dyn ObjectStore>,
    key_prefix: String,
}

impl std::fmt::Debug for ArchiveHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveHandler")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

impl ArchiveHandler {
    pub fn new(store: Arc<dyn ObjectStore>, key_prefix: impl Into<String>) -> Self {
        Self {
            store,
            key_prefix: key_prefix.into(),
        }
    }

    pub fn from_config(store: Arc<dyn ObjectStore>, config: &ConsumerConfig) -> Self {
        Self::new(store, config.key_prefix.clone())
    }

    /// A fresh key: the prefix followed by ten hex digits of a random UUID
    pub fn object_key(&self) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}{}", self.key_prefix, &suffix[..KEY_SUFFIX_LEN])
    }
}

#[async_trait]
impl ItemHandler for ArchiveHandler {
    type Item = InboundEvent;
    type Error = EventPumpError;

    async fn handle(&self, event: &InboundEvent) -> Result<()> {
        let key = self.object_key();
        debug!(
            key = %key,
            sequence_number = event.metadata.sequence_number,
            body_bytes = event.body.len(),
            "Archiving inbound event"
        );

        match self.store.put(&key, event.body.as_bytes()).await {
            Ok(()) => {
                info!(key = %key, "Event message uploaded successfully");
                Ok(())
            }
            Err(e) => {
                error!(key = %key, error = %e, "Failed to upload event message");
                Err(match e {
                    EventPumpError::Storage { .. } => e,
                    other => EventPumpError::storage(key, other.to_string()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_format() {
        let handler = ArchiveHandler::new(Arc::new(InMemoryObjectStore::new()), "SampleMessage-");
        let key = handler.object_key();

        assert_eq!(key.len(), "SampleMessage-".len() + KEY_SUFFIX_LEN);
        assert!(key.starts_with("SampleMessage-"));
        assert!(key["SampleMessage-".len()..]
            .chars()
            .all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, handler.object_key());
    }

    #[tokio::test]
    async fn test_handle_uploads_body() {
        let store = InMemoryObjectStore::new();
        let handler = ArchiveHandler::new(Arc::new(store.clone()), "archive/");

        handler
            .handle(&InboundEvent::new("Event 12"))
            .await
            .unwrap();

        let keys = store.keys();
        assert_eq!(keys.len(), 1);
        assert!(keys[0].starts_with("archive/"));
        assert_eq!(store.get(&keys[0]).unwrap(), b"Event 12".to_vec());
    }

    #[tokio::test]
    async fn test_handle_surfaces_store_failure() {
        let store = InMemoryObjectStore::new().with_failing_puts([0]);
        let handler = ArchiveHandler::new(Arc::new(store.clone()), "archive/");

        let result = handler.handle(&InboundEvent::new("Event 1")).await;

        assert!(matches!(result, Err(EventPumpError::Storage { .. })));
        assert!(store.is_empty());
        assert_eq!(store.put_calls(), 1);
    }
}
