//! Scoped ownership of a transport session.
//!
//! A [`TransportSession`] owns the producer client for the duration of one
//! send session and guarantees exactly one release:
//!
//! - [`TransportSession::close`] disposes it on the normal path
//! - dropping an unclosed session (a panic, or the dispatch future being
//!   dropped mid-flight) schedules disposal on the current Tokio runtime

use tracing::{debug, warn};

use crate::error::{EventPumpError, Result};
use crate::messaging::BatchTransport;

#[derive(Debug)]
pub struct TransportSession<T: BatchTransport> {
    transport: Option<T>,
}

impl<T: BatchTransport> TransportSession<T> {
    /// Take ownership of an acquired transport
    pub fn open(transport: T) -> Self {
        debug!("🔌 Transport session opened");
        Self {
            transport: Some(transport),
        }
    }

    pub fn transport_mut(&mut self) -> Result<&mut T> {
        self.transport
            .as_mut()
            .ok_or_else(|| EventPumpError::transport("session", "transport session already closed"))
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Dispose the transport and end the session
    pub async fn close(mut self) -> Result<()> {
        match self.transport.take() {
            Some(mut transport) => {
                let result = transport.dispose().await;
                debug!(success = result.is_ok(), "🔌 Transport session closed");
                result
            }
            None => Ok(()),
        }
    }
}

impl<T: BatchTransport> Drop for TransportSession<T> {
    fn drop(&mut self) {
        let Some(mut transport) = self.transport.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!("Transport session dropped without close; disposing in background");
                handle.spawn(async move {
                    if let Err(e) = transport.dispose().await {
                        warn!(error = %e, "Background transport disposal failed");
                    }
                });
            }
            Err(_) => {
                warn!("Transport session dropped outside a Tokio runtime; it was not disposed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::InMemoryTransport;
    use std::time::Duration;

    #[tokio::test]
    async fn test_close_disposes_once() {
        let transport = InMemoryTransport::new(1_000);
        let handle = transport.handle();

        let mut session = TransportSession::open(transport);
        assert!(session.is_open());
        session.transport_mut().unwrap();
        session.close().await.unwrap();

        assert_eq!(handle.dispose_calls(), 1);
    }

    #[tokio::test]
    async fn test_close_surfaces_dispose_failure() {
        let transport = InMemoryTransport::new(1_000).with_failing_dispose();
        let handle = transport.handle();

        let result = TransportSession::open(transport).close().await;

        assert!(result.is_err());
        assert_eq!(handle.dispose_calls(), 1);
    }

    #[tokio::test]
    async fn test_drop_without_close_disposes_in_background() {
        let transport = InMemoryTransport::new(1_000);
        let handle = transport.handle();

        drop(TransportSession::open(transport));

        for _ in 0..50 {
            if handle.is_disposed() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(handle.dispose_calls(), 1);
    }
}
