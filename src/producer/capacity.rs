//! # Capacity Probe
//!
//! Discovers how many copies of a representative payload fit in one physical
//! batch. The transport never discloses its size limit directly; the probe
//! fills a throwaway batch until the first `try_add` rejection and counts.
//!
//! The probe batch is never sent, and no network send happens during a probe.

use tracing::{debug, info};

use crate::error::{EventPumpError, Result};
use crate::messaging::{BatchTransport, EventBatch, Payload};

/// Upper bound on probe iterations for transports that never reject
pub const DEFAULT_PROBE_CEILING: usize = 1_000_000;

/// Discover the batch capacity for `sample` with the default ceiling.
///
/// Returns [`EventPumpError::PayloadTooLarge`] when not even one copy of the
/// sample fits; a zero capacity is never returned.
pub async fn discover_capacity<T: BatchTransport>(
    transport: &mut T,
    sample: &Payload,
) -> Result<usize> {
    CapacityProbe::default().discover(transport, sample).await
}

/// Configurable capacity probe
#[derive(Debug, Clone, Copy)]
pub struct CapacityProbe {
    ceiling: usize,
}

impl Default for CapacityProbe {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_PROBE_CEILING,
        }
    }
}

impl CapacityProbe {
    /// Stop probing once `ceiling` payloads were accepted and report the ceiling
    pub fn with_ceiling(ceiling: usize) -> Self {
        Self {
            ceiling: ceiling.max(1),
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub async fn discover<T: BatchTransport>(
        &self,
        transport: &mut T,
        sample: &Payload,
    ) -> Result<usize> {
        let mut probe_batch = transport.create_batch().await?;
        let mut capacity = 0usize;

        while capacity < self.ceiling && probe_batch.try_add(sample) {
            capacity += 1;
        }

        if capacity == 0 {
            return Err(EventPumpError::payload_too_large(sample.len()));
        }

        if capacity == self.ceiling {
            debug!(
                ceiling = self.ceiling,
                "Capacity probe reached its ceiling before the transport rejected a payload"
            );
        }

        info!(
            payload_bytes = sample.len(),
            capacity = capacity,
            batch_bytes = probe_batch.size_in_bytes(),
            "📏 Discovered batch capacity"
        );

        // The probe batch is dropped here, unsent.
        Ok(capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::InMemoryTransport;

    #[tokio::test]
    async fn test_capacity_for_small_payload() {
        let mut transport = InMemoryTransport::new(1_048_576);
        let handle = transport.handle();

        let capacity = discover_capacity(&mut transport, &Payload::sample(1000))
            .await
            .unwrap();

        assert_eq!(capacity, 1048);
        assert_eq!(handle.batches_created(), 1);
        assert_eq!(handle.send_attempts(), 0, "probe must never send");
    }

    #[tokio::test]
    async fn test_capacity_accounts_for_event_overhead() {
        let mut transport = InMemoryTransport::new(10_000).with_per_event_overhead(24);

        let capacity = discover_capacity(&mut transport, &Payload::sample(976))
            .await
            .unwrap();

        assert_eq!(capacity, 10);
    }

    #[tokio::test]
    async fn test_payload_exactly_at_limit_fits_once() {
        let mut transport = InMemoryTransport::new(512);

        let capacity = discover_capacity(&mut transport, &Payload::sample(512))
            .await
            .unwrap();

        assert_eq!(capacity, 1);
    }

    #[tokio::test]
    async fn test_oversized_payload_is_rejected() {
        let mut transport = InMemoryTransport::new(512);

        let result = discover_capacity(&mut transport, &Payload::sample(513)).await;

        assert!(matches!(
            result,
            Err(EventPumpError::PayloadTooLarge { size_bytes: 513 })
        ));
    }

    #[tokio::test]
    async fn test_ceiling_bounds_unlimited_transport() {
        let mut transport = InMemoryTransport::new(usize::MAX);

        let capacity = CapacityProbe::with_ceiling(250)
            .discover(&mut transport, &Payload::sample(0))
            .await
            .unwrap();

        assert_eq!(capacity, 250);
    }

    #[test]
    fn test_zero_ceiling_is_clamped() {
        assert_eq!(CapacityProbe::with_ceiling(0).ceiling(), 1);
    }
}
