//! # Event Payloads
//!
//! Immutable, fixed-length event bodies shared by the capacity probe and the
//! dispatcher. Cloning a [`Payload`] is a reference-count bump, so one sample
//! can be appended to thousands of batches without copying.

use std::fmt;
use std::sync::Arc;

/// Immutable byte sequence representing one event body
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Payload {
    bytes: Arc<[u8]>,
}

impl Payload {
    /// Wrap an existing body
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Arc::from(bytes.into()),
        }
    }

    /// Build a representative sample of `size_bytes` bytes.
    ///
    /// Only the length matters to a size-limited transport; the content is a
    /// repeating printable pattern so captured batches stay readable.
    pub fn sample(size_bytes: usize) -> Self {
        let bytes: Vec<u8> = (b'a'..=b'z').cycle().take(size_bytes).collect();
        Self::new(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Body as text, replacing invalid UTF-8 sequences
    pub fn to_text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payload")
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Self::new(value)
    }
}

/// Supplies the payload for each event position of a send session.
///
/// Implementations must return payloads of a constant length: the batch plan
/// was computed for that size and stays valid only while it holds.
pub trait PayloadSource: Send + Sync {
    /// Payload for the event at zero-based position `sequence` within the session
    fn payload_at(&self, sequence: usize) -> Payload;

    /// Length in bytes of every payload this source yields
    fn payload_len(&self) -> usize;
}

/// The common case: the same sample repeated for every event
impl PayloadSource for Payload {
    fn payload_at(&self, _sequence: usize) -> Payload {
        self.clone()
    }

    fn payload_len(&self) -> usize {
        self.len()
    }
}

/// `"Event {n}"` bodies padded (or truncated) to a fixed length
#[derive(Debug, Clone)]
pub struct SequencedPayloads {
    size_bytes: usize,
}

impl SequencedPayloads {
    pub fn new(size_bytes: usize) -> Self {
        Self { size_bytes }
    }

    /// A sample with the same length as every generated payload, for probing
    pub fn sample(&self) -> Payload {
        self.payload_at(0)
    }
}

impl PayloadSource for SequencedPayloads {
    fn payload_at(&self, sequence: usize) -> Payload {
        let mut body = format!("Event {sequence}").into_bytes();
        body.resize(self.size_bytes, b' ');
        Payload::new(body)
    }

    fn payload_len(&self) -> usize {
        self.size_bytes
    }
}
