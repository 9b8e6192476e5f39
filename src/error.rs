//! # Error Types
//!
//! Structured error handling for the producer and consumer pipelines using
//! thiserror instead of `Box<dyn Error>` patterns.
//!
//! Cancellation is not an error; a cancelled dispatch is a terminal state
//! reported through [`crate::producer::DispatchStatus`].

use thiserror::Error;

/// Errors raised by the event pump
#[derive(Error, Debug)]
pub enum EventPumpError {
    #[error("Payload too large: a single {size_bytes} byte payload does not fit in an empty batch")]
    PayloadTooLarge { size_bytes: usize },

    #[error("Batch send failed: batch {batch_index} ({batch_size} events): {message}")]
    BatchSend {
        batch_index: usize,
        batch_size: usize,
        message: String,
    },

    #[error("Batch overflow: batch {batch_index} accepted {accepted} of {expected} events")]
    BatchOverflow {
        batch_index: usize,
        expected: usize,
        accepted: usize,
    },

    #[error("Item processing failed: item {index}: {message}")]
    ItemProcessing { index: usize, message: String },

    #[error("Transport error: {operation}: {message}")]
    Transport { operation: String, message: String },

    #[error("Storage error: {key}: {message}")]
    Storage { key: String, message: String },

    #[error("Configuration error: {component}: {message}")]
    Configuration { component: String, message: String },

    #[error("Configuration source error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl EventPumpError {
    /// Create a payload too large error
    pub fn payload_too_large(size_bytes: usize) -> Self {
        Self::PayloadTooLarge { size_bytes }
    }

    /// Create a batch send error
    pub fn batch_send(batch_index: usize, batch_size: usize, message: impl Into<String>) -> Self {
        Self::BatchSend {
            batch_index,
            batch_size,
            message: message.into(),
        }
    }

    /// Create a batch overflow error
    pub fn batch_overflow(batch_index: usize, expected: usize, accepted: usize) -> Self {
        Self::BatchOverflow {
            batch_index,
            expected,
            accepted,
        }
    }

    /// Create an item processing error
    pub fn item_processing(index: usize, message: impl Into<String>) -> Self {
        Self::ItemProcessing {
            index,
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a storage error
    pub fn storage(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Whether this error was recorded for a single batch and left the rest of
    /// the dispatch untouched
    pub fn is_batch_scoped(&self) -> bool {
        matches!(self, Self::BatchSend { .. } | Self::BatchOverflow { .. })
    }
}

pub type Result<T> = std::result::Result<T, EventPumpError>;
