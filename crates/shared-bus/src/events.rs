//! # Bus Messages
//!
//! The raw unit moved by the bus, and the errors a transport can report.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// A message pulled from the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Topic the message was published to.
    pub topic: String,
    /// Opaque payload (JSON for device traffic).
    pub payload: String,
    /// When the bus accepted the message.
    pub timestamp: DateTime<Utc>,
}

impl BusMessage {
    /// Create a message stamped with the current time.
    pub fn new(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Errors from bus operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The bus was shut down; no further messages will arrive.
    #[error("message bus closed")]
    Closed,

    /// `consume` was called for a group that was never registered.
    #[error("unknown consumer group: {0}")]
    UnknownConsumerGroup(String),

    /// Transport-level failure (broker unreachable, auth, ...).
    #[error("bus transport error: {0}")]
    Transport(String),
}

impl BusError {
    /// Whether retrying the same operation later can succeed.
    ///
    /// An unknown group is retryable: it may be registered after the
    /// consumer starts.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::UnknownConsumerGroup(_))
    }
}
