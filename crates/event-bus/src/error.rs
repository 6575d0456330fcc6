//! Event bus error types.

use thiserror::Error;

use crate::SubscriberId;

/// Errors that can occur when managing subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// The topic string does not belong to a known family.
    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    /// The subscriber is not connected (never connected, or already gone).
    #[error("Unknown subscriber: {0}")]
    UnknownSubscriber(SubscriberId),
}

/// Result type for event bus operations.
pub type Result<T> = std::result::Result<T, BusError>;
