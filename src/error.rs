use thiserror::Error;

use crate::PartitionId;

/// Errors that can occur during broker operations
#[derive(Error, Debug)]
pub enum BrokerError {
    /// Topic or strategy configured with an unusable partition count
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Operation referenced a topic that was never created
    #[error("unknown topic: {0}")]
    UnknownTopic(String),

    /// Operation referenced a partition id outside the topic's range
    #[error("unknown partition {partition} on topic {topic}")]
    UnknownPartition {
        /// Topic name.
        topic: String,
        /// Requested partition id.
        partition: PartitionId,
    },

    /// Cursor lookup for a subscriber that is not registered on the partition
    #[error("subscriber {subscriber} is not registered on {topic}/{partition}")]
    UnknownSubscriber {
        /// Subscriber identity.
        subscriber: String,
        /// Topic name.
        topic: String,
        /// Partition id.
        partition: PartitionId,
    },

    /// A delivery observer panicked while handling a message
    #[error("observer panicked at offset {offset}: {reason}")]
    ObserverPanicked {
        /// Offset of the message being handled; the cursor is already past it.
        offset: crate::Offset,
        /// Panic payload, if it was a string.
        reason: String,
    },

    /// A topic with the same name already exists
    #[error("topic already exists: {0}")]
    TopicExists(String),

    /// JSON serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for broker operations
pub type Result<T> = std::result::Result<T, BrokerError>;
