//! Partition selection strategies.
//!
//! A strategy decides which partition of a topic receives the next published
//! message. Publishers hold a [`StrategyPtr`] and never inspect the concrete
//! type; the set of implementations is closed and enumerated by
//! [`StrategyKind`], constructed through [`create_strategy`] or directly when
//! a test needs to inject a seeded random source.

mod random;
mod round_robin;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{BrokerError, PartitionId, Result, Topic, TopicName};

pub use random::RandomStrategy;
pub use round_robin::RoundRobinStrategy;

/// Available selection algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Uniformly random partition per message.
    Random,

    /// Strict per-topic rotation starting at partition 0.
    RoundRobin,
}

/// Partition selection capability.
///
/// Implementations must be callable concurrently from any number of
/// publishers sharing one instance.
pub trait PartitionStrategy: Send + Sync {
    // ---
    /// Which algorithm this is.
    fn kind(&self) -> StrategyKind;

    /// Choose the partition for the next message published to `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::InvalidConfiguration`] if the topic has no
    /// partitions.
    fn choose(&self, topic: &Topic) -> Result<PartitionId>;
}

/// Shared strategy pointer.
///
/// Cheap to clone; every clone shares the same selection state (e.g. the
/// round-robin counters).
pub type StrategyPtr = Arc<dyn PartitionStrategy>;

/// Create a strategy of the given kind.
///
/// Random strategies created here are seeded from OS entropy. Use
/// [`RandomStrategy::seeded`] for reproducible sequences.
pub fn create_strategy(kind: StrategyKind) -> StrategyPtr {
    // ---
    match kind {
        StrategyKind::Random => Arc::new(RandomStrategy::new()),
        StrategyKind::RoundRobin => Arc::new(RoundRobinStrategy::new()),
    }
}

/// Reject topics that have nothing to choose from.
fn ensure_partitions(topic: &TopicName, partition_count: usize) -> Result<u32> {
    if partition_count == 0 {
        return Err(BrokerError::InvalidConfiguration(format!(
            "topic {topic} has no partitions to choose from"
        )));
    }

    u32::try_from(partition_count).map_err(|_| {
        BrokerError::InvalidConfiguration(format!(
            "topic {topic} has {partition_count} partitions, more than a partition id can address"
        ))
    })
}
