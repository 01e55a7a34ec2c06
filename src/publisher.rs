//! Publishers.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

use crate::{
    // ---
    create_strategy,
    Location,
    Message,
    Result,
    StrategyKind,
    StrategyPtr,
    Topic,
};

/// Named producer bound to one partition selection strategy.
///
/// Publishing asks the strategy for a partition, appends the message and
/// returns where it landed. It never waits on subscribers: wake-ups are fire
/// and forget, so a slow or absent subscriber cannot slow a publisher down.
///
/// Cloning is cheap and clones share the same strategy instance.
///
/// # Example
///
/// ```
/// use mom_broker::{Publisher, StrategyKind, Topic};
///
/// let topic = Topic::new("orders", 2).unwrap();
/// let publisher = Publisher::with_kind("checkout", StrategyKind::RoundRobin);
///
/// let first = publisher.publish(&topic, "a").unwrap();
/// let second = publisher.publish(&topic, "b").unwrap();
/// assert_eq!((first.partition, first.offset), (0, 0));
/// assert_eq!((second.partition, second.offset), (1, 0));
/// ```
#[derive(Clone)]
pub struct Publisher {
    // ---
    name: Arc<str>,
    strategy: StrategyPtr,
}

impl Publisher {
    /// Create a publisher using a shared strategy instance.
    pub fn new(name: impl Into<Arc<str>>, strategy: StrategyPtr) -> Self {
        Self {
            name: name.into(),
            strategy,
        }
    }

    /// Create a publisher with a fresh strategy of the given kind.
    pub fn with_kind(name: impl Into<Arc<str>>, kind: StrategyKind) -> Self {
        Self::new(name, create_strategy(kind))
    }

    /// Publisher name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The strategy this publisher uses.
    pub fn strategy(&self) -> &StrategyPtr {
        &self.strategy
    }

    /// Publish `content` to `topic`.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::InvalidConfiguration`](crate::BrokerError::InvalidConfiguration)
    /// if the topic has no partitions and
    /// [`BrokerError::UnknownPartition`](crate::BrokerError::UnknownPartition)
    /// if the strategy names a partition the topic does not have. In both
    /// cases nothing is appended.
    pub fn publish(&self, topic: &Topic, content: impl Into<Bytes>) -> Result<Location> {
        // ---
        let partition_id = self.strategy.choose(topic)?;
        let partition = topic.partition(partition_id)?;

        let message = Message::new(content);
        let offset = partition.append(message);

        log_info!(
            "publisher {} published to topic '{}' partition {partition_id} offset {offset}",
            self.name,
            topic.name()
        );

        Ok(Location {
            partition: partition_id,
            offset,
        })
    }

    /// Serialize `value` as JSON and publish it.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Serialization`](crate::BrokerError::Serialization)
    /// if `value` cannot be serialized, otherwise as [`publish`](Self::publish).
    pub fn publish_json<T: Serialize>(&self, topic: &Topic, value: &T) -> Result<Location> {
        // ---
        let bytes = serde_json::to_vec(value)?;
        self.publish(topic, Bytes::from(bytes))
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("name", &self.name)
            .field("strategy", &self.strategy.kind())
            .finish()
    }
}
