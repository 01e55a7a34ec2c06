//! Broker builder.
//!
//! Provides a fluent builder API for configuring a [`Broker`] and the
//! topics it starts with.

use crate::{Broker, BrokerConfig, OffsetReset, Result, TopicName};

/// Builder for creating broker instances.
///
/// # Examples
///
/// ```
/// use mom_broker::{BrokerBuilder, OffsetReset};
///
/// let broker = BrokerBuilder::new()
///     .offset_reset(OffsetReset::Latest)
///     .default_partitions(3)
///     .topic("orders", 2)
///     .default_topic("audit")
///     .build()
///     .unwrap();
///
/// assert_eq!(broker.topic("orders").unwrap().partition_count(), 2);
/// assert_eq!(broker.topic("audit").unwrap().partition_count(), 3);
/// ```
#[derive(Debug, Default)]
pub struct BrokerBuilder {
    // ---
    config: Option<BrokerConfig>,
    offset_reset: Option<OffsetReset>,
    default_partitions: Option<u32>,

    // Topics to create at build(); `None` count means "use the default".
    topics: Vec<(TopicName, Option<u32>)>,
}

impl BrokerBuilder {
    /// Create a new broker builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    ///
    /// Individual setters called on the builder override its fields.
    pub fn config(mut self, config: BrokerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set where new subscriber cursors start.
    ///
    /// Default: [`OffsetReset::Earliest`].
    pub fn offset_reset(mut self, reset: OffsetReset) -> Self {
        self.offset_reset = Some(reset);
        self
    }

    /// Set the partition count used for topics without an explicit count.
    ///
    /// Default: 1.
    pub fn default_partitions(mut self, count: u32) -> Self {
        self.default_partitions = Some(count);
        self
    }

    /// Create this topic when the broker is built.
    pub fn topic(mut self, name: impl Into<TopicName>, partition_count: u32) -> Self {
        self.topics.push((name.into(), Some(partition_count)));
        self
    }

    /// Create this topic with the default partition count when the broker
    /// is built.
    pub fn default_topic(mut self, name: impl Into<TopicName>) -> Self {
        self.topics.push((name.into(), None));
        self
    }

    /// Build the broker (consumes self).
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::InvalidConfiguration`](crate::BrokerError::InvalidConfiguration)
    /// for a zero partition count anywhere and
    /// [`BrokerError::TopicExists`](crate::BrokerError::TopicExists) if a
    /// topic name was given twice.
    pub fn build(self) -> Result<Broker> {
        // ---
        let mut config = self.config.unwrap_or_default();
        if let Some(reset) = self.offset_reset {
            config.offset_reset = reset;
        }
        if let Some(count) = self.default_partitions {
            config.default_partitions = count;
        }

        let broker = Broker::new(config)?;

        for (name, count) in self.topics {
            match count {
                Some(count) => broker.create_topic(name, count)?,
                None => broker.create_topic_default(name)?,
            };
        }

        Ok(broker)
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::BrokerError;

    #[test]
    fn test_setters_override_config() {
        // ---
        let base = BrokerConfig::default().with_default_partitions(8);
        let broker = BrokerBuilder::new()
            .config(base)
            .offset_reset(OffsetReset::Latest)
            .build()
            .unwrap();

        assert_eq!(broker.config().default_partitions, 8);
        assert_eq!(broker.config().offset_reset, OffsetReset::Latest);
    }

    #[test]
    fn test_duplicate_topic_fails_build() {
        // ---
        let err = BrokerBuilder::new()
            .topic("t", 1)
            .topic("t", 2)
            .build()
            .unwrap_err();
        assert!(matches!(err, BrokerError::TopicExists(_)));
    }

    #[test]
    fn test_zero_partition_topic_fails_build() {
        // ---
        let err = BrokerBuilder::new().topic("t", 0).build().unwrap_err();
        assert!(matches!(err, BrokerError::InvalidConfiguration(_)));
    }
}
