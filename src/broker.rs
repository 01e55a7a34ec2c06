//! Broker facade.
//!
//! Owns the topic registry and resolves topic names for publish, subscribe
//! and unsubscribe. All lookup and configuration errors surface here,
//! synchronously, to the caller that triggered them.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use serde::Serialize;

use crate::sync::{read_ignore_poison, write_ignore_poison};
use crate::{
    // ---
    BrokerConfig,
    BrokerError,
    Location,
    Message,
    Offset,
    PartitionId,
    Publisher,
    Result,
    Subscriber,
    SubscriberId,
    Topic,
    TopicName,
};

/// In-memory partitioned message broker.
///
/// Cloning is cheap; clones share the topic registry. Topics live for as
/// long as any clone of the broker (or any `Arc<Topic>` handed out) does.
///
/// # Example
///
/// ```
/// use mom_broker::{Broker, BrokerConfig, Publisher, StrategyKind, Subscriber};
///
/// # #[tokio::main]
/// # async fn main() -> mom_broker::Result<()> {
/// let broker = Broker::new(BrokerConfig::default())?;
/// broker.create_topic("orders", 2)?;
///
/// let (subscriber, mut inbox) = Subscriber::channel("billing");
/// broker.subscribe(&subscriber, "orders").await?;
///
/// let publisher = Publisher::with_kind("shop", StrategyKind::RoundRobin);
/// let location = broker.publish(&publisher, "orders", "order-1")?;
/// assert_eq!(location.partition, 0);
///
/// let delivery = inbox.recv_delivery().await.unwrap();
/// assert_eq!(delivery.content_str(), Some("order-1"));
/// # subscriber.stop().await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Broker {
    inner: Arc<Inner>,
}

struct Inner {
    // ---
    config: BrokerConfig,
    topics: RwLock<HashMap<TopicName, Arc<Topic>>>,
}

impl Broker {
    /// Create an empty broker.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::InvalidConfiguration`] if `config` fails
    /// validation.
    pub fn new(config: BrokerConfig) -> Result<Self> {
        // ---
        config.validate()?;

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                topics: RwLock::new(HashMap::new()),
            }),
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &BrokerConfig {
        &self.inner.config
    }

    /// Create a topic with a fixed number of partitions.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::InvalidConfiguration`] if `partition_count` is
    /// zero and [`BrokerError::TopicExists`] if the name is taken.
    pub fn create_topic(
        &self,
        name: impl Into<TopicName>,
        partition_count: u32,
    ) -> Result<Arc<Topic>> {
        // ---
        let topic = Arc::new(Topic::new(name, partition_count)?);

        let mut topics = write_ignore_poison(&self.inner.topics);
        if topics.contains_key(topic.name()) {
            return Err(BrokerError::TopicExists(topic.name().to_string()));
        }
        topics.insert(topic.name().clone(), topic.clone());

        log_info!(
            "created topic '{}' with {partition_count} partition(s)",
            topic.name()
        );

        Ok(topic)
    }

    /// Create a topic with the configured default partition count.
    ///
    /// # Errors
    ///
    /// As [`create_topic`](Self::create_topic).
    pub fn create_topic_default(&self, name: impl Into<TopicName>) -> Result<Arc<Topic>> {
        self.create_topic(name, self.inner.config.default_partitions)
    }

    /// Look up a topic by name.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::UnknownTopic`] if no such topic was created.
    pub fn topic(&self, name: &str) -> Result<Arc<Topic>> {
        read_ignore_poison(&self.inner.topics)
            .get(name)
            .cloned()
            .ok_or_else(|| BrokerError::UnknownTopic(name.to_string()))
    }

    /// Names of all topics, sorted.
    pub fn topics(&self) -> Vec<TopicName> {
        // ---
        let mut names: Vec<TopicName> = read_ignore_poison(&self.inner.topics)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Publish `content` to the named topic through `publisher`'s strategy.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::UnknownTopic`] for an unknown topic; otherwise
    /// as [`Publisher::publish`]. A failed publish appends nothing.
    pub fn publish(
        &self,
        publisher: &Publisher,
        topic: &str,
        content: impl Into<Bytes>,
    ) -> Result<Location> {
        let topic = self.topic(topic)?;
        publisher.publish(&topic, content)
    }

    /// Publish a JSON-serialized value to the named topic.
    ///
    /// # Errors
    ///
    /// As [`publish`](Self::publish), plus
    /// [`BrokerError::Serialization`].
    pub fn publish_json<T: Serialize>(
        &self,
        publisher: &Publisher,
        topic: &str,
        value: &T,
    ) -> Result<Location> {
        let topic = self.topic(topic)?;
        publisher.publish_json(&topic, value)
    }

    /// Subscribe to every partition of the named topic.
    ///
    /// New cursors start according to the configured
    /// [`OffsetReset`](crate::OffsetReset). Subscribing again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::UnknownTopic`] for an unknown topic, in which
    /// case the subscriber's existing registrations are untouched.
    pub async fn subscribe(&self, subscriber: &Subscriber, topic: &str) -> Result<()> {
        // ---
        let topic = self.topic(topic)?;
        subscriber
            .subscribe_from(&topic, self.inner.config.offset_reset)
            .await;
        Ok(())
    }

    /// Stop the subscriber's workers on the named topic and remove its
    /// cursors there.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::UnknownTopic`] for an unknown topic.
    pub async fn unsubscribe(&self, subscriber: &Subscriber, topic: &str) -> Result<()> {
        // ---
        let topic = self.topic(topic)?;
        subscriber.unsubscribe(&topic).await;
        Ok(())
    }

    /// Pull the next message for `subscriber` from one partition directly,
    /// bypassing drain workers.
    ///
    /// Shares the cursor used by the subscriber's drain worker, if any.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::UnknownTopic`],
    /// [`BrokerError::UnknownPartition`] or
    /// [`BrokerError::UnknownSubscriber`] for unresolved references.
    pub fn read_next(
        &self,
        topic: &str,
        partition: PartitionId,
        subscriber: &SubscriberId,
    ) -> Result<Option<(Offset, Message)>> {
        let topic = self.topic(topic)?;
        topic.partition(partition)?.read_next(subscriber)
    }
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("config", &self.inner.config)
            .field("topics", &self.topics())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::{OffsetReset, StrategyKind};

    fn broker() -> Broker {
        Broker::new(BrokerConfig::default()).unwrap()
    }

    #[test]
    fn test_create_and_lookup() {
        // ---
        let broker = broker();
        let created = broker.create_topic("orders", 3).unwrap();
        let found = broker.topic("orders").unwrap();
        assert!(Arc::ptr_eq(&created, &found));
        assert_eq!(found.partition_count(), 3);
    }

    #[test]
    fn test_duplicate_topic_rejected() {
        // ---
        let broker = broker();
        broker.create_topic("orders", 1).unwrap();

        let err = broker.create_topic("orders", 2).unwrap_err();
        assert!(matches!(err, BrokerError::TopicExists(_)));
        assert_eq!(broker.topic("orders").unwrap().partition_count(), 1);
    }

    #[test]
    fn test_zero_partitions_not_registered() {
        // ---
        let broker = broker();
        let err = broker.create_topic("empty", 0).unwrap_err();
        assert!(matches!(err, BrokerError::InvalidConfiguration(_)));
        assert!(broker.topics().is_empty());
    }

    #[test]
    fn test_default_partitions() {
        // ---
        let config = BrokerConfig::default().with_default_partitions(4);
        let broker = Broker::new(config).unwrap();
        let topic = broker.create_topic_default("t").unwrap();
        assert_eq!(topic.partition_count(), 4);
    }

    #[test]
    fn test_invalid_config_rejected() {
        // ---
        let config = BrokerConfig::default().with_default_partitions(0);
        assert!(matches!(
            Broker::new(config),
            Err(BrokerError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_publish_unknown_topic() {
        // ---
        let broker = broker();
        let publisher = Publisher::with_kind("p", StrategyKind::RoundRobin);

        let err = broker.publish(&publisher, "missing", "x").unwrap_err();
        assert!(matches!(err, BrokerError::UnknownTopic(name) if name == "missing"));
    }

    #[test]
    fn test_read_next_lookups() {
        // ---
        let broker = broker();
        let topic = broker.create_topic("t", 2).unwrap();
        let id = SubscriberId::from("s");

        assert!(matches!(
            broker.read_next("nope", 0, &id),
            Err(BrokerError::UnknownTopic(_))
        ));
        assert!(matches!(
            broker.read_next("t", 5, &id),
            Err(BrokerError::UnknownPartition { partition: 5, .. })
        ));
        assert!(matches!(
            broker.read_next("t", 0, &id),
            Err(BrokerError::UnknownSubscriber { .. })
        ));

        topic.partition(0).unwrap().register_subscriber(&id, OffsetReset::Earliest);
        assert_eq!(broker.read_next("t", 0, &id).unwrap(), None);
    }

    #[test]
    fn test_topics_sorted() {
        // ---
        let broker = broker();
        broker.create_topic("b", 1).unwrap();
        broker.create_topic("a", 1).unwrap();
        let names: Vec<String> = broker.topics().iter().map(|t| t.to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
