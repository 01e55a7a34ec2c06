// src/domain/message.rs

//! Message and identity types shared by every broker component.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Partition id, unique within its topic. Ids run `0..partition_count`.
pub type PartitionId = u32;

/// Zero-based position of a message within a partition.
pub type Offset = u64;

/// A topic name.
///
/// Cheap to clone and safe to share across threads; used as the key of the
/// broker's topic registry and of per-topic strategy state.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicName(pub Arc<str>);

impl<T> From<T> for TopicName
where
    T: Into<Arc<str>>,
{
    fn from(value: T) -> Self {
        // ---
        TopicName(value.into())
    }
}

impl TopicName {
    /// Borrow the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TopicName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TopicName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a subscriber.
///
/// Partitions key their cursor maps by this value, so two subscribers with
/// the same id share one cursor per partition.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SubscriberId(pub Arc<str>);

impl SubscriberId {
    /// Generate a unique anonymous subscriber id.
    pub fn generate() -> Self {
        Self(Arc::from(uuid::Uuid::new_v4().to_string()))
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<T> From<T> for SubscriberId
where
    T: Into<Arc<str>>,
{
    fn from(value: T) -> Self {
        // ---
        SubscriberId(value.into())
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable message.
///
/// The payload is opaque to the broker. Its position is implicit: the offset
/// at which it was appended to a partition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    // ---
    /// Opaque payload bytes.
    pub content: Bytes,
}

impl Message {
    /// Create a message from anything convertible into `Bytes`.
    pub fn new(content: impl Into<Bytes>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Payload as UTF-8, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }
}

/// Where a published message landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Partition chosen by the publisher's strategy.
    pub partition: PartitionId,
    /// Offset assigned by the partition log.
    pub offset: Offset,
}

/// A message delivered to a subscriber by one of its drain workers.
#[derive(Clone, Debug, Serialize)]
pub struct Delivery {
    // ---
    /// Receiving subscriber.
    pub subscriber: SubscriberId,
    /// Topic the partition belongs to.
    pub topic: TopicName,
    /// Source partition.
    pub partition: PartitionId,
    /// Offset of the message within the partition.
    pub offset: Offset,
    /// Message payload.
    pub content: Bytes,
    /// Wall-clock time at which the drain worker read the message.
    pub delivered_at: SystemTime,
}

impl Delivery {
    /// Payload as UTF-8, if it is valid UTF-8.
    pub fn content_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }

    /// Decode a JSON payload published with
    /// [`Publisher::publish_json`](crate::Publisher::publish_json).
    pub fn decode_json<T: DeserializeOwned>(&self) -> crate::Result<T> {
        Ok(serde_json::from_slice(&self.content)?)
    }
}

/// Event reported through a subscriber's observer.
///
/// Drain workers have no caller to return errors to; failures inside the
/// drain loop are reported here rather than dropped.
#[derive(Debug)]
pub enum DeliveryEvent {
    /// A message was read from a partition.
    Delivered(Delivery),

    /// A drain pass failed: the cursor was removed, or the observer panicked.
    /// The worker exits; subscribing to the topic again restarts it.
    DrainFailed {
        /// Subscriber owning the worker.
        subscriber: SubscriberId,
        /// Topic of the failing partition.
        topic: TopicName,
        /// Failing partition.
        partition: PartitionId,
        /// What went wrong.
        error: crate::BrokerError,
    },
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_subscriber_id_generate_unique() {
        // ---
        let a = SubscriberId::generate();
        let b = SubscriberId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_delivery_decode_json() {
        // ---
        let delivery = Delivery {
            subscriber: "s1".into(),
            topic: "orders".into(),
            partition: 0,
            offset: 3,
            content: Bytes::from_static(br#"{"id":42}"#),
            delivered_at: SystemTime::now(),
        };

        let value: serde_json::Value = delivery.decode_json().unwrap();
        assert_eq!(value["id"], 42);
        assert!(delivery.decode_json::<Vec<u8>>().is_err());
    }
}
