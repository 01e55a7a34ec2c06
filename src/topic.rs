//! Topics.
//!
//! A topic is a name plus a fixed, ordered list of partitions. The partition
//! count is chosen at construction and never changes; partition ids are
//! `0..count` and equal to their index in the list.

use std::sync::Arc;

use crate::{BrokerError, Partition, PartitionId, Result, TopicName};

/// A named collection of partitions.
#[derive(Debug)]
pub struct Topic {
    // ---
    name: TopicName,
    partitions: Vec<Arc<Partition>>,
}

impl Topic {
    /// Create a topic with `partition_count` empty partitions.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::InvalidConfiguration`] if `partition_count` is
    /// zero.
    pub fn new(name: impl Into<TopicName>, partition_count: u32) -> Result<Self> {
        // ---
        let name = name.into();

        if partition_count < 1 {
            return Err(BrokerError::InvalidConfiguration(format!(
                "topic {name}: partition count must be >= 1, got {partition_count}"
            )));
        }

        let partitions = (0..partition_count)
            .map(|id| Arc::new(Partition::new(name.clone(), id)))
            .collect();

        Ok(Self { name, partitions })
    }

    /// Topic name.
    pub fn name(&self) -> &TopicName {
        &self.name
    }

    /// All partitions, ordered by id.
    pub fn partitions(&self) -> &[Arc<Partition>] {
        &self.partitions
    }

    /// Number of partitions.
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Look up a partition by id.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::UnknownPartition`] if `id` is out of range.
    pub fn partition(&self, id: PartitionId) -> Result<&Arc<Partition>> {
        self.partitions
            .get(id as usize)
            .ok_or_else(|| BrokerError::UnknownPartition {
                topic: self.name.to_string(),
                partition: id,
            })
    }

    /// Total number of messages across all partitions.
    pub fn len(&self) -> usize {
        self.partitions.iter().map(|p| p.len()).sum()
    }

    /// `true` if no partition holds a message.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_partition_ids_are_dense() {
        // ---
        let topic = Topic::new("orders", 3).unwrap();
        assert_eq!(topic.partition_count(), 3);

        let ids: Vec<PartitionId> = topic.partitions().iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec![0, 1, 2]);

        for p in topic.partitions() {
            assert_eq!(p.topic(), topic.name());
        }
    }

    #[test]
    fn test_zero_partitions_rejected() {
        // ---
        let err = Topic::new("empty", 0).unwrap_err();
        assert!(matches!(err, BrokerError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_unknown_partition() {
        // ---
        let topic = Topic::new("orders", 2).unwrap();
        assert!(topic.partition(1).is_ok());

        let err = topic.partition(2).unwrap_err();
        assert!(matches!(
            err,
            BrokerError::UnknownPartition { partition: 2, .. }
        ));
    }
}
