// src/strategy/round_robin.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use super::{ensure_partitions, PartitionStrategy, StrategyKind};
use crate::sync::{read_ignore_poison, write_ignore_poison};
use crate::{PartitionId, Result, Topic, TopicName};

/// Per-topic rotation across partitions.
///
/// Each topic gets its own counter, starting at 0 and owned by this strategy
/// instance. A call returns `counter % partition_count` and increments the
/// counter with a single atomic `fetch_add`, so concurrent publishers sharing
/// the instance each draw a distinct ticket: the chosen partitions form a
/// strict cycle with no skips or repeats, only the assignment of tickets to
/// callers is unspecified.
#[derive(Debug, Default)]
pub struct RoundRobinStrategy {
    // ---
    counters: RwLock<HashMap<TopicName, AtomicU64>>,
}

impl RoundRobinStrategy {
    /// Create a strategy with no counters yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of selections made so far for `topic`.
    pub fn counter(&self, topic: &TopicName) -> u64 {
        read_ignore_poison(&self.counters)
            .get(topic)
            .map_or(0, |c| c.load(Ordering::Acquire))
    }

    /// Take the next ticket for `topic`.
    fn next_ticket(&self, topic: &TopicName) -> u64 {
        // ---
        {
            let counters = read_ignore_poison(&self.counters);
            if let Some(counter) = counters.get(topic) {
                return counter.fetch_add(1, Ordering::AcqRel);
            }
        }

        // First selection for this topic; another caller may have raced us
        // here, in which case entry() finds its counter.
        let mut counters = write_ignore_poison(&self.counters);
        counters
            .entry(topic.clone())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::AcqRel)
    }

    fn select(&self, topic: &TopicName, partition_count: usize) -> Result<PartitionId> {
        // ---
        let count = ensure_partitions(topic, partition_count)?;
        let ticket = self.next_ticket(topic);
        Ok((ticket % u64::from(count)) as PartitionId)
    }
}

impl PartitionStrategy for RoundRobinStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RoundRobin
    }

    fn choose(&self, topic: &Topic) -> Result<PartitionId> {
        self.select(topic.name(), topic.partition_count())
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::BrokerError;
    use std::sync::Arc;

    #[test]
    fn test_cycles_in_ascending_order() {
        // ---
        let topic = Topic::new("t", 3).unwrap();
        let strategy = RoundRobinStrategy::new();

        let seq: Vec<_> = (0..7).map(|_| strategy.choose(&topic).unwrap()).collect();
        assert_eq!(seq, vec![0, 1, 2, 0, 1, 2, 0]);
        assert_eq!(strategy.counter(topic.name()), 7);
    }

    #[test]
    fn test_counters_are_per_topic() {
        // ---
        let a = Topic::new("a", 2).unwrap();
        let b = Topic::new("b", 2).unwrap();
        let strategy = RoundRobinStrategy::new();

        assert_eq!(strategy.choose(&a).unwrap(), 0);
        assert_eq!(strategy.choose(&a).unwrap(), 1);
        assert_eq!(strategy.choose(&b).unwrap(), 0);
        assert_eq!(strategy.choose(&a).unwrap(), 0);

        assert_eq!(strategy.counter(a.name()), 3);
        assert_eq!(strategy.counter(b.name()), 1);
    }

    #[test]
    fn test_instances_do_not_share_state() {
        // ---
        let topic = Topic::new("t", 2).unwrap();
        let first = RoundRobinStrategy::new();
        let second = RoundRobinStrategy::new();

        assert_eq!(first.choose(&topic).unwrap(), 0);
        assert_eq!(second.choose(&topic).unwrap(), 0);
    }

    #[test]
    fn test_fair_under_concurrent_callers() {
        // ---
        const THREADS: usize = 8;
        const PER_THREAD: usize = 1000;
        const PARTITIONS: u32 = 3;

        let topic = Arc::new(Topic::new("t", PARTITIONS).unwrap());
        let strategy = Arc::new(RoundRobinStrategy::new());

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let topic = topic.clone();
                let strategy = strategy.clone();
                std::thread::spawn(move || {
                    let mut hits = [0usize; PARTITIONS as usize];
                    for _ in 0..PER_THREAD {
                        hits[strategy.choose(&topic).unwrap() as usize] += 1;
                    }
                    hits
                })
            })
            .collect();

        let mut totals = [0usize; PARTITIONS as usize];
        for h in handles {
            for (total, hits) in totals.iter_mut().zip(h.join().unwrap()) {
                *total += hits;
            }
        }

        // 8000 tickets over 3 partitions: 2667, 2667, 2666.
        assert_eq!(totals, [2667, 2667, 2666]);
        assert_eq!(strategy.counter(topic.name()), (THREADS * PER_THREAD) as u64);
    }

    #[test]
    fn test_zero_partitions_does_not_advance() {
        // ---
        let strategy = RoundRobinStrategy::new();
        let topic = TopicName::from("none");

        let err = strategy.select(&topic, 0).unwrap_err();
        assert!(matches!(err, BrokerError::InvalidConfiguration(_)));
        assert_eq!(strategy.counter(&topic), 0);
    }
}
