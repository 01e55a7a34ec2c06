// src/strategy/random.rs

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

use super::{ensure_partitions, PartitionStrategy, StrategyKind};
use crate::sync::lock_ignore_poison;
use crate::{PartitionId, Result, Topic, TopicName};

/// Uniformly random partition selection.
///
/// Each call is independent of history. The random source is owned by the
/// strategy and can be injected, so tests can replay an exact sequence:
///
/// ```
/// use mom_broker::{PartitionStrategy, RandomStrategy, Topic};
///
/// let topic = Topic::new("events", 4).unwrap();
/// let a = RandomStrategy::seeded(7);
/// let b = RandomStrategy::seeded(7);
///
/// for _ in 0..16 {
///     assert_eq!(a.choose(&topic).unwrap(), b.choose(&topic).unwrap());
/// }
/// ```
pub struct RandomStrategy<R = StdRng> {
    // ---
    rng: Mutex<R>,
}

impl RandomStrategy<StdRng> {
    /// Random strategy seeded from OS entropy.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Random strategy with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl Default for RandomStrategy<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore + Send> RandomStrategy<R> {
    /// Random strategy drawing from the given generator.
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    fn select(&self, topic: &TopicName, partition_count: usize) -> Result<PartitionId> {
        // ---
        let count = ensure_partitions(topic, partition_count)?;
        let mut rng = lock_ignore_poison(&self.rng);
        Ok(rng.gen_range(0..count))
    }
}

impl<R: RngCore + Send> PartitionStrategy for RandomStrategy<R> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Random
    }

    fn choose(&self, topic: &Topic) -> Result<PartitionId> {
        self.select(topic.name(), topic.partition_count())
    }
}
