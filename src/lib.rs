//! In-memory partitioned message broker
//!
//! Topics are split into a fixed number of ordered, append-only partitions.
//! Publishers pick a partition per message through a pluggable strategy
//! (random or round-robin). Subscribers hold an independent cursor on every
//! partition they register with and run one drain worker per partition,
//! woken after each append and draining until caught up.
//!
//! Ordering is guaranteed per partition only: every subscriber sees a
//! partition's messages in append order. Publishing never waits on
//! subscribers.
//!

// Logging macros first so every module below can use them.
#[macro_use]
mod macros;

mod broker;
mod broker_builder;
mod broker_config;
mod domain;
mod error;
mod partition;
mod publisher;
mod strategy;
mod subscriber;
mod sync;
mod topic;

// Re-export main types
pub use broker::Broker;
pub use broker_builder::BrokerBuilder;
pub use broker_config::{BrokerConfig, OffsetReset};

pub use error::{BrokerError, Result};

pub use partition::{Partition, Registration};
pub use publisher::Publisher;
pub use topic::Topic;

pub use strategy::{
    //
    create_strategy,
    PartitionStrategy,
    RandomStrategy,
    RoundRobinStrategy,
    StrategyKind,
    StrategyPtr,
};

pub use subscriber::{
    //
    ChannelObserver,
    DeliveryInbox,
    DeliveryObserver,
    DrainState,
    LoggingObserver,
    ObserverPtr,
    Subscriber,
};

// --- public re-exports
pub use domain::{
    //
    Delivery,
    DeliveryEvent,
    Location,
    Message,
    Offset,
    PartitionId,
    SubscriberId,
    TopicName,
};
