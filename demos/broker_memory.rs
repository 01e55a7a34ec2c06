//! Two-topic broker simulation.
//!
//! A random publisher and a round-robin publisher write to two topics while
//! two subscribers follow along. Subscribers that join a topic late replay
//! its full history before seeing new messages.
//!
//! Run with: RUST_LOG=info cargo run --example broker_memory

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::panic_in_result_fn
)]

use std::sync::Arc;
use std::time::Duration;

use mom_broker::{
    // ---
    BrokerBuilder,
    LoggingObserver,
    Publisher,
    Result,
    StrategyKind,
    Subscriber,
};
use tracing_subscriber::{fmt as tracing_format, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    tracing_format()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_line_number(true)
        .init();

    let broker = BrokerBuilder::new()
        .topic("Topic1", 3)
        .topic("Topic2", 2)
        .build()?;

    let pub_a = Publisher::with_kind("A", StrategyKind::Random);
    let pub_b = Publisher::with_kind("B", StrategyKind::RoundRobin);

    let sub_1 = Subscriber::new("1", Arc::new(LoggingObserver));
    let sub_2 = Subscriber::new("2", Arc::new(LoggingObserver));

    broker.subscribe(&sub_1, "Topic1").await?;
    broker.subscribe(&sub_2, "Topic1").await?;

    for (publisher, content) in [
        (&pub_a, "Hello from A1"),
        (&pub_b, "Hello from B1"),
        (&pub_a, "Hello from A2"),
        (&pub_b, "Hello from B2"),
    ] {
        let at = broker.publish(publisher, "Topic1", content)?;
        println!(
            "Publisher {} -> Topic1 partition {} offset {}: {content}",
            publisher.name(),
            at.partition,
            at.offset
        );
    }

    tokio::time::sleep(Duration::from_millis(500)).await;

    broker.subscribe(&sub_1, "Topic2").await?;
    broker.publish(&pub_a, "Topic2", "Topic2 msg1 from A")?;
    broker.publish(&pub_b, "Topic2", "Topic2 msg2 from B")?;

    tokio::time::sleep(Duration::from_millis(500)).await;

    // Joins after two messages; replays both, then sees msg3.
    broker.subscribe(&sub_2, "Topic2").await?;
    broker.publish(&pub_a, "Topic2", "Topic2 msg3 from A")?;

    tokio::time::sleep(Duration::from_millis(500)).await;

    for name in broker.topics() {
        let topic = broker.topic(name.as_str())?;
        for partition in topic.partitions() {
            println!(
                "{name}/{}: {} message(s), {} subscriber(s)",
                partition.id(),
                partition.len(),
                partition.subscriber_count()
            );
        }
    }

    // Clean shutdown
    sub_1.stop().await;
    sub_2.stop().await;
    Ok(())
}
