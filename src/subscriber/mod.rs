//! Subscribers.
//!
//! A subscriber registers a cursor on every partition of each topic it
//! subscribes to and runs one drain worker per registered partition. Workers
//! are independent: a slow observer call on one partition never delays the
//! subscriber's other partitions, nor any other subscriber.
//!
//! ## Worker states
//!
//! ```text
//!   Idle ──append──▶ Woken ──▶ Draining ──caught up──▶ Idle
//!                                  ▲   │
//!                                  └───┘ append during the pass
//! ```
//!
//! `stop`/`unsubscribe` moves a worker to `Stopped` after a final drain pass.
//!
//! ## Registration
//!
//! Subscribe and unsubscribe calls for one subscriber are serialized by an
//! async mutex over its worker table. A register racing an unregister of
//! the same subscriber therefore resolves in call order: whichever acquires
//! the table first completes before the other inspects it.

mod observer;
mod worker;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{OffsetReset, Partition, PartitionId, SubscriberId, Topic, TopicName};

pub use observer::{
    //
    ChannelObserver,
    DeliveryInbox,
    DeliveryObserver,
    LoggingObserver,
    ObserverPtr,
};
pub use worker::DrainState;

use worker::DrainWorker;

/// Topic name, partition id and partition instance address.
///
/// Same-named topics from different brokers are distinct subscriptions. The
/// address is stable: the worker keeps its partition alive.
type WorkerKey = (TopicName, PartitionId, usize);

fn worker_key(partition: &Arc<Partition>) -> WorkerKey {
    (
        partition.topic().clone(),
        partition.id(),
        Arc::as_ptr(partition) as usize,
    )
}

/// A named consumer with one independent cursor per registered partition.
///
/// Cloning is cheap; clones share cursors, workers and observer. When the
/// last clone is dropped every worker finishes its current pass and exits;
/// call [`stop`](Self::stop) to also remove the cursors from the partitions.
///
/// # Example
///
/// ```
/// use mom_broker::{Publisher, StrategyKind, Subscriber, Topic};
///
/// # #[tokio::main]
/// # async fn main() {
/// let topic = Topic::new("orders", 1).unwrap();
/// let (subscriber, mut inbox) = Subscriber::channel("billing");
/// subscriber.subscribe(&topic).await;
///
/// Publisher::with_kind("shop", StrategyKind::RoundRobin)
///     .publish(&topic, "order-1")
///     .unwrap();
///
/// let delivery = inbox.recv_delivery().await.unwrap();
/// assert_eq!(delivery.content_str(), Some("order-1"));
/// # subscriber.stop().await;
/// # }
/// ```
#[derive(Clone)]
pub struct Subscriber {
    inner: Arc<Inner>,
}

struct Inner {
    // ---
    id: SubscriberId,
    observer: ObserverPtr,
    workers: Mutex<HashMap<WorkerKey, DrainWorker>>,
}

impl Subscriber {
    /// Create a subscriber reporting to `observer`.
    pub fn new(id: impl Into<SubscriberId>, observer: ObserverPtr) -> Self {
        // ---
        Self {
            inner: Arc::new(Inner {
                id: id.into(),
                observer,
                workers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Create a subscriber whose deliveries arrive on the returned inbox.
    pub fn channel(id: impl Into<SubscriberId>) -> (Self, DeliveryInbox) {
        let (observer, inbox) = ChannelObserver::channel();
        (Self::new(id, observer), inbox)
    }

    /// Subscriber identity.
    pub fn id(&self) -> &SubscriberId {
        &self.inner.id
    }

    /// Subscribe to every partition of `topic`, replaying existing messages.
    ///
    /// Equivalent to [`subscribe_from`](Self::subscribe_from) with
    /// [`OffsetReset::Earliest`].
    pub async fn subscribe(&self, topic: &Topic) -> usize {
        self.subscribe_from(topic, OffsetReset::Earliest).await
    }

    /// Subscribe to every partition of `topic`.
    ///
    /// Idempotent: partitions already subscribed keep their cursor and their
    /// worker, so nothing is delivered twice. `reset` applies only to cursors
    /// created by this call. A worker that has exited (its cursor was
    /// removed, or its observer panicked) is restarted, on the surviving
    /// cursor if there is one.
    ///
    /// Returns the number of workers started.
    pub async fn subscribe_from(&self, topic: &Topic, reset: OffsetReset) -> usize {
        // ---
        let mut workers = self.inner.workers.lock().await;
        let mut started = 0;

        for partition in topic.partitions() {
            let key = worker_key(partition);

            if let Some(existing) = workers.get(&key) {
                if !existing.has_exited() {
                    continue;
                }
                log_warn!(
                    "{}: restarting exited drain worker for {}/{}",
                    self.inner.id,
                    topic.name(),
                    partition.id()
                );
            }

            let registration = partition.register_subscriber(&self.inner.id, reset);
            let worker = DrainWorker::spawn(
                self.inner.id.clone(),
                partition.clone(),
                registration.waker,
                self.inner.observer.clone(),
            );

            // Replaces (and drops) an exited worker, if any.
            workers.insert(key, worker);
            started += 1;
        }

        log_info!(
            "subscriber {} subscribed to topic '{}' ({started} new worker(s))",
            self.inner.id,
            topic.name()
        );

        started
    }

    /// Stop the workers for `topic` and remove this subscriber's cursors
    /// from its partitions.
    ///
    /// Each worker makes a final drain pass first, so messages appended
    /// before this call are still delivered. Other subscribers' cursors are
    /// untouched. Unsubscribing from a topic never subscribed is a no-op.
    pub async fn unsubscribe(&self, topic: &Topic) {
        // ---
        let mut workers = self.inner.workers.lock().await;

        for partition in topic.partitions() {
            let key = worker_key(partition);
            if let Some(worker) = workers.remove(&key) {
                worker.stop().await;
            }
            partition.unregister_subscriber(&self.inner.id);
        }

        log_info!(
            "subscriber {} unsubscribed from topic '{}'",
            self.inner.id,
            topic.name()
        );
    }

    /// Stop every worker and remove every cursor this subscriber holds.
    pub async fn stop(&self) {
        // ---
        let mut workers = self.inner.workers.lock().await;

        for (_, worker) in workers.drain() {
            let partition = worker.stop().await;
            partition.unregister_subscriber(&self.inner.id);
        }

        log_debug!("{}: stopped", self.inner.id);
    }

    /// Topics with at least one running worker, sorted by name.
    pub async fn topics(&self) -> Vec<TopicName> {
        // ---
        let workers = self.inner.workers.lock().await;
        let mut topics: Vec<TopicName> = workers.keys().map(|(t, _, _)| t.clone()).collect();
        topics.sort();
        topics.dedup();
        topics
    }

    /// Current drain state of the worker for `topic`/`partition`.
    ///
    /// With several same-named topics subscribed, any one of them may be
    /// reported.
    pub async fn drain_state(
        &self,
        topic: &TopicName,
        partition: PartitionId,
    ) -> Option<DrainState> {
        // ---
        let workers = self.inner.workers.lock().await;
        workers
            .iter()
            .find(|((t, p, _), _)| t == topic && *p == partition)
            .map(|(_, w)| w.state())
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.inner.id)
            .finish_non_exhaustive()
    }
}
