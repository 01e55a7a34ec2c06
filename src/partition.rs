//! Partition log.
//!
//! A partition is an append-only, totally ordered sequence of messages plus
//! one read cursor per registered subscriber. Log and cursor map sit behind
//! a single partition-wide mutex; every critical section is a handful of
//! map/vector operations, so the lock is held only briefly and different
//! partitions never contend.
//!
//! ## Semantics
//!
//! - `append` assigns offset = previous length and wakes every registered
//!   subscriber after the message is readable.
//! - `read_next` returns the message at the caller's cursor and advances
//!   it in the same critical section.
//! - Cursors are independent: reading on behalf of one subscriber never
//!   moves another subscriber's cursor.
//! - Registration is idempotent. An existing cursor keeps its position and
//!   its wake handle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::sync::lock_ignore_poison;
use crate::{
    // ---
    BrokerError,
    Message,
    Offset,
    OffsetReset,
    PartitionId,
    Result,
    SubscriberId,
    TopicName,
};

/// One subscriber's read position and wake handle.
struct Cursor {
    next: Offset,
    waker: Arc<Notify>,
}

#[derive(Default)]
struct PartitionState {
    messages: Vec<Message>,
    cursors: HashMap<SubscriberId, Cursor>,
}

/// Result of [`Partition::register_subscriber`].
#[derive(Debug, Clone)]
pub struct Registration {
    /// Wake handle notified on every append.
    ///
    /// `Notify` keeps a permit when nobody is waiting, so a wake sent while
    /// the owner is busy draining is observed on its next wait.
    pub waker: Arc<Notify>,

    /// `false` if the subscriber was already registered.
    pub created: bool,

    /// Cursor position at the time of the call.
    pub offset: Offset,
}

/// An ordered, append-only shard of a topic.
pub struct Partition {
    // ---
    topic: TopicName,
    id: PartitionId,
    state: Mutex<PartitionState>,
}

impl Partition {
    /// Create an empty partition.
    pub fn new(topic: TopicName, id: PartitionId) -> Self {
        // ---
        Self {
            topic,
            id,
            state: Mutex::new(PartitionState::default()),
        }
    }

    /// Partition id within its topic.
    pub fn id(&self) -> PartitionId {
        self.id
    }

    /// Owning topic.
    pub fn topic(&self) -> &TopicName {
        &self.topic
    }

    /// Append a message and wake every registered subscriber.
    ///
    /// Returns the offset assigned to the message. The wake handles are
    /// signalled after the message is in the log, so a woken subscriber
    /// always finds it.
    pub fn append(&self, message: Message) -> Offset {
        // ---
        let (offset, wakers) = {
            let mut state = lock_ignore_poison(&self.state);
            let offset = state.messages.len() as Offset;
            state.messages.push(message);

            let wakers: Vec<Arc<Notify>> =
                state.cursors.values().map(|c| c.waker.clone()).collect();
            (offset, wakers)
        };

        log_trace!(
            "{}/{}: appended offset {offset}, waking {} subscriber(s)",
            self.topic,
            self.id,
            wakers.len()
        );

        for waker in wakers {
            waker.notify_one();
        }

        offset
    }

    /// Register a subscriber cursor.
    ///
    /// A new cursor starts at 0 under [`OffsetReset::Earliest`] or at the
    /// current length under [`OffsetReset::Latest`]. If the subscriber is
    /// already registered nothing changes and the existing wake handle is
    /// returned.
    pub fn register_subscriber(&self, id: &SubscriberId, reset: OffsetReset) -> Registration {
        // ---
        let mut state = lock_ignore_poison(&self.state);
        let len = state.messages.len() as Offset;

        if let Some(cursor) = state.cursors.get(id) {
            return Registration {
                waker: cursor.waker.clone(),
                created: false,
                offset: cursor.next,
            };
        }

        let next = match reset {
            OffsetReset::Earliest => 0,
            OffsetReset::Latest => len,
        };
        let waker = Arc::new(Notify::new());

        state.cursors.insert(
            id.clone(),
            Cursor {
                next,
                waker: waker.clone(),
            },
        );

        log_debug!("{}/{}: registered {id} at offset {next}", self.topic, self.id);

        Registration {
            waker,
            created: true,
            offset: next,
        }
    }

    /// Remove a subscriber's cursor.
    ///
    /// Returns `true` if a cursor was removed. Other subscribers' cursors
    /// are untouched. The removed cursor's wake handle is signalled once so
    /// a worker still waiting on it observes the removal instead of waiting
    /// forever.
    pub fn unregister_subscriber(&self, id: &SubscriberId) -> bool {
        // ---
        let removed = lock_ignore_poison(&self.state).cursors.remove(id);

        match removed {
            Some(cursor) => {
                log_debug!("{}/{}: unregistered {id}", self.topic, self.id);
                cursor.waker.notify_one();
                true
            }
            None => false,
        }
    }

    /// Read the message at the subscriber's cursor and advance the cursor.
    ///
    /// Returns `Ok(None)` when the subscriber is caught up.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::UnknownSubscriber`] if `id` is not registered.
    pub fn read_next(&self, id: &SubscriberId) -> Result<Option<(Offset, Message)>> {
        // ---
        let mut state = lock_ignore_poison(&self.state);
        let PartitionState { messages, cursors } = &mut *state;

        let cursor = cursors
            .get_mut(id)
            .ok_or_else(|| BrokerError::UnknownSubscriber {
                subscriber: id.to_string(),
                topic: self.topic.to_string(),
                partition: self.id,
            })?;

        let Some(message) = messages.get(cursor.next as usize) else {
            return Ok(None);
        };

        let offset = cursor.next;
        cursor.next += 1;
        Ok(Some((offset, message.clone())))
    }

    /// Current log length (next offset to be assigned).
    pub fn len(&self) -> usize {
        lock_ignore_poison(&self.state).messages.len()
    }

    /// `true` if nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Next-unread offset of a subscriber, if registered.
    pub fn offset_of(&self, id: &SubscriberId) -> Option<Offset> {
        lock_ignore_poison(&self.state).cursors.get(id).map(|c| c.next)
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        lock_ignore_poison(&self.state).cursors.len()
    }

    /// Snapshot of the message log.
    pub fn messages(&self) -> Vec<Message> {
        lock_ignore_poison(&self.state).messages.clone()
    }
}

impl std::fmt::Debug for Partition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock_ignore_poison(&self.state);
        f.debug_struct("Partition")
            .field("topic", &self.topic)
            .field("id", &self.id)
            .field("len", &state.messages.len())
            .field("subscribers", &state.cursors.len())
            .finish()
    }
}
