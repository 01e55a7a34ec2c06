// src/subscriber/worker.rs

//! Per-partition drain worker.
//!
//! One tokio task per (subscriber, partition). The task alternates between
//! waiting on the partition's wake handle and draining the partition from
//! the subscriber's cursor until `read_next` reports it is caught up.
//!
//! The wake handle is a `Notify`: an append that lands while the task is
//! draining stores a permit, so the next wait returns immediately and the
//! task makes another pass. A message can therefore never sit unread until
//! some unrelated later append.
//!
//! A worker exits (state `Stopped`) when a pass fails: its cursor was
//! removed, or its observer panicked. The failure is reported to the
//! observer as [`DeliveryEvent::DrainFailed`]. Subscribing to the topic
//! again starts a new worker on the surviving cursor.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;

use super::observer::ObserverPtr;
use crate::{BrokerError, Delivery, DeliveryEvent, Offset, Partition, SubscriberId};

/// Drain state of one (subscriber, partition) worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DrainState {
    /// Waiting for a wake signal.
    Idle = 0,
    /// Signalled, about to drain.
    Woken = 1,
    /// Reading messages.
    Draining = 2,
    /// Worker has exited.
    Stopped = 3,
}

impl DrainState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Woken,
            2 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

/// Handle to a running drain task.
pub(super) struct DrainWorker {
    // ---
    partition: Arc<Partition>,
    state: Arc<AtomicU8>,
    stop_tx: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl DrainWorker {
    /// Spawn a drain task on the current runtime.
    pub(super) fn spawn(
        subscriber: SubscriberId,
        partition: Arc<Partition>,
        waker: Arc<Notify>,
        observer: ObserverPtr,
    ) -> Self {
        // ---
        let (stop_tx, stop_rx) = oneshot::channel();
        let state = Arc::new(AtomicU8::new(DrainState::Woken as u8));

        let drain_loop = DrainLoop {
            subscriber,
            partition: partition.clone(),
            waker,
            observer,
            state: state.clone(),
        };

        let handle = tokio::spawn(drain_loop.run(stop_rx));

        Self {
            partition,
            state,
            stop_tx: Some(stop_tx),
            handle,
        }
    }

    /// Current state; `Stopped` once the task has finished for any reason.
    pub(super) fn state(&self) -> DrainState {
        if self.handle.is_finished() {
            return DrainState::Stopped;
        }
        DrainState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// `true` once the task has left its loop.
    pub(super) fn has_exited(&self) -> bool {
        self.state() == DrainState::Stopped
    }

    /// Ask the task to stop and wait for it.
    ///
    /// The task makes one last drain pass before exiting, so every message
    /// appended before this call is delivered.
    pub(super) async fn stop(mut self) -> Arc<Partition> {
        // ---
        if let Some(tx) = self.stop_tx.take() {
            // Err means the task already exited.
            let _ = tx.send(());
        }

        if let Err(_err) = (&mut self.handle).await {
            log_warn!(
                "drain worker for {}/{} ended abnormally: {_err}",
                self.partition.topic(),
                self.partition.id()
            );
        }

        self.partition
    }
}

struct DrainLoop {
    // ---
    subscriber: SubscriberId,
    partition: Arc<Partition>,
    waker: Arc<Notify>,
    observer: ObserverPtr,
    state: Arc<AtomicU8>,
}

impl DrainLoop {
    async fn run(self, mut stop_rx: oneshot::Receiver<()>) {
        // ---
        log_debug!(
            "{}: drain worker started for {}/{}",
            self.subscriber,
            self.partition.topic(),
            self.partition.id()
        );

        loop {
            // Start with a pass: the cursor may already be behind, e.g. a
            // late subscriber replaying history.
            if !self.drain_pass() {
                // Cursor gone or observer broken. Subscribing again starts
                // a fresh worker.
                self.set_state(DrainState::Stopped);
                return;
            }
            self.set_state(DrainState::Idle);

            tokio::select! {
                biased;

                // Explicit stop, or every handle to the worker dropped.
                _ = &mut stop_rx => break,

                _ = self.waker.notified() => self.set_state(DrainState::Woken),
            }
        }

        self.drain_pass();
        self.set_state(DrainState::Stopped);

        log_debug!(
            "{}: drain worker stopped for {}/{}",
            self.subscriber,
            self.partition.topic(),
            self.partition.id()
        );
    }

    /// Read until caught up, reporting each message to the observer.
    ///
    /// Returns `false` if the cursor could not be read or the observer
    /// panicked.
    fn drain_pass(&self) -> bool {
        // ---
        loop {
            match self.partition.read_next(&self.subscriber) {
                Ok(Some((offset, message))) => {
                    self.set_state(DrainState::Draining);
                    let event = DeliveryEvent::Delivered(Delivery {
                        subscriber: self.subscriber.clone(),
                        topic: self.partition.topic().clone(),
                        partition: self.partition.id(),
                        offset,
                        content: message.content,
                        delivered_at: SystemTime::now(),
                    });

                    if let Err(payload) = self.notify_observer(event) {
                        self.fail(observer_panic(offset, payload.as_ref()));
                        return false;
                    }
                }
                Ok(None) => return true,
                Err(error) => {
                    self.fail(error);
                    return false;
                }
            }
        }
    }

    /// Report a failed pass.
    fn fail(&self, error: BrokerError) {
        // ---
        log_warn!("{}: drain pass failed: {error}", self.subscriber);

        let event = DeliveryEvent::DrainFailed {
            subscriber: self.subscriber.clone(),
            topic: self.partition.topic().clone(),
            partition: self.partition.id(),
            error,
        };
        if self.notify_observer(event).is_err() {
            log_error!(
                "{}: observer panicked on failure report for {}/{}",
                self.subscriber,
                self.partition.topic(),
                self.partition.id()
            );
        }
    }

    fn notify_observer(
        &self,
        event: DeliveryEvent,
    ) -> std::result::Result<(), Box<dyn std::any::Any + Send>> {
        catch_unwind(AssertUnwindSafe(|| self.observer.on_event(event)))
    }

    fn set_state(&self, state: DrainState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

fn observer_panic(offset: Offset, payload: &(dyn std::any::Any + Send)) -> BrokerError {
    // ---
    let reason = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    BrokerError::ObserverPanicked { offset, reason }
}
