// src/subscriber/observer.rs

//! Delivery observers.
//!
//! Drain workers report every delivered message, and every drain failure,
//! to the subscriber's observer. Test harnesses assert on deliveries through
//! a [`ChannelObserver`] instead of scraping log output.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{Delivery, DeliveryEvent};

/// Receives delivery events from drain workers.
///
/// Called from the drain worker's task, once per event, in per-partition
/// offset order. Implementations should return quickly; a slow observer
/// delays only the partition worker that calls it.
pub trait DeliveryObserver: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: DeliveryEvent);
}

/// Shared observer pointer.
pub type ObserverPtr = Arc<dyn DeliveryObserver>;

/// Observer that logs deliveries at info level and drain failures at warn.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl DeliveryObserver for LoggingObserver {
    fn on_event(&self, event: DeliveryEvent) {
        // ---
        match event {
            DeliveryEvent::Delivered(_d) => {
                log_info!(
                    "subscriber {} received from topic '{}' partition {} offset {}: {}",
                    _d.subscriber,
                    _d.topic,
                    _d.partition,
                    _d.offset,
                    String::from_utf8_lossy(&_d.content)
                );
            }
            DeliveryEvent::DrainFailed {
                subscriber,
                topic,
                partition,
                error,
            } => {
                log_warn!("subscriber {subscriber} drain failed on {topic}/{partition}: {error}");
            }
        }
    }
}

/// Observer forwarding every event into an unbounded channel.
///
/// Unbounded so that a harness that stops reading never stalls a drain
/// worker.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    // ---
    tx: mpsc::UnboundedSender<DeliveryEvent>,
}

impl ChannelObserver {
    /// Create an observer and the inbox its events arrive on.
    pub fn channel() -> (ObserverPtr, DeliveryInbox) {
        // ---
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), DeliveryInbox { inbox: rx })
    }
}

impl DeliveryObserver for ChannelObserver {
    fn on_event(&self, event: DeliveryEvent) {
        // A closed channel means the inbox was dropped; nobody is listening.
        let _ = self.tx.send(event);
    }
}

/// Receiving side of a [`ChannelObserver`].
pub struct DeliveryInbox {
    // ---
    /// Raw event channel.
    pub inbox: mpsc::UnboundedReceiver<DeliveryEvent>,
}

impl DeliveryInbox {
    /// Next event, or `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<DeliveryEvent> {
        self.inbox.recv().await
    }

    /// Next successful delivery, skipping drain failures.
    pub async fn recv_delivery(&mut self) -> Option<Delivery> {
        // ---
        while let Some(event) = self.inbox.recv().await {
            if let DeliveryEvent::Delivered(delivery) = event {
                return Some(delivery);
            }
        }
        None
    }

    /// Events already queued, without waiting.
    pub fn try_drain(&mut self) -> Vec<DeliveryEvent> {
        // ---
        let mut events = Vec::new();
        while let Ok(event) = self.inbox.try_recv() {
            events.push(event);
        }
        events
    }
}
