//! Broadcast channel for handled server events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. After an
//! inbound event has been routed to its handler, the dispatcher publishes
//! it here so that other in-process listeners (a status bar, an audit
//! log) can observe the same stream without touching the connection.

use tokio::sync::broadcast;

use crate::ws::messages::InboundEvent;

/// Broadcast bus for [`InboundEvent`]s.
///
/// When the ring buffer is full, the oldest events are dropped for
/// lagging receivers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<InboundEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event.
    /// If there are no active receivers, the event is silently dropped.
    pub fn publish(&self, event: InboundEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new receiver that will receive all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<InboundEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
