//! Inbound frame dispatcher.
//!
//! One dispatcher task drains the frame queue fed by the connection
//! manager, so events are handled strictly one at a time and in arrival
//! order. A frame that fails to decode or route is logged and dropped; it
//! never closes the connection and never touches the last value.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use super::messages::InboundEvent;
use super::router::EventRouter;
use crate::domain::EventBus;
use crate::error::ClientError;

/// Decodes, routes and records inbound frames.
#[derive(Debug)]
pub struct Dispatcher {
    router: Arc<EventRouter>,
    last_value: watch::Sender<Option<InboundEvent>>,
    event_bus: EventBus,
}

impl Dispatcher {
    /// Creates a dispatcher and the receiver that observes its last
    /// successfully handled event.
    #[must_use]
    pub fn new(
        router: Arc<EventRouter>,
        event_bus: EventBus,
    ) -> (Self, watch::Receiver<Option<InboundEvent>>) {
        let (last_value, rx) = watch::channel(None);
        (
            Self {
                router,
                last_value,
                event_bus,
            },
            rx,
        )
    }

    /// Handles one raw text frame.
    ///
    /// On success the event becomes the last value and is published on the
    /// event bus.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Decode`] for malformed frames,
    /// [`ClientError::UnknownEventType`] for unrouted types, or the
    /// handler's error. No state changes in any of these cases.
    pub fn dispatch(&self, raw: &str) -> Result<(), ClientError> {
        let event = InboundEvent::decode(raw)?;
        self.router.route(&event)?;
        self.last_value.send_replace(Some(event.clone()));
        let _ = self.event_bus.publish(event);
        Ok(())
    }

    /// Drains `frames` until the queue closes or `shutdown` fires.
    pub async fn run(self, mut frames: mpsc::Receiver<String>, mut shutdown: oneshot::Receiver<()>) {
        tracing::debug!(handlers = self.router.len(), "dispatcher started");
        loop {
            let raw = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                next = frames.recv() => match next {
                    Some(raw) => raw,
                    None => break,
                },
            };

            match self.dispatch(&raw) {
                Ok(()) => {}
                // Already logged by the router.
                Err(ClientError::UnknownEventType(_)) => {}
                Err(ClientError::Decode(e)) => {
                    tracing::warn!(error = %e, bytes = raw.len(), "dropping malformed frame");
                }
                Err(e) => {
                    tracing::error!(error = %e, code = e.error_code(), "event handler failed");
                }
            }
        }
        tracing::debug!("dispatcher stopped");
    }
}
