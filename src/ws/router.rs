//! Event routing by type tag.
//!
//! [`EventRouter`] maps a type tag to an [`EventHandler`]. Adding a new
//! server event means registering one more handler; no existing handler
//! changes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::messages::InboundEvent;
use crate::error::ClientError;

/// Handler for one inbound event type.
pub trait EventHandler: Send + Sync + fmt::Debug {
    /// Type tag this handler is registered under.
    fn event_type(&self) -> &'static str;

    /// Handles one event of this handler's type.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] if the payload is malformed or a
    /// collaborator fails. The error is logged by the dispatcher; it never
    /// affects the connection.
    fn handle(&self, event: &InboundEvent) -> Result<(), ClientError>;
}

/// Registry of handlers keyed by type tag.
#[derive(Debug, Default)]
pub struct EventRouter {
    handlers: HashMap<&'static str, Arc<dyn EventHandler>>,
}

impl EventRouter {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under its type tag, returning the handler it
    /// replaced, if any.
    pub fn register(&mut self, handler: Arc<dyn EventHandler>) -> Option<Arc<dyn EventHandler>> {
        self.handlers.insert(handler.event_type(), handler)
    }

    /// Builder-style [`EventRouter::register`].
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        let _ = self.register(handler);
        self
    }

    /// Returns `true` if a handler is registered for `event_type`.
    #[must_use]
    pub fn handles(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    /// Returns the number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Dispatches `event` to the handler registered for its type.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::UnknownEventType`] (after logging it at error
    /// level) when no handler matches, or the handler's own error.
    pub fn route(&self, event: &InboundEvent) -> Result<(), ClientError> {
        let Some(handler) = self.handlers.get(event.event_type.as_str()) else {
            tracing::error!(event_type = %event.event_type, "unknown websocket event type");
            return Err(ClientError::UnknownEventType(event.event_type.clone()));
        };
        tracing::debug!(event_type = %event.event_type, "routing event");
        handler.handle(event)
    }
}
