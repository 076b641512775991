//! Shared application state handed to collaborators.

use std::sync::Arc;

use crate::domain::{EventBus, StreamsStore};

/// Shared state the event handlers and their collaborators act on.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Cached stream listing, replaced on every playlist refresh.
    pub streams: Arc<StreamsStore>,
    /// Bus carrying every successfully handled server event.
    pub event_bus: EventBus,
}

impl AppState {
    /// Creates empty state with an event bus of the given capacity.
    #[must_use]
    pub fn new(event_bus_capacity: usize) -> Self {
        Self {
            streams: Arc::new(StreamsStore::new()),
            event_bus: EventBus::new(event_bus_capacity),
        }
    }
}
