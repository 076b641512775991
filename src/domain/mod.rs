//! Domain layer: connection model, page context, and shared state.
//!
//! This module contains the client-side data model: connection identity
//! and lifecycle snapshots, the page context the connection target is
//! derived from, the event bus for handled events, and the cached
//! stream listing an `m3u_refresh` invalidates.

pub mod connection;
pub mod connection_id;
pub mod event_bus;
pub mod page_context;
pub mod stream;
pub mod streams_store;

pub use connection::{ConnectionInfo, ConnectionState, ConnectionStatus};
pub use connection_id::ConnectionId;
pub use event_bus::EventBus;
pub use page_context::{PageContext, RunMode};
pub use stream::{StreamListing, StreamSummary};
pub use streams_store::StreamsStore;
