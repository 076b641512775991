//! Service layer: collaborators and the client composition root.
//!
//! [`LiveClient`] owns the connection and dispatcher; the collaborators
//! in [`collaborators`] are what event handlers act through.

pub mod collaborators;
pub mod live_client;

pub use collaborators::{HttpStreamsRefresher, Notifier, Severity, StreamsRefresher, TracingNotifier};
pub use live_client::LiveClient;
