//! # iptv-live
//!
//! Live event client for an IPTV management dashboard.
//!
//! The dashboard keeps one WebSocket connection to its server at `/ws/`
//! and reacts to server-pushed events. Today that is `m3u_refresh`: when
//! a playlist refresh succeeds, the cached stream listing is re-fetched
//! and the user is notified. Dropped connections are re-established
//! under a configurable backoff, and any number of subscribers share a
//! single `(is_ready, last_value, send)` view of the connection.
//!
//! ## Architecture
//!
//! ```text
//! Server (/ws/)
//!     │
//!     ├── ConnectionManager (ws/connection) ── ReconnectScheduler (ws/reconnect)
//!     │        │ text frames, in order
//!     ├── Dispatcher (ws/dispatcher)
//!     │        ├── EventRouter (ws/router) ── M3uRefreshHandler (ws/handlers)
//!     │        │                                 ├── StreamsRefresher ── StreamsStore
//!     │        │                                 └── Notifier
//!     │        └── EventBus (domain/)
//!     │
//!     └── SubscriptionContext (ws/subscription) ── subscribers
//! ```
//!
//! [`service::LiveClient`] wires the pieces together.

pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod ws;
