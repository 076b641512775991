//! WebSocket layer: live connection, reconnection, event routing.
//!
//! The dashboard keeps one WebSocket session to the server at `/ws/`.
//! [`connection::ConnectionManager`] owns that session and its reconnect
//! loop, [`dispatcher::Dispatcher`] turns inbound frames into handled
//! events, and [`subscription::SubscriptionContext`] is what the rest of
//! the application holds.

pub mod connection;
pub mod dispatcher;
pub mod handlers;
pub mod messages;
pub mod reconnect;
pub mod router;
pub mod subscription;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;
