//! Subscriber-facing view of the live connection.
//!
//! A [`SubscriptionContext`] is a cheap, cloneable handle. Every clone
//! observes the same readiness and last value, and sends through the same
//! connection, so any number of consumers can share it without ever
//! holding the transport.

use tokio::sync::watch;

use super::connection::OutboundSender;
use super::messages::InboundEvent;
use crate::domain::ConnectionStatus;
use crate::error::ClientError;

/// Point-in-time view handed to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSnapshot {
    /// `true` only while the session is open.
    pub is_ready: bool,
    /// Last successfully handled event, if any.
    pub last_value: Option<InboundEvent>,
}

/// Shared handle exposing `(is_ready, last_value, send)`.
#[derive(Debug, Clone)]
pub struct SubscriptionContext {
    status: watch::Receiver<ConnectionStatus>,
    last_value: watch::Receiver<Option<InboundEvent>>,
    outbound: OutboundSender,
}

impl SubscriptionContext {
    /// Binds a context to the manager's status, the dispatcher's last
    /// value and the manager's send capability.
    #[must_use]
    pub fn new(
        status: watch::Receiver<ConnectionStatus>,
        last_value: watch::Receiver<Option<InboundEvent>>,
        outbound: OutboundSender,
    ) -> Self {
        Self {
            status,
            last_value,
            outbound,
        }
    }

    /// Returns `true` only while the session is open.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status.borrow().is_ready()
    }

    /// Returns the last successfully handled event.
    #[must_use]
    pub fn last_value(&self) -> Option<InboundEvent> {
        self.last_value.borrow().clone()
    }

    /// Sends `data` on the current session.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::SendWhileDisconnected`] if no session is open.
    pub fn send(&self, data: impl Into<String>) -> Result<(), ClientError> {
        self.outbound.send(data)
    }

    /// Returns the full connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    /// Returns the current `(is_ready, last_value)` pair.
    #[must_use]
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            is_ready: self.is_ready(),
            last_value: self.last_value(),
        }
    }

    /// Waits until readiness or the last value changes and returns the new
    /// snapshot. Returns `None` once the client has shut down.
    ///
    /// Status transitions that leave readiness unchanged (for example
    /// `Closed` to `Connecting`) are also reported; compare snapshots to
    /// filter them.
    pub async fn changed(&mut self) -> Option<ContextSnapshot> {
        let changed = tokio::select! {
            r = self.status.changed() => r,
            r = self.last_value.changed() => r,
        };
        changed.ok()?;
        Some(self.snapshot())
    }

    /// Waits until the session is open. Returns `false` if the client shut
    /// down first.
    pub async fn wait_until_ready(&mut self) -> bool {
        self.status.wait_for(ConnectionStatus::is_ready).await.is_ok()
    }
}
