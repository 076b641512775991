//! Connection lifecycle types.
//!
//! A [`ConnectionInfo`] describes one transport session. It is owned by
//! the connection manager and only ever handed out as a copy inside a
//! [`ConnectionStatus`] snapshot.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ConnectionId;
use crate::ws::reconnect::SchedulerState;

/// Lifecycle state of the transport session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Handshake in progress.
    Connecting,
    /// Session is open and usable for sending.
    Open,
    /// No session (never opened, lost, or torn down).
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Metadata of one transport session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionInfo {
    /// Session identifier.
    pub id: ConnectionId,
    /// Target address, e.g. `wss://tv.example.com/ws/`.
    pub target: String,
    /// Lifecycle state at the time of the snapshot.
    pub state: ConnectionState,
    /// When the session was created (the attempt started).
    pub created_at: DateTime<Utc>,
}

impl ConnectionInfo {
    /// Creates metadata for a session that is about to connect.
    #[must_use]
    pub fn connecting(target: impl Into<String>) -> Self {
        Self {
            id: ConnectionId::new(),
            target: target.into(),
            state: ConnectionState::Connecting,
            created_at: Utc::now(),
        }
    }

    /// Returns a copy with the given state.
    #[must_use]
    pub fn with_state(&self, state: ConnectionState) -> Self {
        Self {
            state,
            ..self.clone()
        }
    }
}

/// Snapshot published by the connection manager on every transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    /// Current lifecycle state.
    pub state: ConnectionState,
    /// Current (or last) session, if any attempt has been made.
    pub connection: Option<ConnectionInfo>,
    /// State of the reconnection scheduler.
    pub retry: SchedulerState,
}

impl ConnectionStatus {
    /// Returns `true` only while the session is open.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Returns `true` once the scheduler gave up after too many failures.
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        matches!(self.retry, SchedulerState::GaveUp { .. })
    }
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Closed,
            connection: None,
            retry: SchedulerState::Idle,
        }
    }
}
