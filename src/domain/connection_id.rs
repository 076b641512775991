//! Type-safe connection identifier.
//!
//! [`ConnectionId`] wraps a [`uuid::Uuid`] (v4) so that log lines and
//! status snapshots can tell successive transport sessions apart.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for one transport session.
///
/// A fresh id is minted for every connection attempt, including each
/// reconnect, so a stale session can never be mistaken for the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(uuid::Uuid);

impl ConnectionId {
    /// Creates a new random `ConnectionId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
