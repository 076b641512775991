//! Client error types with stable numeric codes.
//!
//! [`ClientError`] is the central error type for the client. None of its
//! variants is fatal: transport failures are absorbed by the reconnection
//! scheduler, decode failures drop a single frame, and a send without an
//! open connection is reported back to the caller instead of panicking.

use std::time::Duration;

/// Failure to turn a raw frame into an [`crate::ws::messages::InboundEvent`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The frame is not well-formed JSON.
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    /// The frame is JSON but not an object.
    #[error("frame is not a JSON object")]
    NotAnObject,

    /// The frame has no string `type` field.
    #[error("frame has no string `type` field")]
    MissingType,

    /// The `message` field is present but neither an object nor null.
    #[error("`message` of `{0}` frame must be an object or null")]
    InvalidMessage(String),

    /// The `message` object does not match the shape expected for its type.
    #[error("payload of `{event_type}` frame is malformed: {source}")]
    InvalidPayload {
        /// Type tag of the offending frame.
        event_type: String,
        /// Underlying deserialization error.
        #[source]
        source: serde_json::Error,
    },
}

/// Client-side error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category       |
/// |-----------|----------------|
/// | 1000–1999 | Transport      |
/// | 2000–2999 | Inbound frames |
/// | 3000–3999 | Caller misuse  |
/// | 4000–4999 | Collaborators  |
/// | 5000–5999 | Setup/internal |
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Connection failed to open or was lost.
    #[error("transport error: {0}")]
    Transport(String),

    /// Opening the connection took longer than the configured timeout.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// An inbound frame could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// No handler is registered for the frame's type tag.
    #[error("unknown websocket event type: {0}")]
    UnknownEventType(String),

    /// `send` was called while no connection is open.
    #[error("send attempted while disconnected")]
    SendWhileDisconnected,

    /// The page address could not be turned into a connection target.
    #[error("invalid page address: {0}")]
    InvalidAddress(String),

    /// A configuration value is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Re-fetching the stream listing failed.
    #[error("streams refresh failed: {0}")]
    Refresh(String),

    /// Internal invariant violated (task panicked, runtime missing).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::Transport(_) => 1001,
            Self::ConnectTimeout(_) => 1002,
            Self::Decode(_) => 2001,
            Self::UnknownEventType(_) => 2002,
            Self::SendWhileDisconnected => 3001,
            Self::Refresh(_) => 4001,
            Self::InvalidAddress(_) => 5001,
            Self::Config(_) => 5002,
            Self::Internal(_) => 5000,
        }
    }

    /// Returns `true` if the error is a transport failure the reconnection
    /// scheduler recovers from.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::ConnectTimeout(_))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Refresh(err.to_string())
    }
}
