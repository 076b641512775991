//! WebSocket wire types: inbound envelope and per-type payloads.
//!
//! Every inbound frame is a JSON object `{ "type": <string>, "message": <object|null> }`.
//! The envelope is decoded once by [`InboundEvent::decode`]; each handler
//! then decodes its own payload with [`InboundEvent::decode_message`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DecodeError;

/// Type tag of the playlist refresh event.
pub const M3U_REFRESH: &str = "m3u_refresh";

/// Decoded envelope of one inbound frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Type discriminator used for routing.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Type-specific payload, `None` when absent or null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Map<String, Value>>,
}

impl InboundEvent {
    /// Creates an event with the given type and payload.
    #[must_use]
    pub fn new(event_type: impl Into<String>, message: Option<Map<String, Value>>) -> Self {
        Self {
            event_type: event_type.into(),
            message,
        }
    }

    /// Decodes a raw text frame into an envelope.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the frame is not JSON, not an object,
    /// lacks a string `type`, or carries a `message` that is neither an
    /// object nor null.
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(raw).map_err(DecodeError::InvalidJson)?;
        let Value::Object(mut fields) = value else {
            return Err(DecodeError::NotAnObject);
        };

        let event_type = match fields.remove("type") {
            Some(Value::String(t)) => t,
            _ => return Err(DecodeError::MissingType),
        };

        let message = match fields.remove("message") {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => return Err(DecodeError::InvalidMessage(event_type)),
        };

        Ok(Self {
            event_type,
            message,
        })
    }

    /// Decodes the payload into the handler's typed view.
    ///
    /// An absent or null payload decodes to `T::default()`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidPayload`] if the payload does not
    /// match `T`.
    pub fn decode_message<T>(&self) -> Result<T, DecodeError>
    where
        T: DeserializeOwned + Default,
    {
        match &self.message {
            None => Ok(T::default()),
            Some(map) => serde_json::from_value(Value::Object(map.clone())).map_err(|source| {
                DecodeError::InvalidPayload {
                    event_type: self.event_type.clone(),
                    source,
                }
            }),
        }
    }
}

/// Payload of an `m3u_refresh` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct M3uRefresh {
    /// Whether the playlist refresh completed successfully.
    #[serde(default)]
    pub success: bool,
    /// Human-readable outcome, shown to the user.
    #[serde(default)]
    pub message: Option<String>,
}
