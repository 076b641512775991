//! Stream listing entries as served by the dashboard API.

use serde::{Deserialize, Serialize};

/// One stream as listed by `GET /api/channels/streams/`.
///
/// Only the fields the client cares about are decoded; everything else
/// in the API response is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSummary {
    /// Server-side stream id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Source URL of the stream, if exposed.
    #[serde(default)]
    pub url: Option<String>,
    /// M3U account the stream was imported from.
    #[serde(default)]
    pub m3u_account: Option<i64>,
    /// Group title from the playlist.
    #[serde(default)]
    pub group_name: Option<String>,
}

/// Response body of the streams endpoint: either a bare array or a
/// paginated envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StreamListing {
    /// Paginated envelope with a `results` array.
    Paginated {
        /// Streams on this page.
        results: Vec<StreamSummary>,
    },
    /// Plain JSON array.
    Plain(Vec<StreamSummary>),
}

impl StreamListing {
    /// Returns the contained streams.
    #[must_use]
    pub fn into_streams(self) -> Vec<StreamSummary> {
        match self {
            Self::Paginated { results } => results,
            Self::Plain(streams) => streams,
        }
    }
}
