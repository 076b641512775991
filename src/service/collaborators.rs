//! Collaborators the event handlers call but do not define.
//!
//! - [`Notifier`]: the user-facing notification surface, `(text, severity)`.
//! - [`StreamsRefresher`]: a no-argument trigger that re-fetches the
//!   current stream listing into shared state.
//!
//! Both are called from the dispatcher task and must not block it.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::domain::{StreamListing, StreamsStore};
use crate::error::ClientError;

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Operation completed.
    Success,
    /// Neutral information.
    Info,
    /// Something needs attention.
    Warning,
    /// Operation failed.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// User-facing notification surface.
pub trait Notifier: Send + Sync + fmt::Debug {
    /// Shows `text` with the given severity.
    fn notify(&self, text: &str, severity: Severity);
}

/// Trigger that re-fetches the current stream listing.
pub trait StreamsRefresher: Send + Sync + fmt::Debug {
    /// Starts a refresh. Returns immediately; the fetch runs elsewhere.
    fn refresh(&self);
}

/// Notifier that writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, text: &str, severity: Severity) {
        match severity {
            Severity::Error => tracing::error!(%severity, "{text}"),
            Severity::Warning => tracing::warn!(%severity, "{text}"),
            Severity::Success | Severity::Info => tracing::info!(%severity, "{text}"),
        }
    }
}

/// Refresher that re-fetches the stream listing over HTTP and replaces
/// the contents of a [`StreamsStore`].
///
/// Each refresh takes the next generation number when it is requested.
/// Fetches run concurrently, but the store only accepts a listing newer
/// than the one it holds, so the most recently requested refresh wins even
/// if an older fetch answers last.
#[derive(Debug, Clone)]
pub struct HttpStreamsRefresher {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    store: Arc<StreamsStore>,
    generation: Arc<AtomicU64>,
}

impl HttpStreamsRefresher {
    /// Creates a refresher for `url`, authenticating with `token` as a
    /// bearer token when given.
    #[must_use]
    pub fn new(url: impl Into<String>, token: Option<String>, store: Arc<StreamsStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            token,
            store,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst).saturating_add(1)
    }

    /// Fetches the listing and replaces the store contents. Returns the
    /// new store revision, or `None` if a newer refresh already landed or
    /// the store is closed.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Refresh`] if the request fails, the server
    /// answers with a non-success status, or the body does not decode.
    pub async fn fetch(&self) -> Result<Option<u64>, ClientError> {
        let generation = self.next_generation();
        self.fetch_generation(generation).await
    }

    async fn fetch_generation(&self, generation: u64) -> Result<Option<u64>, ClientError> {
        let mut request = self.client.get(&self.url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let listing: StreamListing = request.send().await?.error_for_status()?.json().await?;
        let streams = listing.into_streams();
        let count = streams.len();
        let revision = self.store.replace(generation, streams).await;
        match revision {
            Some(revision) => tracing::info!(count, generation, revision, "stream listing refreshed"),
            None => tracing::debug!(generation, "stale stream listing discarded"),
        }
        Ok(revision)
    }
}

impl StreamsRefresher for HttpStreamsRefresher {
    fn refresh(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::error!("streams refresh requested outside a tokio runtime");
            return;
        };
        let generation = self.next_generation();
        let this = self.clone();
        runtime.spawn(async move {
            if let Err(e) = this.fetch_generation(generation).await {
                tracing::warn!(error = %e, url = %this.url, "streams refresh failed");
            }
        });
    }
}
