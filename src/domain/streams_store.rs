//! Shared cache of the current stream listing.
//!
//! [`StreamsStore`] is the piece of application state that an
//! `m3u_refresh` event invalidates. The refresh collaborator replaces its
//! contents wholesale; pages read from it.
//!
//! Refreshes may complete out of order, so every listing is stamped with
//! the generation of the refresh that requested it. A listing older than
//! the one already applied is refused.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::StreamSummary;

#[derive(Debug, Default)]
struct Snapshot {
    streams: Vec<StreamSummary>,
    refreshed_at: Option<DateTime<Utc>>,
    generation: u64,
    closed: bool,
}

/// Cached stream listing with a monotonically increasing revision.
///
/// Every accepted [`StreamsStore::replace`] bumps the revision, so readers
/// can cheaply tell whether the listing changed since they last looked.
#[derive(Debug, Default)]
pub struct StreamsStore {
    inner: RwLock<Snapshot>,
    revision: AtomicU64,
}

impl StreamsStore {
    /// Creates an empty store at revision 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the cached listing with one fetched for `generation` and
    /// returns the new revision.
    ///
    /// Returns `None` without touching the listing if a listing of the same
    /// or a newer generation was already applied, or the store is closed.
    pub async fn replace(&self, generation: u64, streams: Vec<StreamSummary>) -> Option<u64> {
        let mut snapshot = self.inner.write().await;
        if snapshot.closed || generation <= snapshot.generation {
            return None;
        }
        snapshot.generation = generation;
        snapshot.streams = streams;
        snapshot.refreshed_at = Some(Utc::now());
        Some(self.revision.fetch_add(1, Ordering::SeqCst).saturating_add(1))
    }

    /// Refuses every later [`StreamsStore::replace`]. The cached listing
    /// stays readable.
    pub async fn close(&self) {
        self.inner.write().await.closed = true;
    }

    /// Returns the generation of the listing currently cached (0 if none).
    pub async fn generation(&self) -> u64 {
        self.inner.read().await.generation
    }

    /// Returns a copy of the cached listing.
    pub async fn list(&self) -> Vec<StreamSummary> {
        self.inner.read().await.streams.clone()
    }

    /// Returns the stream with the given id, if cached.
    pub async fn get(&self, id: i64) -> Option<StreamSummary> {
        self.inner
            .read()
            .await
            .streams
            .iter()
            .find(|s| s.id == id)
            .cloned()
    }

    /// Returns the number of cached streams.
    pub async fn len(&self) -> usize {
        self.inner.read().await.streams.len()
    }

    /// Returns `true` if no streams are cached.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.streams.is_empty()
    }

    /// Returns when the listing was last replaced.
    pub async fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.inner.read().await.refreshed_at
    }

    /// Returns the current revision (number of replacements so far).
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }
}
