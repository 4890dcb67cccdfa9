//! Call pacing and error policy for catalog access during a run.
//!
//! Every call is preceded by a fixed delay. Failures never propagate: a missing
//! resource becomes `None`, throttling triggers a cooldown pause and then `None`,
//! anything else is logged and becomes `None`.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::error::CatalogError;
use super::models::{ArtistProfile, PlaylistItem, PlaylistRef, SavedTracksPage, TrackRef};
use super::trait_def::CatalogService;

/// Timing knobs applied to catalog calls.
#[derive(Debug, Clone, Copy)]
pub struct RunPolicy {
    pub call_delay: Duration,
    pub rate_limit_cooldown: Duration,
}

impl Default for RunPolicy {
    fn default() -> Self {
        Self {
            call_delay: Duration::from_millis(500),
            rate_limit_cooldown: Duration::from_secs(120),
        }
    }
}

impl RunPolicy {
    /// No waiting at all, for tests.
    pub fn immediate() -> Self {
        Self {
            call_delay: Duration::ZERO,
            rate_limit_cooldown: Duration::ZERO,
        }
    }
}

pub struct PacedCatalog {
    inner: Arc<dyn CatalogService>,
    policy: RunPolicy,
    cooldowns: AtomicUsize,
}

impl PacedCatalog {
    pub fn new(inner: Arc<dyn CatalogService>, policy: RunPolicy) -> Self {
        Self {
            inner,
            policy,
            cooldowns: AtomicUsize::new(0),
        }
    }

    /// Number of rate-limit pauses taken so far.
    pub fn cooldowns(&self) -> usize {
        self.cooldowns.load(Ordering::Relaxed)
    }

    async fn settle<T, F>(&self, op: &str, call: F) -> Option<T>
    where
        F: Future<Output = Result<T, CatalogError>>,
    {
        if !self.policy.call_delay.is_zero() {
            tokio::time::sleep(self.policy.call_delay).await;
        }

        match call.await {
            Ok(value) => Some(value),
            Err(CatalogError::NotFound(what)) => {
                debug!("{}: not found ({})", op, what);
                None
            }
            Err(CatalogError::RateLimited) => {
                warn!(
                    "{}: rate limited, pausing for {:?}",
                    op, self.policy.rate_limit_cooldown
                );
                self.cooldowns.fetch_add(1, Ordering::Relaxed);
                tokio::time::sleep(self.policy.rate_limit_cooldown).await;
                None
            }
            Err(e) => {
                warn!("{}: {}", op, e);
                None
            }
        }
    }

    pub async fn current_user_id(&self) -> Option<String> {
        self.settle("current user", self.inner.current_user_id())
            .await
    }

    pub async fn search_artist(&self, name: &str) -> Option<ArtistProfile> {
        self.settle("artist search", self.inner.search_artist(name))
            .await
            .flatten()
    }

    pub async fn search_playlists(&self, query: &str, limit: usize) -> Option<Vec<PlaylistRef>> {
        self.settle("playlist search", self.inner.search_playlists(query, limit))
            .await
    }

    pub async fn playlist_items(&self, playlist_id: &str) -> Option<Vec<PlaylistItem>> {
        self.settle("playlist items", self.inner.playlist_items(playlist_id))
            .await
    }

    pub async fn artist(&self, artist_id: &str) -> Option<ArtistProfile> {
        self.settle("artist lookup", self.inner.artist(artist_id))
            .await
    }

    pub async fn related_artists(&self, artist_id: &str) -> Option<Vec<ArtistProfile>> {
        self.settle("related artists", self.inner.related_artists(artist_id))
            .await
    }

    pub async fn artist_top_tracks(&self, artist_id: &str) -> Option<Vec<TrackRef>> {
        self.settle("top tracks", self.inner.artist_top_tracks(artist_id))
            .await
    }

    pub async fn saved_tracks(&self, limit: usize, offset: usize) -> Option<SavedTracksPage> {
        self.settle("saved tracks", self.inner.saved_tracks(limit, offset))
            .await
    }

    /// Returns whether the tracks were added.
    pub async fn add_to_playlist(&self, playlist_id: &str, track_ids: &[String]) -> bool {
        self.settle("playlist add", self.inner.add_to_playlist(playlist_id, track_ids))
            .await
            .is_some()
    }

    /// Returns whether the tracks were removed.
    pub async fn remove_from_playlist(&self, playlist_id: &str, track_ids: &[String]) -> bool {
        self.settle(
            "playlist remove",
            self.inner.remove_from_playlist(playlist_id, track_ids),
        )
        .await
        .is_some()
    }

    pub async fn create_playlist(&self, user_id: &str, name: &str) -> Option<PlaylistRef> {
        self.settle("create playlist", self.inner.create_playlist(user_id, name))
            .await
    }
}
