//! Trait definition for the music catalog service.

use super::error::CatalogError;
use super::models::{ArtistProfile, PlaylistItem, PlaylistRef, SavedTracksPage, TrackRef};
use async_trait::async_trait;

/// Operations the curation engine needs from the catalog.
///
/// Implementations must report a missing resource as [`CatalogError::NotFound`]
/// and throttling as [`CatalogError::RateLimited`], distinctly from other failures.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Id of the account the credential belongs to.
    async fn current_user_id(&self) -> Result<String, CatalogError>;

    /// Best match for an artist name, if any.
    async fn search_artist(&self, name: &str) -> Result<Option<ArtistProfile>, CatalogError>;

    /// Public playlists matching a free-text query.
    async fn search_playlists(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<PlaylistRef>, CatalogError>;

    /// Every item of a playlist, in playlist order.
    async fn playlist_items(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>, CatalogError>;

    /// Artist details including the current follower count.
    async fn artist(&self, artist_id: &str) -> Result<ArtistProfile, CatalogError>;

    /// The catalog's own "related artists" for an artist.
    async fn related_artists(&self, artist_id: &str) -> Result<Vec<ArtistProfile>, CatalogError>;

    async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<TrackRef>, CatalogError>;

    /// One page of the user's liked tracks, most recently liked first.
    async fn saved_tracks(&self, limit: usize, offset: usize)
        -> Result<SavedTracksPage, CatalogError>;

    async fn add_to_playlist(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), CatalogError>;

    /// Removes every occurrence of each track.
    async fn remove_from_playlist(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), CatalogError>;

    async fn create_playlist(&self, user_id: &str, name: &str)
        -> Result<PlaylistRef, CatalogError>;
}
