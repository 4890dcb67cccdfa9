//! Catalog-side data as the curation engine sees it.
//!
//! These are projections of the catalog's API objects, keeping only the fields
//! the engine reads.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistRef {
    pub id: String,
    pub name: String,
}

/// An artist with its current follower count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistProfile {
    pub id: String,
    pub name: String,
    pub followers: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRef {
    /// Missing for local files and unavailable tracks.
    pub id: Option<String>,
    pub name: String,
    /// Credited artists, primary artist first.
    pub artists: Vec<ArtistRef>,
}

impl TrackRef {
    pub fn primary_artist(&self) -> Option<&ArtistRef> {
        self.artists.first()
    }

    /// Whether any credited artist has this name, ignoring case.
    pub fn credits_artist_named(&self, name_lower: &str) -> bool {
        self.artists
            .iter()
            .any(|a| a.name.to_lowercase() == name_lower)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistRef {
    pub id: String,
    pub name: String,
}

/// One entry of a playlist, with the insertion time recorded by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistItem {
    pub track: Option<TrackRef>,
    pub added_at: Option<DateTime<Utc>>,
}

/// A track from the user's liked library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedTrack {
    pub track: TrackRef,
    pub added_at: Option<DateTime<Utc>>,
}

/// One page of liked tracks.
///
/// `scanned` counts the raw entries the catalog returned, including null or
/// track-less ones dropped from `tracks`. Paging advances by it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavedTracksPage {
    pub tracks: Vec<SavedTrack>,
    pub scanned: usize,
    pub has_more: bool,
}
