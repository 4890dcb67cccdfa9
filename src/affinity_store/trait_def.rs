//! Trait definition for the per-user artist affinity store.

use super::models::StoredArtistAffinity;
use anyhow::Result;

/// Persistent (user, artist) → liked-track tally.
///
/// Increments must be atomic per row at the persistence layer: two runs for the
/// same user are not coordinated anywhere else.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait AffinityStore: Send + Sync {
    /// Whether this user has already had a full liked-history backfill.
    fn user_exists(&self, user_id: &str) -> Result<bool>;

    /// Record that the user's backfill completed.
    fn register_user(&self, user_id: &str) -> Result<()>;

    /// Add one liked track to the artist's tally, creating the row at 1 when absent.
    /// The stored display name is refreshed on every call.
    fn increment_liked(&self, user_id: &str, artist_id: &str, artist_name: &str) -> Result<()>;

    /// Point lookup of one artist row.
    fn get_artist(&self, user_id: &str, artist_id: &str) -> Result<Option<StoredArtistAffinity>>;

    /// All artist rows for the user.
    fn get_user_artists(&self, user_id: &str) -> Result<Vec<StoredArtistAffinity>>;
}
