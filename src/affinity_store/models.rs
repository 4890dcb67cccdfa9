//! Data models for the affinity database.

use serde::{Deserialize, Serialize};

/// Liked-track tally for one (user, artist) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArtistAffinity {
    pub user_id: String,
    pub artist_id: String,
    pub artist_name: String,
    pub total_liked: u32,
    pub updated_at: i64,
}

/// Summary statistics for the affinity database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffinityStats {
    pub users: usize,
    pub artist_rows: usize,
}
