//! Traits for listening history and artist similarity.

use super::models::RecentPlaysPage;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("unknown listener: {0}")]
    UnknownUser(String),

    #[error("listening history unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimilarityError {
    #[error("similarity service unavailable: {0}")]
    Unavailable(String),
}

/// Paginated recent-plays feed for a listener.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait ListeningHistory: Send + Sync {
    /// Fetch one page (1-based) of the listener's recent plays.
    async fn recent_plays_page(&self, user: &str, page: u32)
        -> Result<RecentPlaysPage, HistoryError>;
}

/// Artist similarity keyed by artist name.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait SimilarityService: Send + Sync {
    /// Names of artists similar to `artist_name`, best match first.
    async fn similar_artists(
        &self,
        artist_name: &str,
        limit: usize,
    ) -> Result<Vec<String>, SimilarityError>;
}
