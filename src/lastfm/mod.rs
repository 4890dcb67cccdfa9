//! Last.fm access: the listening-history feed and the similar-artist service.

mod client;
mod models;
mod trait_def;

pub use client::{LastFmClient, LASTFM_API_BASE};
pub use models::{RecentPlaysPage, Scrobble};
pub use trait_def::{HistoryError, ListeningHistory, SimilarityError, SimilarityService};

#[cfg(any(test, feature = "mock"))]
pub use trait_def::{MockListeningHistory, MockSimilarityService};
