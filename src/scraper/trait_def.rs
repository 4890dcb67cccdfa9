//! Trait definition for the playlist scraper.

use async_trait::async_trait;
use thiserror::Error;

/// A playlist found on an artist's public page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedPlaylist {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Error)]
pub enum ScraperError {
    /// The browser session could not be acquired.
    #[error("browser unavailable: {0}")]
    Unavailable(String),

    /// The page could not be scraped.
    #[error("scrape failed: {0}")]
    Failed(String),
}

/// A run-scoped handle on the browser automation resource.
///
/// The session is created lazily on the first scrape and must be torn down with
/// [`PlaylistScraper::release`] when the run ends, whatever the outcome.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait PlaylistScraper: Send {
    /// Playlists authored by the artist, deduplicated, in page order.
    async fn artist_playlists(
        &mut self,
        artist_id: &str,
    ) -> Result<Vec<ScrapedPlaylist>, ScraperError>;

    /// Tear down the browser session, if one was opened. Safe to call twice.
    async fn release(&mut self);
}
