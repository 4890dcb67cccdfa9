use async_trait::async_trait;

use super::trait_def::{PlaylistScraper, ScrapedPlaylist, ScraperError};

/// Stand-in used when scraping is disabled in the configuration.
#[derive(Debug, Default)]
pub struct NoopScraper;

#[async_trait]
impl PlaylistScraper for NoopScraper {
    async fn artist_playlists(
        &mut self,
        _artist_id: &str,
    ) -> Result<Vec<ScrapedPlaylist>, ScraperError> {
        Err(ScraperError::Unavailable("scraping is disabled".to_string()))
    }

    async fn release(&mut self) {}
}
