use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,

    // Feature configs
    pub curation: Option<CurationConfig>,
    pub discovery: Option<DiscoveryConfig>,
    pub catalog: Option<CatalogConfig>,
    pub lastfm: Option<LastFmConfig>,
    pub scraper: Option<ScraperConfig>,
    pub notifications: Option<NotificationsConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CurationConfig {
    pub target_songs: Option<usize>,
    pub eviction_days: Option<i64>,
    pub liked_rescan_limit: Option<usize>,
    pub liked_batch_size: Option<usize>,
    pub history_window_days: Option<i64>,
    pub known_artist_min_likes: Option<u32>,
    pub bonus_min_likes: Option<u32>,
    // Pacing
    pub call_delay_ms: Option<u64>,
    pub validation_delay_ms: Option<u64>,
    pub rate_limit_cooldown_secs: Option<u64>,
    pub history_page_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub scraped_follower_cap: Option<u64>,
    pub searched_follower_cap: Option<u64>,
    pub similar_follower_cap: Option<u64>,
    pub max_scraped_playlists: Option<usize>,
    pub scraped_crowding_limit: Option<usize>,
    pub searched_crowding_limit: Option<usize>,
    pub playlist_search_limit: Option<usize>,
    pub searched_playlists_considered: Option<usize>,
    pub similar_artists_limit: Option<usize>,
    pub draw_attempts: Option<usize>,
    pub max_consecutive_invalid: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CatalogConfig {
    pub api_base_url: Option<String>,
    pub timeout_sec: Option<u64>,
    pub market: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LastFmConfig {
    pub api_key: Option<String>,
    /// Listening-history account used when a request names none.
    pub username: Option<String>,
    pub api_base_url: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ScraperConfig {
    pub enabled: Option<bool>,
    pub webdriver_url: Option<String>,
    pub chrome_binary: Option<String>,
    pub page_load_timeout_secs: Option<u64>,
    pub scroll_pause_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct NotificationsConfig {
    pub textbelt_api_key: Option<String>,
    pub endpoint: Option<String>,
    pub timeout_sec: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
