mod file_config;

pub use file_config::{
    CatalogConfig, CurationConfig, DiscoveryConfig, FileConfig, LastFmConfig,
    NotificationsConfig, ScraperConfig,
};

use crate::catalog::SPOTIFY_API_BASE;
use crate::curation::{CurationSettings, DiscoverySettings};
use crate::lastfm::LASTFM_API_BASE;
use crate::notifications::TEXTBELT_ENDPOINT;
use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Settings for the music catalog client
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub api_base_url: String,
    pub timeout_sec: u64,
    /// Market used for artist top tracks
    pub market: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            api_base_url: SPOTIFY_API_BASE.to_string(),
            timeout_sec: 30,
            market: "US".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LastFmSettings {
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub api_base_url: String,
}

#[derive(Debug, Clone)]
pub struct ScraperSettings {
    pub enabled: bool,
    pub webdriver_url: String,
    pub chrome_binary: Option<String>,
    pub page_load_timeout_secs: u64,
    pub scroll_pause_ms: u64,
}

impl Default for ScraperSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            webdriver_url: "http://localhost:9515".to_string(),
            chrome_binary: None,
            page_load_timeout_secs: 10,
            scroll_pause_ms: 2000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub textbelt_api_key: Option<String>,
    pub endpoint: String,
    pub timeout_sec: u64,
}

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,

    // Feature configs (with defaults)
    pub curation: CurationSettings,
    pub catalog: CatalogSettings,
    pub lastfm: LastFmSettings,
    pub scraper: ScraperSettings,
    pub notifications: NotificationSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);

        // Curation settings - merge file config with defaults
        let curation_defaults = CurationSettings::default();
        let c_file = file.curation.unwrap_or_default();
        let d_file = file.discovery.unwrap_or_default();
        let d_defaults = DiscoverySettings::default();
        let discovery = DiscoverySettings {
            scraped_follower_cap: d_file
                .scraped_follower_cap
                .unwrap_or(d_defaults.scraped_follower_cap),
            searched_follower_cap: d_file
                .searched_follower_cap
                .unwrap_or(d_defaults.searched_follower_cap),
            similar_follower_cap: d_file
                .similar_follower_cap
                .unwrap_or(d_defaults.similar_follower_cap),
            max_scraped_playlists: d_file
                .max_scraped_playlists
                .unwrap_or(d_defaults.max_scraped_playlists),
            scraped_crowding_limit: d_file
                .scraped_crowding_limit
                .unwrap_or(d_defaults.scraped_crowding_limit),
            searched_crowding_limit: d_file
                .searched_crowding_limit
                .unwrap_or(d_defaults.searched_crowding_limit),
            playlist_search_limit: d_file
                .playlist_search_limit
                .unwrap_or(d_defaults.playlist_search_limit),
            searched_playlists_considered: d_file
                .searched_playlists_considered
                .unwrap_or(d_defaults.searched_playlists_considered),
            similar_artists_limit: d_file
                .similar_artists_limit
                .unwrap_or(d_defaults.similar_artists_limit),
            draw_attempts: d_file.draw_attempts.unwrap_or(d_defaults.draw_attempts),
            max_consecutive_invalid: d_file
                .max_consecutive_invalid
                .unwrap_or(d_defaults.max_consecutive_invalid),
        };
        let curation = CurationSettings {
            target_songs: c_file.target_songs.unwrap_or(curation_defaults.target_songs),
            eviction_days: c_file
                .eviction_days
                .unwrap_or(curation_defaults.eviction_days),
            liked_rescan_limit: c_file
                .liked_rescan_limit
                .unwrap_or(curation_defaults.liked_rescan_limit),
            liked_batch_size: c_file
                .liked_batch_size
                .unwrap_or(curation_defaults.liked_batch_size),
            history_window_days: c_file
                .history_window_days
                .unwrap_or(curation_defaults.history_window_days),
            known_artist_min_likes: c_file
                .known_artist_min_likes
                .unwrap_or(curation_defaults.known_artist_min_likes),
            bonus_min_likes: c_file
                .bonus_min_likes
                .unwrap_or(curation_defaults.bonus_min_likes),
            call_delay: c_file
                .call_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(curation_defaults.call_delay),
            validation_delay: c_file
                .validation_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(curation_defaults.validation_delay),
            rate_limit_cooldown: c_file
                .rate_limit_cooldown_secs
                .map(Duration::from_secs)
                .unwrap_or(curation_defaults.rate_limit_cooldown),
            history_page_delay: c_file
                .history_page_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(curation_defaults.history_page_delay),
            discovery,
        };

        let catalog_file = file.catalog.unwrap_or_default();
        let catalog_defaults = CatalogSettings::default();
        let catalog = CatalogSettings {
            api_base_url: catalog_file
                .api_base_url
                .unwrap_or(catalog_defaults.api_base_url),
            timeout_sec: catalog_file
                .timeout_sec
                .unwrap_or(catalog_defaults.timeout_sec),
            market: catalog_file.market.unwrap_or(catalog_defaults.market),
        };

        let lastfm_file = file.lastfm.unwrap_or_default();
        let lastfm = LastFmSettings {
            api_key: lastfm_file.api_key.filter(|k| !k.is_empty()),
            username: lastfm_file.username.filter(|u| !u.is_empty()),
            api_base_url: lastfm_file
                .api_base_url
                .unwrap_or_else(|| LASTFM_API_BASE.to_string()),
        };

        let scraper_file = file.scraper.unwrap_or_default();
        let scraper_defaults = ScraperSettings::default();
        let scraper = ScraperSettings {
            enabled: scraper_file.enabled.unwrap_or(scraper_defaults.enabled),
            webdriver_url: scraper_file
                .webdriver_url
                .unwrap_or(scraper_defaults.webdriver_url),
            chrome_binary: scraper_file.chrome_binary,
            page_load_timeout_secs: scraper_file
                .page_load_timeout_secs
                .unwrap_or(scraper_defaults.page_load_timeout_secs),
            scroll_pause_ms: scraper_file
                .scroll_pause_ms
                .unwrap_or(scraper_defaults.scroll_pause_ms),
        };

        let notifications_file = file.notifications.unwrap_or_default();
        let notifications = NotificationSettings {
            textbelt_api_key: notifications_file.textbelt_api_key,
            endpoint: notifications_file
                .endpoint
                .unwrap_or_else(|| TEXTBELT_ENDPOINT.to_string()),
            timeout_sec: notifications_file.timeout_sec.unwrap_or(10),
        };

        Ok(AppConfig {
            db_dir,
            port,
            curation,
            catalog,
            lastfm,
            scraper,
            notifications,
        })
    }

    pub fn affinity_db_path(&self) -> PathBuf {
        self.db_dir.join("affinity.db")
    }
}
