//! Collaborators of one curation run.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use super::orchestrator::CurationRequest;
use crate::affinity_store::AffinityStore;
use crate::catalog::{CatalogService, SpotifyCatalogClient};
use crate::config::AppConfig;
use crate::lastfm::{LastFmClient, ListeningHistory, SimilarityService};
use crate::notifications::{NotificationTransport, TextbeltTransport};
use crate::scraper::{
    BrowserGate, NoopScraper, PlaylistScraper, WebDriverScraper, WebDriverSettings,
};

/// Everything a run talks to. Built fresh for every run.
pub struct RunServices {
    pub catalog: Arc<dyn CatalogService>,
    pub store: Arc<dyn AffinityStore>,
    pub history: Arc<dyn ListeningHistory>,
    pub similarity: Arc<dyn SimilarityService>,
    pub scraper: Box<dyn PlaylistScraper>,
    pub notifier: Arc<dyn NotificationTransport>,
}

impl RunServices {
    /// Build the production collaborators for a request.
    ///
    /// The catalog client is bound to the request's own access token. The
    /// browser is only used when scraping is enabled in the config.
    pub fn from_config(
        config: &AppConfig,
        request: &CurationRequest,
        store: Arc<dyn AffinityStore>,
        gate: BrowserGate,
    ) -> Result<Self> {
        let catalog = SpotifyCatalogClient::new(
            &config.catalog.api_base_url,
            &request.access_token,
            config.catalog.timeout_sec,
        )
        .context("Failed to create catalog client")?
        .with_market(&config.catalog.market);

        let api_key = config
            .lastfm
            .api_key
            .as_deref()
            .context("lastfm.api_key must be set in the config file")?;
        let lastfm = Arc::new(
            LastFmClient::new(&config.lastfm.api_base_url, api_key)
                .context("Failed to create Last.fm client")?,
        );

        let scraper: Box<dyn PlaylistScraper> = if config.scraper.enabled {
            let settings = WebDriverSettings {
                webdriver_url: config.scraper.webdriver_url.clone(),
                chrome_binary: config.scraper.chrome_binary.clone(),
                page_load_timeout: Duration::from_secs(config.scraper.page_load_timeout_secs),
                scroll_pause: Duration::from_millis(config.scraper.scroll_pause_ms),
            };
            Box::new(WebDriverScraper::new(settings, gate).context("Failed to create scraper")?)
        } else {
            info!("Artist page scraping disabled");
            Box::new(NoopScraper)
        };

        let notifier = TextbeltTransport::new(
            &config.notifications.endpoint,
            config.notifications.textbelt_api_key.clone(),
            config.notifications.timeout_sec,
        )
        .context("Failed to create notification transport")?;

        Ok(Self {
            catalog: Arc::new(catalog),
            store,
            history: lastfm.clone(),
            similarity: lastfm,
            scraper,
            notifier: Arc::new(notifier),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affinity_store::SqliteAffinityStore;
    use crate::config::{CliConfig, FileConfig, LastFmConfig};
    use tempfile::TempDir;

    fn request() -> CurationRequest {
        CurationRequest {
            access_token: "token".to_string(),
            playlist_id: "out".to_string(),
            user_id: None,
            phone: None,
            lastfm_username: None,
        }
    }

    fn config(temp_dir: &TempDir, api_key: Option<&str>) -> AppConfig {
        let cli = CliConfig {
            db_dir: Some(temp_dir.path().to_path_buf()),
            port: 3002,
        };
        let file = FileConfig {
            lastfm: Some(LastFmConfig {
                api_key: api_key.map(str::to_string),
                ..Default::default()
            }),
            ..Default::default()
        };
        AppConfig::resolve(&cli, Some(file)).unwrap()
    }

    #[test]
    fn test_from_config_builds_services() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(&temp_dir, Some("key"));
        let store = Arc::new(SqliteAffinityStore::in_memory().unwrap());

        let services =
            RunServices::from_config(&config, &request(), store, BrowserGate::new());
        assert!(services.is_ok());
    }

    #[test]
    fn test_from_config_requires_lastfm_key() {
        let temp_dir = TempDir::new().unwrap();
        let config = config(&temp_dir, None);
        let store = Arc::new(SqliteAffinityStore::in_memory().unwrap());

        let result = RunServices::from_config(&config, &request(), store, BrowserGate::new());
        assert!(result.is_err());
    }
}
