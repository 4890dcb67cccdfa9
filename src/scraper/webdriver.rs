//! Playlist scraping over the W3C WebDriver protocol.
//!
//! Talks to a running chromedriver (or any WebDriver endpoint) over HTTP. The
//! browser session is opened on the first scrape and deleted on release. The
//! page's own DOM is queried for playlist links, so markup is never parsed here.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::gate::BrowserGate;
use super::trait_def::{PlaylistScraper, ScrapedPlaylist, ScraperError};

const ARTIST_PAGE_BASE: &str = "https://open.spotify.com/artist";
const LINK_POLL_INTERVAL: Duration = Duration::from_millis(500);
const MAX_SCROLLS: usize = 30;
const PLAYLIST_LINKS: &str = "a[href*='/playlist/']";
const COLLECT_LINKS: &str = "return Array.from(document.querySelectorAll(arguments[0])).map(\
    a => ({ href: a.getAttribute('href') || '', text: a.innerText || a.textContent || '' }));";

lazy_static! {
    static ref PLAYLIST_HREF: Regex = Regex::new(r"/playlist/([A-Za-z0-9]+)")
        .expect("Failed to compile playlist href pattern");
}

#[derive(Debug, Clone)]
pub struct WebDriverSettings {
    pub webdriver_url: String,
    pub chrome_binary: Option<String>,
    pub page_load_timeout: Duration,
    pub scroll_pause: Duration,
}

pub struct WebDriverScraper {
    client: Client,
    settings: WebDriverSettings,
    gate: BrowserGate,
    session_id: Option<String>,
}

#[derive(Deserialize)]
struct WebDriverReply {
    value: Value,
}

/// A link as rendered by the browser.
#[derive(Debug, Deserialize)]
struct PageLink {
    href: String,
    text: String,
}

/// Playlists behind the page's links, first occurrence of each id wins.
///
/// Links without visible text (cover images) are skipped.
fn extract_playlists(links: Vec<PageLink>) -> Vec<ScrapedPlaylist> {
    let mut seen = HashSet::new();
    let mut playlists = Vec::new();
    for link in links {
        let Some(caps) = PLAYLIST_HREF.captures(&link.href) else {
            continue;
        };
        let name = link.text.split_whitespace().collect::<Vec<_>>().join(" ");
        if name.is_empty() || !seen.insert(caps[1].to_string()) {
            continue;
        }
        playlists.push(ScrapedPlaylist {
            name,
            id: caps[1].to_string(),
        });
    }
    playlists
}

impl WebDriverScraper {
    pub fn new(settings: WebDriverSettings, gate: BrowserGate) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(settings.page_load_timeout + Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            settings,
            gate,
            session_id: None,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.settings.webdriver_url.trim_end_matches('/'), path)
    }

    async fn command(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, String> {
        let mut request = self.client.request(method, self.endpoint(path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        let reply: WebDriverReply = response.json().await.map_err(|e| e.to_string())?;
        if !status.is_success() {
            let message = reply
                .value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown webdriver error")
                .to_string();
            return Err(format!("{} ({})", message, status));
        }
        Ok(reply.value)
    }

    async fn ensure_session(&mut self) -> Result<String, ScraperError> {
        if let Some(id) = &self.session_id {
            return Ok(id.clone());
        }

        let mut chrome_options = json!({
            "args": ["--headless=new", "--no-sandbox", "--disable-dev-shm-usage", "--disable-gpu"]
        });
        if let Some(binary) = &self.settings.chrome_binary {
            chrome_options["binary"] = json!(binary);
        }
        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": chrome_options,
                }
            }
        });

        let value = self
            .command(reqwest::Method::POST, "/session", Some(body))
            .await
            .map_err(ScraperError::Unavailable)?;
        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| ScraperError::Unavailable("no session id in reply".to_string()))?
            .to_string();

        info!("Opened browser session {}", id);
        self.session_id = Some(id.clone());
        Ok(id)
    }

    async fn execute(&self, session: &str, script: &str, args: Value) -> Result<Value, String> {
        self.command(
            reqwest::Method::POST,
            &format!("/session/{}/execute/sync", session),
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }

    async fn has_playlist_links(&self, session: &str) -> Result<bool, String> {
        let value = self
            .command(
                reqwest::Method::POST,
                &format!("/session/{}/elements", session),
                Some(json!({ "using": "css selector", "value": PLAYLIST_LINKS })),
            )
            .await?;
        Ok(value.as_array().is_some_and(|found| !found.is_empty()))
    }

    async fn page_height(&self, session: &str) -> Result<Value, String> {
        self.execute(session, "return document.body.scrollHeight;", json!([]))
            .await
    }

    async fn scrape(&self, session: &str, artist_id: &str) -> Result<Vec<PageLink>, String> {
        let url = format!("{}/{}/playlists", ARTIST_PAGE_BASE, artist_id);
        self.command(
            reqwest::Method::POST,
            &format!("/session/{}/url", session),
            Some(json!({ "url": url })),
        )
        .await?;

        let deadline = Instant::now() + self.settings.page_load_timeout;
        loop {
            if self.has_playlist_links(session).await? {
                break;
            }
            if Instant::now() >= deadline {
                return Err(format!("no playlist links on {} within timeout", url));
            }
            tokio::time::sleep(LINK_POLL_INTERVAL).await;
        }
        tokio::time::sleep(self.settings.scroll_pause).await;

        let mut last_height = self.page_height(session).await?;
        for _ in 0..MAX_SCROLLS {
            self.execute(
                session,
                "window.scrollTo(0, document.body.scrollHeight);",
                json!([]),
            )
            .await?;
            tokio::time::sleep(self.settings.scroll_pause).await;
            let height = self.page_height(session).await?;
            if height == last_height {
                break;
            }
            last_height = height;
        }

        let links = self
            .execute(session, COLLECT_LINKS, json!([PLAYLIST_LINKS]))
            .await?;
        serde_json::from_value(links).map_err(|e| format!("unexpected link list: {}", e))
    }
}

#[async_trait]
impl PlaylistScraper for WebDriverScraper {
    async fn artist_playlists(
        &mut self,
        artist_id: &str,
    ) -> Result<Vec<ScrapedPlaylist>, ScraperError> {
        let _permit = self
            .gate
            .acquire()
            .await
            .ok_or_else(|| ScraperError::Unavailable("browser gate closed".to_string()))?;

        let session = self.ensure_session().await?;
        let links = self
            .scrape(&session, artist_id)
            .await
            .map_err(ScraperError::Failed)?;

        let playlists = extract_playlists(links);
        debug!(
            "Scraped {} playlists for artist {}",
            playlists.len(),
            artist_id
        );
        Ok(playlists)
    }

    async fn release(&mut self) {
        let Some(session) = self.session_id.take() else {
            return;
        };
        match self
            .command(reqwest::Method::DELETE, &format!("/session/{}", session), None)
            .await
        {
            Ok(_) => info!("Closed browser session {}", session),
            Err(e) => warn!("Failed to close browser session {}: {}", session, e),
        }
    }
}
