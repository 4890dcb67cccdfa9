//! Last.fm API client.
//!
//! Rate limited to 5 requests per second per Last.fm API guidelines.

use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use super::models::{RecentPlaysPage, Scrobble};
use super::trait_def::{HistoryError, ListeningHistory, SimilarityError, SimilarityService};

pub const LASTFM_API_BASE: &str = "https://ws.audioscrobbler.com/2.0/";
const RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(200); // 5 req/sec
const RECENT_TRACKS_PAGE_SIZE: u32 = 200;

/// Error code Last.fm returns for an unknown artist or user.
const LASTFM_ERROR_NOT_FOUND: u32 = 6;

pub struct LastFmClient {
    client: Client,
    base_url: String,
    api_key: String,
    last_request: Mutex<Instant>,
}

// ---------------------------------------------------------------------------
// API response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ApiError {
    error: u32,
    message: Option<String>,
}

/// Last.fm collapses single-element arrays into a bare object.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(v) => v,
            OneOrMany::One(t) => vec![t],
        }
    }
}

#[derive(Deserialize)]
struct RecentTracksResponse {
    recenttracks: RecentTracks,
}

#[derive(Deserialize)]
struct RecentTracks {
    track: Option<OneOrMany<RecentTrack>>,
    #[serde(rename = "@attr")]
    attr: Option<PageAttr>,
}

#[derive(Deserialize)]
struct PageAttr {
    #[serde(rename = "totalPages")]
    total_pages: Option<String>,
}

#[derive(Deserialize)]
struct TextField {
    #[serde(rename = "#text")]
    text: Option<String>,
}

#[derive(Deserialize)]
struct PlayDate {
    uts: Option<String>,
}

#[derive(Deserialize)]
struct TrackAttr {
    nowplaying: Option<String>,
}

#[derive(Deserialize)]
struct RecentTrack {
    artist: Option<TextField>,
    name: Option<String>,
    date: Option<PlayDate>,
    #[serde(rename = "@attr")]
    attr: Option<TrackAttr>,
}

#[derive(Deserialize)]
struct SimilarArtistsResponse {
    similarartists: Option<SimilarArtistsContainer>,
}

#[derive(Deserialize)]
struct SimilarArtistsContainer {
    artist: Option<OneOrMany<LastFmArtist>>,
}

#[derive(Deserialize)]
struct LastFmArtist {
    name: Option<String>,
}

impl RecentTrack {
    fn into_scrobble(self) -> Option<Scrobble> {
        let artist_name = self.artist.and_then(|a| a.text).filter(|n| !n.is_empty())?;
        let now_playing = self
            .attr
            .and_then(|a| a.nowplaying)
            .is_some_and(|v| v == "true");
        let played_at = self
            .date
            .and_then(|d| d.uts)
            .and_then(|uts| uts.parse::<i64>().ok())
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));

        Some(Scrobble {
            artist_name,
            track_name: self.name.unwrap_or_default(),
            played_at,
            now_playing,
        })
    }
}

fn parse_recent_tracks(body: &str) -> std::result::Result<RecentPlaysPage, String> {
    let response: RecentTracksResponse =
        serde_json::from_str(body).map_err(|e| format!("invalid recent tracks body: {}", e))?;

    let total_pages = response
        .recenttracks
        .attr
        .and_then(|a| a.total_pages)
        .and_then(|p| p.parse().ok())
        .unwrap_or(0);

    let plays = response
        .recenttracks
        .track
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .filter_map(RecentTrack::into_scrobble)
        .collect();

    Ok(RecentPlaysPage { plays, total_pages })
}

fn parse_similar_artists(body: &str, limit: usize) -> std::result::Result<Vec<String>, String> {
    let response: SimilarArtistsResponse =
        serde_json::from_str(body).map_err(|e| format!("invalid similar artists body: {}", e))?;

    Ok(response
        .similarartists
        .and_then(|sa| sa.artist)
        .map(OneOrMany::into_vec)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|a| a.name.filter(|n| !n.is_empty()))
        .take(limit)
        .collect())
}

impl LastFmClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            last_request: Mutex::new(Instant::now() - RATE_LIMIT_INTERVAL),
        })
    }

    async fn rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        if elapsed < RATE_LIMIT_INTERVAL {
            tokio::time::sleep(RATE_LIMIT_INTERVAL - elapsed).await;
        }
        *last = Instant::now();
    }

    /// Issue a method call and return the raw body.
    ///
    /// Last.fm reports some failures with HTTP 200 and an `error` field, those
    /// come back as `Err((code, message))`.
    async fn call(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> std::result::Result<String, (Option<u32>, String)> {
        self.rate_limit().await;

        let mut query: Vec<(&str, String)> = vec![
            ("method", method.to_string()),
            ("api_key", self.api_key.clone()),
            ("format", "json".to_string()),
        ];
        query.extend(params.iter().cloned());

        let response = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await
            .map_err(|e| (None, e.to_string()))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| (None, e.to_string()))?;

        if let Ok(api_error) = serde_json::from_str::<ApiError>(&body) {
            return Err((
                Some(api_error.error),
                api_error.message.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        if !status.is_success() {
            return Err((None, format!("{} failed with status {}", method, status)));
        }
        Ok(body)
    }
}

#[async_trait]
impl ListeningHistory for LastFmClient {
    async fn recent_plays_page(
        &self,
        user: &str,
        page: u32,
    ) -> std::result::Result<RecentPlaysPage, HistoryError> {
        let params = [
            ("user", user.to_string()),
            ("limit", RECENT_TRACKS_PAGE_SIZE.to_string()),
            ("page", page.to_string()),
        ];
        match self.call("user.getrecenttracks", &params).await {
            Ok(body) => parse_recent_tracks(&body).map_err(HistoryError::Unavailable),
            Err((Some(LASTFM_ERROR_NOT_FOUND), _)) => Err(HistoryError::UnknownUser(user.to_string())),
            Err((_, message)) => Err(HistoryError::Unavailable(message)),
        }
    }
}

#[async_trait]
impl SimilarityService for LastFmClient {
    async fn similar_artists(
        &self,
        artist_name: &str,
        limit: usize,
    ) -> std::result::Result<Vec<String>, SimilarityError> {
        let params = [
            ("artist", artist_name.to_string()),
            ("limit", limit.to_string()),
            ("autocorrect", "1".to_string()),
        ];
        match self.call("artist.getsimilar", &params).await {
            Ok(body) => parse_similar_artists(&body, limit).map_err(SimilarityError::Unavailable),
            // Artist unknown to Last.fm.
            Err((Some(LASTFM_ERROR_NOT_FOUND), _)) => Ok(Vec::new()),
            Err((_, message)) => Err(SimilarityError::Unavailable(message)),
        }
    }
}
