//! Common test infrastructure
//!
//! In-memory collaborators and a ready-made listener "world" for end-to-end
//! curation tests. Tests should only import from this module.

#![allow(dead_code)]

mod constants;
mod stubs;

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};

use rotation_curator::affinity_store::SqliteAffinityStore;
use rotation_curator::catalog::PlaylistItem;
use rotation_curator::curation::{CurationRequest, CurationSettings, RunServices};
use rotation_curator::lastfm::Scrobble;

pub use constants::*;
#[allow(unused_imports)]
pub use stubs::{
    artist_ref, track, RecordingNotifier, ScraperTally, StubCatalog, StubHistory,
    StubScraper, StubSimilarity,
};

/// Every collaborator of a run, kept around so tests can inspect them after.
pub struct TestWorld {
    pub catalog: Arc<StubCatalog>,
    pub store: Arc<SqliteAffinityStore>,
    pub history: Arc<StubHistory>,
    pub similarity: Arc<StubSimilarity>,
    pub notifier: Arc<RecordingNotifier>,
    pub tally: Arc<ScraperTally>,
}

impl TestWorld {
    pub fn new(catalog: StubCatalog, history: StubHistory, similarity: StubSimilarity) -> Self {
        Self {
            catalog: Arc::new(catalog),
            store: Arc::new(SqliteAffinityStore::in_memory().unwrap()),
            history: Arc::new(history),
            similarity: Arc::new(similarity),
            notifier: Arc::new(RecordingNotifier::default()),
            tally: Arc::new(ScraperTally::default()),
        }
    }

    /// Services for one run, with a scraper that finds nothing.
    pub fn services(&self) -> RunServices {
        self.services_with_scraper(StubScraper::new(self.tally.clone()))
    }

    pub fn services_with_scraper(&self, scraper: StubScraper) -> RunServices {
        RunServices {
            catalog: self.catalog.clone(),
            store: self.store.clone(),
            history: self.history.clone(),
            similarity: self.similarity.clone(),
            scraper: Box::new(scraper),
            notifier: self.notifier.clone(),
        }
    }
}

/// Zero delays, small target.
pub fn fast_settings(target_songs: usize) -> CurationSettings {
    let mut settings = CurationSettings::default().without_delays();
    settings.target_songs = target_songs;
    settings
}

pub fn request(phone: Option<&str>) -> CurationRequest {
    CurationRequest {
        access_token: "test-token".to_string(),
        playlist_id: OUTPUT_PLAYLIST_ID.to_string(),
        user_id: Some(TEST_USER_ID.to_string()),
        phone: phone.map(str::to_string),
        lastfm_username: Some(TEST_LISTENER.to_string()),
    }
}

pub fn plays(artist_name: &str, days_ago: &[i64]) -> Vec<Scrobble> {
    let now = Utc::now();
    days_ago
        .iter()
        .map(|days| Scrobble {
            artist_name: artist_name.to_string(),
            track_name: format!("{} hit", artist_name),
            played_at: Some(now - ChronoDuration::days(*days) - ChronoDuration::hours(1)),
            now_playing: false,
        })
        .collect()
}

/// A playlist item inserted `days` days (and an hour) ago.
pub fn aged_item(track_id: &str, artist_id: &str, artist_name: &str, days: i64) -> PlaylistItem {
    PlaylistItem {
        track: Some(track(track_id, artist_id, artist_name)),
        added_at: Some(Utc::now() - ChronoDuration::days(days) - ChronoDuration::hours(1)),
    }
}

/// Listener with one heavily played artist (A) and one heavily liked but
/// silent artist (B). Only the similarity service knows a fresh artist (G).
pub fn listener_catalog() -> StubCatalog {
    StubCatalog::new(TEST_USER_ID)
        .with_liked(track("liked-a-1", ARTIST_A_ID, ARTIST_A_NAME))
        .with_liked(track("liked-b-1", ARTIST_B_ID, ARTIST_B_NAME))
        .with_liked(track("liked-b-2", ARTIST_B_ID, ARTIST_B_NAME))
        .with_liked(track("liked-b-3", ARTIST_B_ID, ARTIST_B_NAME))
        .with_liked(track("liked-b-4", ARTIST_B_ID, ARTIST_B_NAME))
        .with_artist(ARTIST_A_ID, ARTIST_A_NAME, 900_000)
        .with_artist(ARTIST_B_ID, ARTIST_B_NAME, 400_000)
        .with_artist(ARTIST_G_ID, ARTIST_G_NAME, 1_200)
        .with_top_tracks(
            ARTIST_G_ID,
            vec![track(ARTIST_G_TRACK_ID, ARTIST_G_ID, ARTIST_G_NAME)],
        )
        .with_playlist(OUTPUT_PLAYLIST_ID, vec![])
}

/// Ten plays of A in the last 60 days, two of them in the last 14.
pub fn listener_history() -> StubHistory {
    StubHistory::new(plays(ARTIST_A_NAME, &[1, 5, 20, 25, 30, 35, 40, 45, 50, 55]))
}

pub fn listener_world() -> TestWorld {
    TestWorld::new(
        listener_catalog(),
        listener_history(),
        StubSimilarity::default().with(ARTIST_A_NAME, &[ARTIST_G_NAME]),
    )
}
