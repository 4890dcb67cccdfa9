//! In-memory collaborators for curation runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use rotation_curator::catalog::{
    ArtistProfile, ArtistRef, CatalogError, CatalogService, PlaylistItem, PlaylistRef, SavedTrack,
    SavedTracksPage, TrackRef,
};
use rotation_curator::lastfm::{
    HistoryError, ListeningHistory, RecentPlaysPage, Scrobble, SimilarityError, SimilarityService,
};
use rotation_curator::notifications::{NotificationError, NotificationTransport};
use rotation_curator::scraper::{PlaylistScraper, ScrapedPlaylist, ScraperError};

pub fn artist_ref(id: &str, name: &str) -> ArtistRef {
    ArtistRef {
        id: id.to_string(),
        name: name.to_string(),
    }
}

pub fn track(id: &str, artist_id: &str, artist_name: &str) -> TrackRef {
    TrackRef {
        id: Some(id.to_string()),
        name: format!("{} song", artist_name),
        artists: vec![artist_ref(artist_id, artist_name)],
    }
}

/// A catalog held in memory. Playlist writes are applied, every call is logged.
#[derive(Default)]
pub struct StubCatalog {
    user_id: String,
    saved: Vec<SavedTrack>,
    artists: HashMap<String, ArtistProfile>,
    top_tracks: HashMap<String, Vec<TrackRef>>,
    related: HashMap<String, Vec<ArtistProfile>>,
    search_results: HashMap<String, Vec<PlaylistRef>>,
    playlists: Mutex<HashMap<String, Vec<PlaylistItem>>>,
    calls: Mutex<Vec<String>>,
}

impl StubCatalog {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Default::default()
        }
    }

    pub fn with_liked(mut self, track: TrackRef) -> Self {
        self.saved.push(SavedTrack {
            track,
            added_at: Some(Utc::now()),
        });
        self
    }

    pub fn with_artist(mut self, id: &str, name: &str, followers: u64) -> Self {
        self.artists.insert(
            id.to_string(),
            ArtistProfile {
                id: id.to_string(),
                name: name.to_string(),
                followers,
            },
        );
        self
    }

    pub fn with_top_tracks(mut self, artist_id: &str, tracks: Vec<TrackRef>) -> Self {
        self.top_tracks.insert(artist_id.to_string(), tracks);
        self
    }

    pub fn with_related(mut self, artist_id: &str, related: Vec<ArtistProfile>) -> Self {
        self.related.insert(artist_id.to_string(), related);
        self
    }

    pub fn with_search_results(mut self, query: &str, playlists: Vec<PlaylistRef>) -> Self {
        self.search_results
            .insert(query.to_lowercase(), playlists);
        self
    }

    pub fn with_playlist(self, id: &str, items: Vec<PlaylistItem>) -> Self {
        self.playlists.lock().unwrap().insert(id.to_string(), items);
        self
    }

    pub fn playlist(&self, id: &str) -> Vec<PlaylistItem> {
        self.playlists
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn playlist_track_ids(&self, id: &str) -> Vec<String> {
        self.playlist(id)
            .into_iter()
            .filter_map(|item| item.track.and_then(|t| t.id))
            .collect()
    }

    /// Number of logged calls to the named operation.
    pub fn calls_to(&self, op: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.as_str() == op)
            .count()
    }

    fn log(&self, op: &str) {
        self.calls.lock().unwrap().push(op.to_string());
    }
}

#[async_trait]
impl CatalogService for StubCatalog {
    async fn current_user_id(&self) -> Result<String, CatalogError> {
        self.log("current_user_id");
        Ok(self.user_id.clone())
    }

    async fn search_artist(&self, name: &str) -> Result<Option<ArtistProfile>, CatalogError> {
        self.log("search_artist");
        let name = name.to_lowercase();
        Ok(self
            .artists
            .values()
            .find(|a| a.name.to_lowercase() == name)
            .cloned())
    }

    async fn search_playlists(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<PlaylistRef>, CatalogError> {
        self.log("search_playlists");
        Ok(self
            .search_results
            .get(&query.to_lowercase())
            .map(|found| found.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn playlist_items(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>, CatalogError> {
        self.log("playlist_items");
        self.playlists
            .lock()
            .unwrap()
            .get(playlist_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(playlist_id.to_string()))
    }

    async fn artist(&self, artist_id: &str) -> Result<ArtistProfile, CatalogError> {
        self.log("artist");
        self.artists
            .get(artist_id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(artist_id.to_string()))
    }

    async fn related_artists(&self, artist_id: &str) -> Result<Vec<ArtistProfile>, CatalogError> {
        self.log("related_artists");
        Ok(self.related.get(artist_id).cloned().unwrap_or_default())
    }

    async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<TrackRef>, CatalogError> {
        self.log("artist_top_tracks");
        Ok(self.top_tracks.get(artist_id).cloned().unwrap_or_default())
    }

    async fn saved_tracks(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<SavedTracksPage, CatalogError> {
        self.log("saved_tracks");
        let tracks: Vec<SavedTrack> = self.saved.iter().skip(offset).take(limit).cloned().collect();
        Ok(SavedTracksPage {
            scanned: tracks.len(),
            has_more: offset + tracks.len() < self.saved.len(),
            tracks,
        })
    }

    async fn add_to_playlist(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), CatalogError> {
        self.log("add_to_playlist");
        let known: Vec<TrackRef> = self
            .top_tracks
            .values()
            .flatten()
            .chain(self.saved.iter().map(|s| &s.track))
            .cloned()
            .collect();

        let mut playlists = self.playlists.lock().unwrap();
        let items = playlists
            .get_mut(playlist_id)
            .ok_or_else(|| CatalogError::NotFound(playlist_id.to_string()))?;
        for id in track_ids {
            let track = known
                .iter()
                .find(|t| t.id.as_deref() == Some(id.as_str()))
                .cloned()
                .unwrap_or_else(|| TrackRef {
                    id: Some(id.clone()),
                    name: id.clone(),
                    artists: vec![],
                });
            items.push(PlaylistItem {
                track: Some(track),
                added_at: Some(Utc::now()),
            });
        }
        Ok(())
    }

    async fn remove_from_playlist(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), CatalogError> {
        self.log("remove_from_playlist");
        let mut playlists = self.playlists.lock().unwrap();
        let items = playlists
            .get_mut(playlist_id)
            .ok_or_else(|| CatalogError::NotFound(playlist_id.to_string()))?;
        items.retain(|item| {
            let id = item.track.as_ref().and_then(|t| t.id.as_ref());
            !id.is_some_and(|id| track_ids.contains(id))
        });
        Ok(())
    }

    async fn create_playlist(
        &self,
        _user_id: &str,
        name: &str,
    ) -> Result<PlaylistRef, CatalogError> {
        self.log("create_playlist");
        let id = format!("created-{}", name.to_lowercase().replace(' ', "-"));
        self.playlists.lock().unwrap().insert(id.clone(), vec![]);
        Ok(PlaylistRef {
            id,
            name: name.to_string(),
        })
    }
}

/// Single-page listening history.
#[derive(Default)]
pub struct StubHistory {
    plays: Vec<Scrobble>,
}

impl StubHistory {
    pub fn new(plays: Vec<Scrobble>) -> Self {
        Self { plays }
    }
}

#[async_trait]
impl ListeningHistory for StubHistory {
    async fn recent_plays_page(
        &self,
        _user: &str,
        page: u32,
    ) -> Result<RecentPlaysPage, HistoryError> {
        if page > 1 {
            return Ok(RecentPlaysPage::default());
        }
        Ok(RecentPlaysPage {
            plays: self.plays.clone(),
            total_pages: 1,
        })
    }
}

#[derive(Default)]
pub struct StubSimilarity {
    similar: HashMap<String, Vec<String>>,
    pub calls: AtomicUsize,
}

impl StubSimilarity {
    pub fn with(mut self, artist_name: &str, similar: &[&str]) -> Self {
        self.similar.insert(
            artist_name.to_lowercase(),
            similar.iter().map(|s| s.to_string()).collect(),
        );
        self
    }
}

#[async_trait]
impl SimilarityService for StubSimilarity {
    async fn similar_artists(
        &self,
        artist_name: &str,
        limit: usize,
    ) -> Result<Vec<String>, SimilarityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .similar
            .get(&artist_name.to_lowercase())
            .map(|names| names.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

/// Observable state of a [`StubScraper`] once it has been handed to a run.
#[derive(Default)]
pub struct ScraperTally {
    pub scrapes: AtomicUsize,
    pub released: AtomicBool,
}

pub struct StubScraper {
    playlists: HashMap<String, Vec<ScrapedPlaylist>>,
    tally: Arc<ScraperTally>,
}

impl StubScraper {
    pub fn new(tally: Arc<ScraperTally>) -> Self {
        Self {
            playlists: HashMap::new(),
            tally,
        }
    }

    pub fn with(mut self, artist_id: &str, playlists: Vec<ScrapedPlaylist>) -> Self {
        self.playlists.insert(artist_id.to_string(), playlists);
        self
    }
}

#[async_trait]
impl PlaylistScraper for StubScraper {
    async fn artist_playlists(
        &mut self,
        artist_id: &str,
    ) -> Result<Vec<ScrapedPlaylist>, ScraperError> {
        self.tally.scrapes.fetch_add(1, Ordering::SeqCst);
        Ok(self.playlists.get(artist_id).cloned().unwrap_or_default())
    }

    async fn release(&mut self) {
        self.tally.released.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationTransport for RecordingNotifier {
    async fn send(&self, phone: &str, message: &str) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .unwrap()
            .push((phone.to_string(), message.to_string()));
        Ok(())
    }
}
