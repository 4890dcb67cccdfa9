//! HTTP client for the Spotify Web API.
//!
//! One client is built per curation run from the user's bearer token.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::error::CatalogError;
use super::models::{
    ArtistProfile, ArtistRef, PlaylistItem, PlaylistRef, SavedTrack, SavedTracksPage, TrackRef,
};
use super::trait_def::CatalogService;

pub const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";

/// Max tracks per add/remove call accepted by the API.
const MUTATION_CHUNK: usize = 100;
const PLAYLIST_PAGE: usize = 100;

#[derive(Clone)]
pub struct SpotifyCatalogClient {
    client: Client,
    base_url: String,
    access_token: String,
    market: String,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct UserResponse {
    id: String,
}

#[derive(Deserialize)]
struct Followers {
    total: Option<u64>,
}

#[derive(Deserialize)]
struct ApiArtist {
    id: Option<String>,
    name: Option<String>,
    followers: Option<Followers>,
}

#[derive(Deserialize)]
struct ApiTrack {
    id: Option<String>,
    name: Option<String>,
    #[serde(default)]
    artists: Vec<ApiArtist>,
}

#[derive(Deserialize)]
struct ApiPlaylist {
    id: String,
    name: Option<String>,
}

#[derive(Deserialize)]
struct Paging<T> {
    // Search results may contain null entries.
    #[serde(default = "Vec::new")]
    items: Vec<Option<T>>,
    next: Option<String>,
}

#[derive(Deserialize)]
struct ArtistSearchResponse {
    artists: Paging<ApiArtist>,
}

#[derive(Deserialize)]
struct PlaylistSearchResponse {
    playlists: Paging<ApiPlaylist>,
}

#[derive(Deserialize)]
struct ApiPlaylistItem {
    added_at: Option<String>,
    track: Option<ApiTrack>,
}

#[derive(Deserialize)]
struct RelatedArtistsResponse {
    #[serde(default)]
    artists: Vec<ApiArtist>,
}

#[derive(Deserialize)]
struct TopTracksResponse {
    #[serde(default)]
    tracks: Vec<ApiTrack>,
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

impl ApiArtist {
    fn into_profile(self) -> Option<ArtistProfile> {
        Some(ArtistProfile {
            id: self.id?,
            name: self.name.unwrap_or_default(),
            followers: self.followers.and_then(|f| f.total).unwrap_or(0),
        })
    }
}

impl ApiTrack {
    fn into_track(self) -> TrackRef {
        TrackRef {
            id: self.id,
            name: self.name.unwrap_or_default(),
            // Artists without an id (local files) cannot be validated, drop them.
            artists: self
                .artists
                .into_iter()
                .filter_map(|a| {
                    Some(ArtistRef {
                        id: a.id?,
                        name: a.name.unwrap_or_default(),
                    })
                })
                .collect(),
        }
    }
}

impl ApiPlaylistItem {
    fn into_item(self) -> PlaylistItem {
        PlaylistItem {
            added_at: parse_timestamp(self.added_at.as_deref()),
            track: self.track.map(ApiTrack::into_track),
        }
    }
}

fn track_uri(track_id: &str) -> String {
    format!("spotify:track:{}", track_id)
}

impl SpotifyCatalogClient {
    /// Create a client for one user credential.
    ///
    /// # Arguments
    /// * `base_url` - API root, normally [`SPOTIFY_API_BASE`]
    /// * `access_token` - OAuth bearer token for the user
    /// * `timeout_secs` - Request timeout in seconds
    pub fn new(base_url: &str, access_token: &str, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            market: "US".to_string(),
        })
    }

    /// Market used for top-track lookups.
    pub fn with_market(mut self, market: &str) -> Self {
        self.market = market.to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<reqwest::Response, CatalogError> {
        let response = request.bearer_auth(&self.access_token).send().await?;
        if !response.status().is_success() {
            return Err(CatalogError::from_status(response.status(), context));
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        context: &str,
    ) -> Result<T, CatalogError> {
        let request = self.client.get(self.url(path)).query(query);
        let response = self.send(request, context).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| CatalogError::Transient(format!("{}: invalid response body: {}", context, e)))
    }
}

#[async_trait]
impl CatalogService for SpotifyCatalogClient {
    async fn current_user_id(&self) -> Result<String, CatalogError> {
        let user: UserResponse = self.get_json("/me", &[], "current user").await?;
        Ok(user.id)
    }

    async fn search_artist(&self, name: &str) -> Result<Option<ArtistProfile>, CatalogError> {
        let query = [
            ("q", name.to_string()),
            ("type", "artist".to_string()),
            ("limit", "1".to_string()),
        ];
        let response: ArtistSearchResponse =
            self.get_json("/search", &query, "artist search").await?;
        Ok(response
            .artists
            .items
            .into_iter()
            .flatten()
            .find_map(ApiArtist::into_profile))
    }

    async fn search_playlists(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<PlaylistRef>, CatalogError> {
        let params = [
            ("q", query.to_string()),
            ("type", "playlist".to_string()),
            ("limit", limit.to_string()),
        ];
        let response: PlaylistSearchResponse =
            self.get_json("/search", &params, "playlist search").await?;
        Ok(response
            .playlists
            .items
            .into_iter()
            .flatten()
            .map(|p| PlaylistRef {
                id: p.id,
                name: p.name.unwrap_or_default(),
            })
            .collect())
    }

    async fn playlist_items(&self, playlist_id: &str) -> Result<Vec<PlaylistItem>, CatalogError> {
        let path = format!("/playlists/{}/tracks", urlencoding::encode(playlist_id));
        let context = format!("playlist {}", playlist_id);
        let mut items = Vec::new();
        let mut offset = 0;

        loop {
            let query = [
                ("limit", PLAYLIST_PAGE.to_string()),
                ("offset", offset.to_string()),
                (
                    "fields",
                    "items(added_at,track(id,name,artists(id,name))),next".to_string(),
                ),
            ];
            let page: Paging<ApiPlaylistItem> = self.get_json(&path, &query, &context).await?;
            let count = page.items.len();
            items.extend(page.items.into_iter().flatten().map(ApiPlaylistItem::into_item));

            if page.next.is_none() || count == 0 {
                break;
            }
            offset += count;
        }

        Ok(items)
    }

    async fn artist(&self, artist_id: &str) -> Result<ArtistProfile, CatalogError> {
        let path = format!("/artists/{}", urlencoding::encode(artist_id));
        let context = format!("artist {}", artist_id);
        let artist: ApiArtist = self.get_json(&path, &[], &context).await?;
        artist
            .into_profile()
            .ok_or(CatalogError::NotFound(context))
    }

    async fn related_artists(&self, artist_id: &str) -> Result<Vec<ArtistProfile>, CatalogError> {
        let path = format!("/artists/{}/related-artists", urlencoding::encode(artist_id));
        let context = format!("related artists of {}", artist_id);
        let response: RelatedArtistsResponse = self.get_json(&path, &[], &context).await?;
        Ok(response
            .artists
            .into_iter()
            .filter_map(ApiArtist::into_profile)
            .collect())
    }

    async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<TrackRef>, CatalogError> {
        let path = format!("/artists/{}/top-tracks", urlencoding::encode(artist_id));
        let context = format!("top tracks of {}", artist_id);
        let query = [("market", self.market.clone())];
        let response: TopTracksResponse = self.get_json(&path, &query, &context).await?;
        Ok(response
            .tracks
            .into_iter()
            .map(ApiTrack::into_track)
            .collect())
    }

    async fn saved_tracks(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<SavedTracksPage, CatalogError> {
        let query = [("limit", limit.to_string()), ("offset", offset.to_string())];
        let page: Paging<ApiPlaylistItem> = self.get_json("/me/tracks", &query, "saved tracks").await?;
        let scanned = page.items.len();
        let tracks = page
            .items
            .into_iter()
            .flatten()
            .filter_map(|item| {
                let added_at = parse_timestamp(item.added_at.as_deref());
                item.track.map(|t| SavedTrack {
                    track: t.into_track(),
                    added_at,
                })
            })
            .collect();
        Ok(SavedTracksPage {
            tracks,
            scanned,
            has_more: page.next.is_some(),
        })
    }

    async fn add_to_playlist(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), CatalogError> {
        let path = format!("/playlists/{}/tracks", urlencoding::encode(playlist_id));
        let context = format!("add to playlist {}", playlist_id);
        for chunk in track_ids.chunks(MUTATION_CHUNK) {
            let uris: Vec<String> = chunk.iter().map(|id| track_uri(id)).collect();
            let request = self.client.post(self.url(&path)).json(&json!({ "uris": uris }));
            self.send(request, &context).await?;
        }
        Ok(())
    }

    async fn remove_from_playlist(
        &self,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<(), CatalogError> {
        let path = format!("/playlists/{}/tracks", urlencoding::encode(playlist_id));
        let context = format!("remove from playlist {}", playlist_id);
        for chunk in track_ids.chunks(MUTATION_CHUNK) {
            let tracks: Vec<serde_json::Value> = chunk
                .iter()
                .map(|id| json!({ "uri": track_uri(id) }))
                .collect();
            let request = self
                .client
                .delete(self.url(&path))
                .json(&json!({ "tracks": tracks }));
            self.send(request, &context).await?;
        }
        Ok(())
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<PlaylistRef, CatalogError> {
        let path = format!("/users/{}/playlists", urlencoding::encode(user_id));
        let request = self
            .client
            .post(self.url(&path))
            .json(&json!({ "name": name, "public": false }));
        let response = self.send(request, "create playlist").await?;
        let created: ApiPlaylist = response
            .json()
            .await
            .map_err(|e| CatalogError::Transient(format!("create playlist: {}", e)))?;
        Ok(PlaylistRef {
            id: created.id,
            name: created.name.unwrap_or_else(|| name.to_string()),
        })
    }
}
