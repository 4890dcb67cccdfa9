//! Track discovery for one lottery artist.
//!
//! Four strategies run in a fixed order and the first accepted track wins:
//!
//! 1. playlists found on the artist's own page (scraped),
//! 2. public playlists matching the artist name,
//! 3. artists the similarity service considers close,
//! 4. the catalog's own related artists.
//!
//! A strategy that finds nothing, or whose service fails, falls through to the
//! next one. Finding nothing at all is a normal outcome.

use std::collections::HashSet;

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use tracing::{debug, info, warn};

use super::models::{CandidateTrack, DiscoverySource, RepresentedArtists, Verdict};
use super::settings::DiscoverySettings;
use super::validator::TrackValidator;
use crate::catalog::{ArtistRef, PacedCatalog, PlaylistItem, TrackRef};
use crate::lastfm::SimilarityService;
use crate::scraper::{PlaylistScraper, ScraperError};

pub struct CandidateResolver<'a> {
    catalog: &'a PacedCatalog,
    validator: &'a TrackValidator<'a>,
    similarity: &'a dyn SimilarityService,
    settings: &'a DiscoverySettings,
}

/// Tracks in `items` crediting the artist, by case-insensitive name.
fn artist_track_count(items: &[PlaylistItem], name_lower: &str) -> usize {
    items
        .iter()
        .filter_map(|item| item.track.as_ref())
        .filter(|track| track.credits_artist_named(name_lower))
        .count()
}

fn to_candidate(track: &TrackRef, source: DiscoverySource) -> Option<CandidateTrack> {
    let track_id = track.id.clone()?;
    let artist = track.primary_artist()?;
    Some(CandidateTrack {
        track_id,
        name: track.name.clone(),
        artist_id: artist.id.clone(),
        artist_name: artist.name.clone(),
        source,
    })
}

impl<'a> CandidateResolver<'a> {
    pub fn new(
        catalog: &'a PacedCatalog,
        validator: &'a TrackValidator<'a>,
        similarity: &'a dyn SimilarityService,
        settings: &'a DiscoverySettings,
    ) -> Self {
        Self {
            catalog,
            validator,
            similarity,
            settings,
        }
    }

    /// Find one acceptable track for `artist`.
    pub async fn resolve<R: Rng + Send>(
        &self,
        artist: &ArtistRef,
        represented: &RepresentedArtists,
        scraper: &mut dyn PlaylistScraper,
        rng: &mut R,
    ) -> Option<CandidateTrack> {
        let mut seen_playlists = HashSet::new();

        if let Some(found) = self
            .from_scraped_playlists(artist, represented, scraper, &mut seen_playlists, rng)
            .await
        {
            return Some(found);
        }
        debug!("No track from artist playlists of {}", artist.name);

        if let Some(found) = self
            .from_searched_playlists(artist, represented, &mut seen_playlists, rng)
            .await
        {
            return Some(found);
        }
        debug!("No track from searched playlists for {}", artist.name);

        if let Some(found) = self.from_similar_artists(artist, represented, rng).await {
            return Some(found);
        }
        debug!("No track from similar artists of {}", artist.name);

        self.from_related_artists(artist, represented, rng).await
    }

    async fn from_scraped_playlists<R: Rng + Send>(
        &self,
        artist: &ArtistRef,
        represented: &RepresentedArtists,
        scraper: &mut dyn PlaylistScraper,
        seen_playlists: &mut HashSet<String>,
        rng: &mut R,
    ) -> Option<CandidateTrack> {
        let playlists = match scraper.artist_playlists(&artist.id).await {
            Ok(playlists) => playlists,
            Err(ScraperError::Unavailable(e)) => {
                warn!("Skipping artist playlists for {}: {}", artist.name, e);
                return None;
            }
            Err(ScraperError::Failed(e)) => {
                warn!("Scraping playlists of {} failed: {}", artist.name, e);
                Vec::new()
            }
        };

        let name_lower = artist.name.to_lowercase();
        let mut sampled = 0;
        for playlist in playlists {
            if !seen_playlists.insert(playlist.id.clone()) {
                continue;
            }
            let Some(items) = self.catalog.playlist_items(&playlist.id).await else {
                continue;
            };
            if artist_track_count(&items, &name_lower) > self.settings.scraped_crowding_limit {
                debug!("Skipping crowded playlist {}", playlist.name);
                continue;
            }

            sampled += 1;
            if sampled > self.settings.max_scraped_playlists {
                break;
            }

            let source = DiscoverySource::ScrapedPlaylist {
                playlist: playlist.name,
            };
            if let Some(found) = self
                .draw_from_playlist(
                    &items,
                    self.settings.scraped_follower_cap,
                    source,
                    represented,
                    rng,
                )
                .await
            {
                return Some(found);
            }
        }
        None
    }

    async fn from_searched_playlists<R: Rng + Send>(
        &self,
        artist: &ArtistRef,
        represented: &RepresentedArtists,
        seen_playlists: &mut HashSet<String>,
        rng: &mut R,
    ) -> Option<CandidateTrack> {
        let playlists = self
            .catalog
            .search_playlists(&artist.name, self.settings.playlist_search_limit)
            .await?;

        let name_lower = artist.name.to_lowercase();
        for playlist in playlists
            .into_iter()
            .take(self.settings.searched_playlists_considered)
        {
            if !seen_playlists.insert(playlist.id.clone()) {
                continue;
            }
            let Some(items) = self.catalog.playlist_items(&playlist.id).await else {
                continue;
            };
            if artist_track_count(&items, &name_lower) > self.settings.searched_crowding_limit {
                debug!("Skipping crowded playlist {}", playlist.name);
                continue;
            }

            let source = DiscoverySource::SearchedPlaylist {
                playlist: playlist.name,
            };
            if let Some(found) = self
                .draw_from_playlist(
                    &items,
                    self.settings.searched_follower_cap,
                    source,
                    represented,
                    rng,
                )
                .await
            {
                return Some(found);
            }
        }
        None
    }

    /// Random draws from one playlist until a track is accepted.
    ///
    /// Items without a track id or artists are skipped without counting as an
    /// invalid draw.
    async fn draw_from_playlist<R: Rng + Send>(
        &self,
        items: &[PlaylistItem],
        follower_cap: u64,
        source: DiscoverySource,
        represented: &RepresentedArtists,
        rng: &mut R,
    ) -> Option<CandidateTrack> {
        let mut invalid = 0;
        for attempt in 1..=self.settings.draw_attempts {
            let item = items.choose(rng)?;
            let Some(track) = item.track.as_ref() else {
                continue;
            };
            if track.id.is_none() || track.artists.is_empty() {
                continue;
            }

            match self
                .validator
                .validate(track, represented, Some(follower_cap))
                .await
            {
                Verdict::Accept => {
                    info!("Picked '{}' from {} (draw {})", track.name, source, attempt);
                    return to_candidate(track, source);
                }
                Verdict::Reject(reason) => {
                    debug!("Draw {} from {} rejected: {}", attempt, source, reason);
                    invalid += 1;
                    if invalid >= self.settings.max_consecutive_invalid {
                        debug!("Giving up on {} after {} invalid draws", source, invalid);
                        return None;
                    }
                }
            }
        }
        None
    }

    async fn from_similar_artists<R: Rng + Send>(
        &self,
        artist: &ArtistRef,
        represented: &RepresentedArtists,
        rng: &mut R,
    ) -> Option<CandidateTrack> {
        let limit = self.settings.similar_artists_limit;
        let mut names = match self.similarity.similar_artists(&artist.name, limit).await {
            Ok(names) => names,
            Err(e) => {
                warn!("Similar artists of {} unavailable: {}", artist.name, e);
                return None;
            }
        };
        names.shuffle(rng);

        let cap = self.settings.similar_follower_cap;
        for name in names.into_iter().take(limit) {
            let Some(profile) = self.catalog.search_artist(&name).await else {
                continue;
            };
            if profile.followers >= cap {
                continue;
            }
            let source = DiscoverySource::SimilarArtist {
                seed: artist.name.clone(),
            };
            if let Some(found) = self
                .pick_top_track(&profile.id, cap, source, represented, rng)
                .await
            {
                return Some(found);
            }
        }
        None
    }

    async fn from_related_artists<R: Rng + Send>(
        &self,
        artist: &ArtistRef,
        represented: &RepresentedArtists,
        rng: &mut R,
    ) -> Option<CandidateTrack> {
        let mut related = self.catalog.related_artists(&artist.id).await?;
        related.shuffle(rng);

        let cap = self.settings.similar_follower_cap;
        let name_lower = artist.name.to_lowercase();
        for profile in related.into_iter().take(self.settings.similar_artists_limit) {
            if profile.followers >= cap || profile.name.to_lowercase() == name_lower {
                continue;
            }
            let source = DiscoverySource::RelatedArtist {
                seed: artist.name.clone(),
            };
            if let Some(found) = self
                .pick_top_track(&profile.id, cap, source, represented, rng)
                .await
            {
                return Some(found);
            }
        }
        None
    }

    async fn pick_top_track<R: Rng + Send>(
        &self,
        artist_id: &str,
        follower_cap: u64,
        source: DiscoverySource,
        represented: &RepresentedArtists,
        rng: &mut R,
    ) -> Option<CandidateTrack> {
        let tracks = self.catalog.artist_top_tracks(artist_id).await?;
        let track = tracks.choose(rng)?;

        match self
            .validator
            .validate(track, represented, Some(follower_cap))
            .await
        {
            Verdict::Accept => {
                info!("Picked '{}' ({})", track.name, source);
                to_candidate(track, source)
            }
            Verdict::Reject(reason) => {
                debug!("Top track '{}' rejected: {}", track.name, reason);
                None
            }
        }
    }
}
