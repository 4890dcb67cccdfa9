//! Output playlist maintenance: insertion and age-based eviction.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use super::models::{CandidateTrack, PlaylistEntry, RepresentedArtists};
use crate::catalog::{ArtistRef, PacedCatalog};

pub struct PlaylistMaintainer<'a> {
    catalog: &'a PacedCatalog,
    playlist_id: String,
}

impl<'a> PlaylistMaintainer<'a> {
    pub fn new(catalog: &'a PacedCatalog, playlist_id: &str) -> Self {
        Self {
            catalog,
            playlist_id: playlist_id.to_string(),
        }
    }

    /// Current entries of the playlist, or `None` if it cannot be read.
    pub async fn entries(&self) -> Option<Vec<PlaylistEntry>> {
        let items = self.catalog.playlist_items(&self.playlist_id).await?;
        Some(
            items
                .into_iter()
                .filter_map(|item| {
                    let track = item.track?;
                    Some(PlaylistEntry {
                        artist_id: track.primary_artist().map(|a| a.id.clone()),
                        track_id: track.id?,
                        added_at: item.added_at,
                    })
                })
                .collect(),
        )
    }

    /// Primary artists of the tracks already in the playlist.
    pub async fn load_represented(&self) -> Option<RepresentedArtists> {
        let items = self.catalog.playlist_items(&self.playlist_id).await?;
        let mut represented = RepresentedArtists::default();
        for artist in items
            .iter()
            .filter_map(|item| item.track.as_ref())
            .filter_map(|track| track.primary_artist())
        {
            represented.insert(artist);
        }
        info!(
            "Found {} artists already in playlist {}",
            represented.len(),
            self.playlist_id
        );
        Some(represented)
    }

    /// Append a track and mark its artist as represented.
    pub async fn insert(
        &self,
        candidate: &CandidateTrack,
        represented: &mut RepresentedArtists,
    ) -> bool {
        let added = self
            .catalog
            .add_to_playlist(&self.playlist_id, &[candidate.track_id.clone()])
            .await;
        if added {
            represented.insert(&ArtistRef {
                id: candidate.artist_id.clone(),
                name: candidate.artist_name.clone(),
            });
            info!(
                "Added '{}' by '{}' ({})",
                candidate.name, candidate.artist_name, candidate.source
            );
        } else {
            warn!("Failed to add '{}' to playlist", candidate.name);
        }
        added
    }

    /// Remove every entry at least `threshold_days` old, in one call.
    ///
    /// Age is whole days elapsed between the catalog's insertion time and `now`.
    /// Returns the number of tracks removed.
    pub async fn evict(&self, now: DateTime<Utc>, threshold_days: i64) -> usize {
        let Some(entries) = self.entries().await else {
            warn!(
                "Could not read playlist {} for eviction",
                self.playlist_id
            );
            return 0;
        };

        let mut seen = HashSet::new();
        let stale: Vec<String> = entries
            .into_iter()
            .filter(|entry| {
                entry
                    .added_at
                    .is_some_and(|added_at| (now - added_at).num_days() >= threshold_days)
            })
            .map(|entry| entry.track_id)
            .filter(|id| seen.insert(id.clone()))
            .collect();

        if stale.is_empty() {
            info!("No tracks older than {} days", threshold_days);
            return 0;
        }

        if self
            .catalog
            .remove_from_playlist(&self.playlist_id, &stale)
            .await
        {
            info!(
                "Removed {} tracks older than {} days",
                stale.len(),
                threshold_days
            );
            stale.len()
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MockCatalogService, PlaylistItem, RunPolicy, TrackRef};
    use crate::curation::models::DiscoverySource;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use std::sync::{Arc, Mutex};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 9, 30, 0).unwrap()
    }

    fn aged(track_id: &str, artist_id: &str, days: i64) -> PlaylistItem {
        PlaylistItem {
            track: Some(TrackRef {
                id: Some(track_id.to_string()),
                name: track_id.to_string(),
                artists: vec![ArtistRef {
                    id: artist_id.to_string(),
                    name: format!("Name {}", artist_id),
                }],
            }),
            added_at: Some(now() - ChronoDuration::days(days) - ChronoDuration::hours(1)),
        }
    }

    /// Catalog whose playlist honours removals.
    fn live_playlist(items: Vec<PlaylistItem>) -> (PacedCatalog, Arc<Mutex<Vec<PlaylistItem>>>) {
        let playlist = Arc::new(Mutex::new(items));
        let mut mock = MockCatalogService::new();

        let reader = playlist.clone();
        mock.expect_playlist_items()
            .returning(move |_| Ok(reader.lock().unwrap().clone()));
        let writer = playlist.clone();
        mock.expect_remove_from_playlist()
            .returning(move |_, ids| {
                writer.lock().unwrap().retain(|item| {
                    let id = item.track.as_ref().and_then(|t| t.id.clone());
                    !id.is_some_and(|id| ids.contains(&id))
                });
                Ok(())
            });

        (
            PacedCatalog::new(Arc::new(mock), RunPolicy::immediate()),
            playlist,
        )
    }

    #[tokio::test]
    async fn test_evicts_items_at_or_past_threshold() {
        let (catalog, playlist) = live_playlist(vec![
            aged("t3", "a", 3),
            aged("t8", "b", 8),
            aged("t9", "c", 9),
            aged("t20", "d", 20),
        ]);
        let maintainer = PlaylistMaintainer::new(&catalog, "out");

        assert_eq!(maintainer.evict(now(), 8).await, 3);

        let left = playlist.lock().unwrap().clone();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].track.as_ref().unwrap().id.as_deref(), Some("t3"));
    }

    #[tokio::test]
    async fn test_second_eviction_removes_nothing() {
        let (catalog, _) = live_playlist(vec![aged("t1", "a", 1), aged("t10", "b", 10)]);
        let maintainer = PlaylistMaintainer::new(&catalog, "out");

        assert_eq!(maintainer.evict(now(), 8).await, 1);
        assert_eq!(maintainer.evict(now(), 8).await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_stale_track_is_removed_once() {
        let mut mock = MockCatalogService::new();
        mock.expect_playlist_items()
            .returning(|_| Ok(vec![aged("dup", "a", 12), aged("dup", "a", 30)]));
        mock.expect_remove_from_playlist()
            .times(1)
            .returning(|_, ids| {
                assert_eq!(ids, ["dup".to_string()]);
                Ok(())
            });
        let catalog = PacedCatalog::new(Arc::new(mock), RunPolicy::immediate());

        let maintainer = PlaylistMaintainer::new(&catalog, "out");
        assert_eq!(maintainer.evict(now(), 8).await, 1);
    }

    #[tokio::test]
    async fn test_unreadable_playlist_evicts_nothing() {
        let mut mock = MockCatalogService::new();
        mock.expect_playlist_items()
            .returning(|id| Err(crate::catalog::CatalogError::NotFound(id.to_string())));
        mock.expect_remove_from_playlist().never();
        let catalog = PacedCatalog::new(Arc::new(mock), RunPolicy::immediate());

        let maintainer = PlaylistMaintainer::new(&catalog, "gone");
        assert_eq!(maintainer.evict(now(), 8).await, 0);
        assert!(maintainer.load_represented().await.is_none());
    }

    #[tokio::test]
    async fn test_insert_updates_represented() {
        let mut mock = MockCatalogService::new();
        mock.expect_add_to_playlist()
            .times(1)
            .returning(|playlist, ids| {
                assert_eq!(playlist, "out");
                assert_eq!(ids, ["t1".to_string()]);
                Ok(())
            });
        mock.expect_playlist_items()
            .returning(|_| Ok(vec![aged("old", "a0", 2)]));
        let catalog = PacedCatalog::new(Arc::new(mock), RunPolicy::immediate());
        let maintainer = PlaylistMaintainer::new(&catalog, "out");

        let mut represented = maintainer.load_represented().await.unwrap();
        assert_eq!(represented.len(), 1);

        let candidate = CandidateTrack {
            track_id: "t1".to_string(),
            name: "New".to_string(),
            artist_id: "a1".to_string(),
            artist_name: "Newcomer".to_string(),
            source: DiscoverySource::RelatedArtist {
                seed: "Seed".to_string(),
            },
        };
        assert!(maintainer.insert(&candidate, &mut represented).await);
        assert_eq!(represented.len(), 2);
        assert!(represented.contains(&ArtistRef {
            id: "other".to_string(),
            name: "NEWCOMER".to_string(),
        }));
    }
}
