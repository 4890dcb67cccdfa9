//! Listening-affinity aggregation.
//!
//! Merges liked-track counts from the affinity store with play counts from the
//! listening-history feed into one [`ArtistStat`] per artist.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tracing::{debug, info, warn};

use super::error::CurationError;
use super::models::{AffinityMap, ArtistStat};
use super::settings::CurationSettings;
use crate::affinity_store::AffinityStore;
use crate::catalog::PacedCatalog;
use crate::lastfm::ListeningHistory;

/// Play timestamps keyed by lower-cased artist name.
pub type PlayMap = HashMap<String, Vec<DateTime<Utc>>>;

pub struct AffinityAggregator<'a> {
    catalog: &'a PacedCatalog,
    store: Arc<dyn AffinityStore>,
    history: &'a dyn ListeningHistory,
    settings: &'a CurationSettings,
}

impl<'a> AffinityAggregator<'a> {
    pub fn new(
        catalog: &'a PacedCatalog,
        store: Arc<dyn AffinityStore>,
        history: &'a dyn ListeningHistory,
        settings: &'a CurationSettings,
    ) -> Self {
        Self {
            catalog,
            store,
            history,
            settings,
        }
    }

    /// Compute per-artist stats for a user.
    ///
    /// `listener` is the listening-history account; without one every artist
    /// ends up with zero plays.
    pub async fn compute(
        &self,
        user_id: &str,
        listener: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<AffinityMap, CurationError> {
        let scanned = self.sync_likes(user_id).await?;

        let mut stats: AffinityMap = match self.store.get_user_artists(user_id) {
            Ok(rows) => rows
                .into_iter()
                .map(|row| {
                    let stat = ArtistStat::new(&row.artist_id, &row.artist_name, row.total_liked);
                    (row.artist_id, stat)
                })
                .collect(),
            Err(e) => {
                warn!("Failed to read liked artists, using this scan only: {:#}", e);
                AffinityMap::new()
            }
        };
        // Artists the store did not return still count with this scan's numbers.
        for (artist_id, (name, count)) in scanned {
            stats
                .entry(artist_id.clone())
                .or_insert_with(|| ArtistStat::new(&artist_id, &name, count));
        }

        let plays = match listener {
            Some(listener) => self.fetch_play_map(listener, now).await,
            None => {
                warn!("No listening-history account, every artist has zero plays");
                PlayMap::new()
            }
        };
        apply_plays(&mut stats, &plays, now);

        let drawable = stats.values().filter(|s| s.scrobbles > 0).count();
        info!(
            "Affinity computed: {} artists, {} with recent plays",
            stats.len(),
            drawable
        );
        Ok(stats)
    }

    /// Scan liked tracks and bump the stored counts.
    ///
    /// A first-time user gets a full backfill, a returning user only the most
    /// recent likes. The user is registered only once a backfill reaches the
    /// end of the library, so an interrupted one is retried on the next run.
    /// Returns the counts seen during this scan.
    async fn sync_likes(
        &self,
        user_id: &str,
    ) -> Result<HashMap<String, (String, u32)>, CurationError> {
        let known = self
            .store
            .user_exists(user_id)
            .map_err(CurationError::AffinityStore)?;
        let limit = known.then_some(self.settings.liked_rescan_limit);
        let batch = self.settings.liked_batch_size.max(1);

        let mut counts: HashMap<String, (String, u32)> = HashMap::new();
        let mut offset = 0;
        let mut processed = 0;
        let mut complete = false;

        loop {
            let page_size = match limit {
                Some(limit) if processed >= limit => {
                    complete = true;
                    break;
                }
                Some(limit) => batch.min(limit - processed),
                None => batch,
            };

            let Some(page) = self.catalog.saved_tracks(page_size, offset).await else {
                warn!(
                    "Liked-track scan for user {} interrupted at offset {}",
                    user_id, offset
                );
                break;
            };
            let scanned = page.scanned;

            for saved in page.tracks {
                for artist in &saved.track.artists {
                    if let Err(e) = self.store.increment_liked(user_id, &artist.id, &artist.name) {
                        warn!("Failed to update liked count for {}: {:#}", artist.name, e);
                        continue;
                    }
                    counts
                        .entry(artist.id.clone())
                        .or_insert_with(|| (artist.name.clone(), 0))
                        .1 += 1;
                }
            }

            processed += scanned;
            offset += scanned;
            if !page.has_more || scanned == 0 || scanned < page_size {
                complete = true;
                break;
            }
        }

        if !known && complete {
            if let Err(e) = self.store.register_user(user_id) {
                warn!("Failed to register user {}: {:#}", user_id, e);
            }
        }

        info!(
            "Scanned {} liked tracks for user {} ({})",
            processed,
            user_id,
            if known { "rescan" } else { "backfill" }
        );
        Ok(counts)
    }

    /// Walk the recent-plays feed back to the history window.
    async fn fetch_play_map(&self, listener: &str, now: DateTime<Utc>) -> PlayMap {
        let cutoff = now - ChronoDuration::days(self.settings.history_window_days);
        let mut plays = PlayMap::new();
        let mut total_pages: Option<u32> = None;
        let mut page = 1;

        loop {
            if !self.settings.history_page_delay.is_zero() {
                tokio::time::sleep(self.settings.history_page_delay).await;
            }

            match self.history.recent_plays_page(listener, page).await {
                Ok(result) => {
                    total_pages = Some(result.total_pages);
                    if result.plays.is_empty() {
                        break;
                    }

                    let mut reached_cutoff = false;
                    for play in result.plays {
                        if play.now_playing {
                            continue;
                        }
                        let Some(played_at) = play.played_at else {
                            continue;
                        };
                        if played_at < cutoff {
                            reached_cutoff = true;
                            continue;
                        }
                        plays
                            .entry(play.artist_name.to_lowercase())
                            .or_default()
                            .push(played_at);
                    }
                    // The feed is most-recent-first, nothing older is useful.
                    if reached_cutoff {
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to fetch history page {}: {}", page, e);
                    if total_pages.is_none() {
                        break;
                    }
                }
            }

            if total_pages.is_some_and(|total| page >= total) {
                break;
            }
            page += 1;
        }

        debug!("History pull covered {} pages, {} artists", page, plays.len());
        plays
    }
}

/// Fill in recent play counts from the play map.
pub fn apply_plays(stats: &mut AffinityMap, plays: &PlayMap, now: DateTime<Utc>) {
    let cutoff_14 = now - ChronoDuration::days(14);
    let cutoff_60 = now - ChronoDuration::days(60);

    for stat in stats.values_mut() {
        let Some(timestamps) = plays.get(&stat.name.to_lowercase()) else {
            continue;
        };
        stat.scrobbles = timestamps.len() as u32;
        stat.recent_14 = timestamps.iter().filter(|t| **t >= cutoff_14).count() as u32;
        stat.recent_60 = timestamps.iter().filter(|t| **t >= cutoff_60).count() as u32;
    }
}
