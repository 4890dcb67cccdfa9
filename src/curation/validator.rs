//! Acceptance rules for a candidate track.

use std::collections::HashMap;
use std::time::Duration;

use super::models::{AffinityMap, ArtistStat, RejectReason, RepresentedArtists, Verdict};
use crate::catalog::{ArtistRef, PacedCatalog, TrackRef};

pub struct TrackValidator<'a> {
    catalog: &'a PacedCatalog,
    stats: &'a AffinityMap,
    // Secondary lookup; two artists sharing a display name collide here.
    by_name: HashMap<String, &'a ArtistStat>,
    known_artist_min_likes: u32,
    validation_delay: Duration,
}

impl<'a> TrackValidator<'a> {
    pub fn new(
        catalog: &'a PacedCatalog,
        stats: &'a AffinityMap,
        known_artist_min_likes: u32,
        validation_delay: Duration,
    ) -> Self {
        let mut by_name = HashMap::new();
        for stat in stats.values() {
            by_name.entry(stat.name.to_lowercase()).or_insert(stat);
        }

        Self {
            catalog,
            stats,
            by_name,
            known_artist_min_likes,
            validation_delay,
        }
    }

    /// Stats for an artist, matched by id first and then by name.
    pub fn lookup(&self, artist: &ArtistRef) -> Option<&'a ArtistStat> {
        self.stats
            .get(&artist.id)
            .or_else(|| self.by_name.get(&artist.name.to_lowercase()).copied())
    }

    /// Check a track against the rules, in order.
    ///
    /// The follower lookup only happens when `follower_cap` is given. A failed
    /// lookup does not reject the track.
    pub async fn validate(
        &self,
        track: &TrackRef,
        represented: &RepresentedArtists,
        follower_cap: Option<u64>,
    ) -> Verdict {
        let Some(artist) = track.primary_artist() else {
            return Verdict::Reject(RejectReason::NoArtists);
        };

        if let Some(stat) = self.lookup(artist) {
            if stat.total_liked >= self.known_artist_min_likes {
                return Verdict::Reject(RejectReason::KnownArtist {
                    total_liked: stat.total_liked,
                });
            }
        }

        if represented.contains(artist) {
            return Verdict::Reject(RejectReason::AlreadyRepresented);
        }

        if let Some(cap) = follower_cap {
            if !self.validation_delay.is_zero() {
                tokio::time::sleep(self.validation_delay).await;
            }
            if let Some(profile) = self.catalog.artist(&artist.id).await {
                if profile.followers > cap {
                    return Verdict::Reject(RejectReason::TooPopular {
                        followers: profile.followers,
                        cap,
                    });
                }
            }
        }

        Verdict::Accept
    }
}
