//! Run-scoped data of the curation engine.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::catalog::ArtistRef;

/// Per-artist affinity for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistStat {
    pub artist_id: String,
    pub name: String,
    /// Liked tracks crediting this artist, as recorded in the affinity store.
    pub total_liked: u32,
    pub recent_14: u32,
    pub recent_60: u32,
    /// Plays inside the history window of this pull. Zero means not drawable.
    pub scrobbles: u32,
}

impl ArtistStat {
    pub fn new(artist_id: &str, name: &str, total_liked: u32) -> Self {
        Self {
            artist_id: artist_id.to_string(),
            name: name.to_string(),
            total_liked,
            recent_14: 0,
            recent_60: 0,
            scrobbles: 0,
        }
    }
}

/// Artist stats keyed by artist id.
pub type AffinityMap = BTreeMap<String, ArtistStat>;

/// Which discovery strategy produced a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiscoverySource {
    ScrapedPlaylist { playlist: String },
    SearchedPlaylist { playlist: String },
    SimilarArtist { seed: String },
    RelatedArtist { seed: String },
}

impl fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoverySource::ScrapedPlaylist { playlist } => {
                write!(f, "{} (artist-made playlist)", playlist)
            }
            DiscoverySource::SearchedPlaylist { playlist } => {
                write!(f, "{} (searched playlist)", playlist)
            }
            DiscoverySource::SimilarArtist { seed } => write!(f, "similar to {}", seed),
            DiscoverySource::RelatedArtist { seed } => write!(f, "related to {}", seed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateTrack {
    pub track_id: String,
    pub name: String,
    pub artist_id: String,
    pub artist_name: String,
    pub source: DiscoverySource,
}

/// A track currently in the output playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub track_id: String,
    pub artist_id: Option<String>,
    /// Insertion time as recorded by the catalog.
    pub added_at: Option<DateTime<Utc>>,
}

/// Artists that already have a track in the output playlist.
///
/// Holds ids and lower-cased names; a candidate matching either is a duplicate.
#[derive(Debug, Clone, Default)]
pub struct RepresentedArtists {
    ids: HashSet<String>,
    names: HashSet<String>,
}

impl RepresentedArtists {
    pub fn insert(&mut self, artist: &ArtistRef) {
        self.ids.insert(artist.id.clone());
        self.names.insert(artist.name.to_lowercase());
    }

    pub fn contains(&self, artist: &ArtistRef) -> bool {
        self.ids.contains(&artist.id) || self.names.contains(&artist.name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    NoArtists,
    KnownArtist { total_liked: u32 },
    AlreadyRepresented,
    TooPopular { followers: u64, cap: u64 },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NoArtists => write!(f, "track has no artists"),
            RejectReason::KnownArtist { total_liked } => {
                write!(f, "artist already known ({} liked tracks)", total_liked)
            }
            RejectReason::AlreadyRepresented => write!(f, "artist already in playlist"),
            RejectReason::TooPopular { followers, cap } => {
                write!(f, "{} followers exceeds cap of {}", followers, cap)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(RejectReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

/// Phases of a curation run, in order.
///
/// `Resolving` then `Inserted` or `Skipped` repeat once per drawn artist.
/// Validation happens inside resolving, one candidate at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Start,
    AffinityComputed,
    LotteryReady,
    Resolving,
    Inserted,
    Skipped,
    Evicting,
    Reporting,
    Done,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Start => "start",
            RunPhase::AffinityComputed => "affinity_computed",
            RunPhase::LotteryReady => "lottery_ready",
            RunPhase::Resolving => "resolving",
            RunPhase::Inserted => "inserted",
            RunPhase::Skipped => "skipped",
            RunPhase::Evicting => "evicting",
            RunPhase::Reporting => "reporting",
            RunPhase::Done => "done",
        }
    }

    /// Phase closing one drawn artist.
    pub fn artist_outcome(inserted: bool) -> Self {
        if inserted {
            RunPhase::Inserted
        } else {
            RunPhase::Skipped
        }
    }
}

/// Outcome of one curation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub playlist_id: String,
    pub songs_added: usize,
    pub target: usize,
    pub evicted: usize,
    pub eviction_days: i64,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        self.songs_added >= self.target
    }

    /// Text sent to the listener.
    pub fn message(&self, date: DateTime<Utc>) -> String {
        let status = if self.is_complete() {
            "Playlist successfully updated"
        } else {
            "Playlist not fully updated"
        };
        format!(
            "Playlist Update Summary ({})\n\nSongs added: {}/{}\nOld tracks removed (>={} days old): {}\n{}",
            date.format("%m/%d/%Y"),
            self.songs_added,
            self.target,
            self.eviction_days,
            self.evicted,
            status
        )
    }
}
