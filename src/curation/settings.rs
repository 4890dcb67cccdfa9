//! Tunables of a curation run.

use std::time::Duration;

use crate::catalog::RunPolicy;

/// Limits of the four discovery strategies.
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub scraped_follower_cap: u64,
    pub searched_follower_cap: u64,
    pub similar_follower_cap: u64,
    /// Scraped playlists actually sampled per artist.
    pub max_scraped_playlists: usize,
    /// Skip a scraped playlist holding more than this many of the artist's tracks.
    pub scraped_crowding_limit: usize,
    pub searched_crowding_limit: usize,
    pub playlist_search_limit: usize,
    pub searched_playlists_considered: usize,
    pub similar_artists_limit: usize,
    /// Random draws per playlist.
    pub draw_attempts: usize,
    pub max_consecutive_invalid: usize,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            scraped_follower_cap: 80_000,
            searched_follower_cap: 50_000,
            similar_follower_cap: 50_000,
            max_scraped_playlists: 2,
            scraped_crowding_limit: 5,
            searched_crowding_limit: 10,
            playlist_search_limit: 20,
            searched_playlists_considered: 10,
            similar_artists_limit: 10,
            draw_attempts: 20,
            max_consecutive_invalid: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CurationSettings {
    pub target_songs: usize,
    pub eviction_days: i64,
    /// Liked tracks rescanned for a returning user.
    pub liked_rescan_limit: usize,
    pub liked_batch_size: usize,
    pub history_window_days: i64,
    /// Artists with at least this many liked tracks are never picked as discoveries.
    pub known_artist_min_likes: u32,
    /// Artists with strictly more liked tracks than this get the lottery bonus.
    pub bonus_min_likes: u32,
    pub call_delay: Duration,
    pub validation_delay: Duration,
    pub rate_limit_cooldown: Duration,
    pub history_page_delay: Duration,
    pub discovery: DiscoverySettings,
}

impl Default for CurationSettings {
    fn default() -> Self {
        Self {
            target_songs: 50,
            eviction_days: 8,
            liked_rescan_limit: 200,
            liked_batch_size: 50,
            history_window_days: 365,
            known_artist_min_likes: 3,
            bonus_min_likes: 6,
            call_delay: Duration::from_millis(500),
            validation_delay: Duration::from_millis(100),
            rate_limit_cooldown: Duration::from_secs(120),
            history_page_delay: Duration::from_millis(250),
            discovery: DiscoverySettings::default(),
        }
    }
}

impl CurationSettings {
    /// Same limits with every pause set to zero.
    pub fn without_delays(mut self) -> Self {
        self.call_delay = Duration::ZERO;
        self.validation_delay = Duration::ZERO;
        self.rate_limit_cooldown = Duration::ZERO;
        self.history_page_delay = Duration::ZERO;
        self
    }

    pub fn run_policy(&self) -> RunPolicy {
        RunPolicy {
            call_delay: self.call_delay,
            rate_limit_cooldown: self.rate_limit_cooldown,
        }
    }
}
