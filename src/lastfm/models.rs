use chrono::{DateTime, Utc};

/// One entry of a listener's recent-plays feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scrobble {
    pub artist_name: String,
    pub track_name: String,
    /// Absent for the "now playing" placeholder.
    pub played_at: Option<DateTime<Utc>>,
    pub now_playing: bool,
}

/// A page of the recent-plays feed, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentPlaysPage {
    pub plays: Vec<Scrobble>,
    pub total_pages: u32,
}
