//! Shared constants for end-to-end tests

/// Catalog user owning the output playlist
pub const TEST_USER_ID: &str = "listener-1";

/// Listening-history account of the test user
pub const TEST_LISTENER: &str = "listener_on_lastfm";

/// Output playlist curated by the runs
pub const OUTPUT_PLAYLIST_ID: &str = "rotation";

/// Artist the user listens to a lot, with a single liked track
pub const ARTIST_A_ID: &str = "artist-a";
pub const ARTIST_A_NAME: &str = "Alpha Lights";

/// Artist with many likes but no recent plays
pub const ARTIST_B_ID: &str = "artist-b";
pub const ARTIST_B_NAME: &str = "Beta Waves";

/// Small artist the similarity service considers close to A
pub const ARTIST_G_ID: &str = "artist-g";
pub const ARTIST_G_NAME: &str = "Gamma Fields";
pub const ARTIST_G_TRACK_ID: &str = "track-g-1";

pub const VALID_PHONE: &str = "+15551234567";
