//! Discovery of playlists an artist authored, by driving a headless browser.

mod gate;
mod noop;
mod trait_def;
mod webdriver;

pub use gate::BrowserGate;
pub use noop::NoopScraper;
pub use trait_def::{PlaylistScraper, ScrapedPlaylist, ScraperError};
pub use webdriver::{WebDriverScraper, WebDriverSettings};

#[cfg(any(test, feature = "mock"))]
pub use trait_def::MockPlaylistScraper;
