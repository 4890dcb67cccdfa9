//! Rotation Curator Library
//!
//! Keeps a discovery playlist fresh: scores the listener's artists from likes
//! and recent plays, draws a few of them by lottery, finds one new track per
//! drawn artist and prunes entries that have been sitting in the playlist for
//! too long.

pub mod affinity_store;
pub mod catalog;
pub mod config;
pub mod curation;
pub mod lastfm;
pub mod notifications;
pub mod scraper;
pub mod server;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use affinity_store::{AffinityStore, SqliteAffinityStore};
pub use catalog::{CatalogError, CatalogService, PacedCatalog, SpotifyCatalogClient};
pub use curation::{CurationRequest, CurationRun, RunServices, RunSummary};
pub use server::run_server;
