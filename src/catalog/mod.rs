//! Music catalog access.
//!
//! The catalog is the streaming service that owns tracks, artists and the output
//! playlist. Everything goes through [`CatalogService`]; [`PacedCatalog`] adds the
//! per-run call pacing and error policy on top of it.

mod client;
mod error;
mod models;
mod paced;
mod trait_def;

pub use client::{SpotifyCatalogClient, SPOTIFY_API_BASE};
pub use error::CatalogError;
pub use models::{
    ArtistProfile, ArtistRef, PlaylistItem, PlaylistRef, SavedTrack, SavedTracksPage, TrackRef,
};
pub use paced::{PacedCatalog, RunPolicy};
pub use trait_def::CatalogService;

#[cfg(any(test, feature = "mock"))]
pub use trait_def::MockCatalogService;
