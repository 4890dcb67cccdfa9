//! Playlist curation engine.
//!
//! A run scores the listener's artists ([`aggregator`]), draws them by weighted
//! lottery ([`sampler`]), looks for one new track per drawn artist
//! ([`resolver`], [`validator`]) and keeps the output playlist tidy
//! ([`maintainer`]). [`CurationRun`] ties it all together.

pub mod aggregator;
mod error;
pub mod maintainer;
mod models;
mod orchestrator;
pub mod resolver;
pub mod sampler;
mod services;
mod settings;
pub mod validator;

pub use aggregator::{apply_plays, AffinityAggregator, PlayMap};
pub use error::CurationError;
pub use maintainer::PlaylistMaintainer;
pub use models::{
    AffinityMap, ArtistStat, CandidateTrack, DiscoverySource, PlaylistEntry, RejectReason,
    RepresentedArtists, RunPhase, RunSummary, Verdict,
};
pub use orchestrator::{CurationRequest, CurationRun};
pub use resolver::CandidateResolver;
pub use sampler::{artist_weight, LotteryTicket, WeightedLottery};
pub use services::RunServices;
pub use settings::{CurationSettings, DiscoverySettings};
pub use validator::TrackValidator;
