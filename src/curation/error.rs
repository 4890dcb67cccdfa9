use thiserror::Error;

/// Failures that end the selection phase of a run early.
///
/// Eviction and reporting still run after any of these.
#[derive(Debug, Error)]
pub enum CurationError {
    #[error("affinity store unavailable: {0}")]
    AffinityStore(#[source] anyhow::Error),

    #[error("could not read output playlist {0}")]
    PlaylistUnreadable(String),

    #[error("could not resolve the catalog user id")]
    UnknownUser,

    #[error("selection aborted: {0}")]
    Panicked(String),
}
