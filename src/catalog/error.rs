//! Catalog error taxonomy.

use reqwest::StatusCode;
use thiserror::Error;

/// Errors reported by catalog calls.
///
/// The curation engine treats `NotFound` as ordinary control flow, pauses on
/// `RateLimited` and logs-and-continues on everything else.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited")]
    RateLimited,

    #[error("transient catalog error: {0}")]
    Transient(String),
}

impl CatalogError {
    /// Map a non-success HTTP status to the taxonomy.
    pub fn from_status(status: StatusCode, context: &str) -> Self {
        match status {
            StatusCode::NOT_FOUND => CatalogError::NotFound(context.to_string()),
            StatusCode::TOO_MANY_REQUESTS => CatalogError::RateLimited,
            other => CatalogError::Transient(format!("{} failed with status {}", context, other)),
        }
    }
}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => CatalogError::from_status(status, "request"),
            None => CatalogError::Transient(e.to_string()),
        }
    }
}
