mod models;
mod schema;
mod store;
mod trait_def;

pub use models::{AffinityStats, StoredArtistAffinity};
pub use store::SqliteAffinityStore;
pub use trait_def::AffinityStore;

#[cfg(any(test, feature = "mock"))]
pub use trait_def::MockAffinityStore;
