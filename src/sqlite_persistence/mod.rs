mod versioned_schema;

pub use versioned_schema::{Column, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};

/// Offset added to schema versions before they are written to `PRAGMA user_version`,
/// so a fresh SQLite file (user_version 0) is never mistaken for schema version 0.
pub const BASE_DB_VERSION: usize = 30000;
