//! SQLite schema definitions for the affinity database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};

/// Users whose liked history has been backfilled at least once.
const CURATED_USERS_TABLE: Table = Table {
    name: "curated_users",
    columns: &[
        sqlite_column!("user_id", &SqlType::Text, is_primary_key = true),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[],
};

/// Per-user liked-track counts by artist.
const USER_ARTISTS_TABLE: Table = Table {
    name: "user_artists",
    columns: &[
        sqlite_column!("user_id", &SqlType::Text, non_null = true),
        sqlite_column!("artist_id", &SqlType::Text, non_null = true),
        sqlite_column!("artist_name", &SqlType::Text, non_null = true),
        sqlite_column!("total_liked", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "updated_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_user_artists_user", "user_id")],
    unique_constraints: &[&["user_id", "artist_id"]],
};

pub const AFFINITY_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[CURATED_USERS_TABLE, USER_ARTISTS_TABLE],
    migration: None,
}];
