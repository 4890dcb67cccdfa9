//! SQLite-backed affinity store implementation.

use super::models::{AffinityStats, StoredArtistAffinity};
use super::schema::AFFINITY_VERSIONED_SCHEMAS;
use super::trait_def::AffinityStore;
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// SQLite-backed affinity store.
#[derive(Clone)]
pub struct SqliteAffinityStore {
    read_conn: Arc<Mutex<Connection>>,
    write_conn: Arc<Mutex<Connection>>,
}

fn migrate_if_needed(conn: &mut Connection) -> Result<()> {
    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;

    let latest_version = AFFINITY_VERSIONED_SCHEMAS.len() - 1;
    let latest_schema = &AFFINITY_VERSIONED_SCHEMAS[latest_version];

    let table_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
        [],
        |r| r.get(0),
    )?;

    if table_count == 0 {
        info!("Creating affinity db schema at version {}", latest_version);
        latest_schema.create(conn)?;
        return Ok(());
    }

    let mut current_version = if db_version < BASE_DB_VERSION as i64 {
        0
    } else {
        (db_version - BASE_DB_VERSION as i64) as usize
    };

    if current_version < latest_version {
        let tx = conn.transaction()?;
        for schema in AFFINITY_VERSIONED_SCHEMAS.iter().skip(current_version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!(
                    "Migrating affinity db from version {} to {}",
                    current_version, schema.version
                );
                migration_fn(&tx)?;
                current_version = schema.version;
            }
        }
        tx.pragma_update(None, "user_version", BASE_DB_VERSION + current_version)?;
        tx.commit()?;
    }

    latest_schema
        .validate(conn)
        .context("Affinity database schema does not match the expected layout")
}

fn row_to_affinity(row: &Row) -> rusqlite::Result<StoredArtistAffinity> {
    Ok(StoredArtistAffinity {
        user_id: row.get(0)?,
        artist_id: row.get(1)?,
        artist_name: row.get(2)?,
        total_liked: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

impl SqliteAffinityStore {
    /// Open (or create) the affinity database at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path_ref = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path_ref,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open affinity database")?;

        migrate_if_needed(&mut write_conn)?;

        write_conn
            .pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on affinity write connection")?;

        let read_conn = Connection::open_with_flags(
            db_path_ref,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open affinity database for reading")?;

        let stats = Self::count_rows(&read_conn)?;
        info!(
            "Affinity store ready: {} users, {} artist rows",
            stats.users, stats.artist_rows
        );

        Ok(Self {
            read_conn: Arc::new(Mutex::new(read_conn)),
            write_conn: Arc::new(Mutex::new(write_conn)),
        })
    }

    /// In-memory store sharing a single connection, for tests and dry runs.
    pub fn in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migrate_if_needed(&mut conn)?;
        let conn = Arc::new(Mutex::new(conn));
        Ok(Self {
            read_conn: conn.clone(),
            write_conn: conn,
        })
    }

    fn count_rows(conn: &Connection) -> Result<AffinityStats> {
        let users: usize =
            conn.query_row("SELECT COUNT(*) FROM curated_users", [], |r| r.get(0))?;
        let artist_rows: usize =
            conn.query_row("SELECT COUNT(*) FROM user_artists", [], |r| r.get(0))?;
        Ok(AffinityStats { users, artist_rows })
    }

    pub fn stats(&self) -> Result<AffinityStats> {
        let conn = self.read_conn.lock().unwrap();
        Self::count_rows(&conn)
    }
}

impl AffinityStore for SqliteAffinityStore {
    fn user_exists(&self, user_id: &str) -> Result<bool> {
        let conn = self.read_conn.lock().unwrap();
        let exists = conn
            .prepare_cached("SELECT 1 FROM curated_users WHERE user_id = ?1")?
            .query_row(params![user_id], |_| Ok(()))
            .optional()?
            .is_some();
        Ok(exists)
    }

    fn register_user(&self, user_id: &str) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO curated_users (user_id) VALUES (?1)",
            params![user_id],
        )?;
        Ok(())
    }

    fn increment_liked(&self, user_id: &str, artist_id: &str, artist_name: &str) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.prepare_cached(
            "INSERT INTO user_artists (user_id, artist_id, artist_name, total_liked)
             VALUES (?1, ?2, ?3, 1)
             ON CONFLICT (user_id, artist_id) DO UPDATE
             SET total_liked = user_artists.total_liked + 1,
                 artist_name = excluded.artist_name,
                 updated_at = cast(strftime('%s','now') as int)",
        )?
        .execute(params![user_id, artist_id, artist_name])
        .with_context(|| format!("Failed to increment liked count for artist {}", artist_id))?;
        Ok(())
    }

    fn get_artist(&self, user_id: &str, artist_id: &str) -> Result<Option<StoredArtistAffinity>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT user_id, artist_id, artist_name, total_liked, updated_at
             FROM user_artists WHERE user_id = ?1 AND artist_id = ?2",
        )?;
        let result = stmt
            .query_row(params![user_id, artist_id], row_to_affinity)
            .optional()?;
        Ok(result)
    }

    fn get_user_artists(&self, user_id: &str) -> Result<Vec<StoredArtistAffinity>> {
        let conn = self.read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT user_id, artist_id, artist_name, total_liked, updated_at
             FROM user_artists WHERE user_id = ?1 ORDER BY artist_id",
        )?;
        let rows = stmt
            .query_map(params![user_id], row_to_affinity)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_new_database() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("affinity.db");

        let store = SqliteAffinityStore::new(&db_path).unwrap();
        assert!(db_path.exists());

        let stats = store.stats().unwrap();
        assert_eq!(stats.users, 0);
        assert_eq!(stats.artist_rows, 0);
    }

    #[test]
    fn test_reopen_existing_database() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("affinity.db");

        {
            let store = SqliteAffinityStore::new(&db_path).unwrap();
            store.increment_liked("u1", "a1", "Artist One").unwrap();
        }

        let store = SqliteAffinityStore::new(&db_path).unwrap();
        let row = store.get_artist("u1", "a1").unwrap().unwrap();
        assert_eq!(row.total_liked, 1);
    }

    #[test]
    fn test_increment_inserts_then_adds() {
        let store = SqliteAffinityStore::in_memory().unwrap();

        store.increment_liked("u1", "a1", "Old Name").unwrap();
        store.increment_liked("u1", "a1", "New Name").unwrap();
        store.increment_liked("u1", "a1", "New Name").unwrap();

        let row = store.get_artist("u1", "a1").unwrap().unwrap();
        assert_eq!(row.total_liked, 3);
        assert_eq!(row.artist_name, "New Name");
    }

    #[test]
    fn test_rows_are_scoped_per_user() {
        let store = SqliteAffinityStore::in_memory().unwrap();

        store.increment_liked("u1", "a1", "Artist").unwrap();
        store.increment_liked("u2", "a1", "Artist").unwrap();
        store.increment_liked("u2", "a2", "Other").unwrap();

        assert_eq!(store.get_user_artists("u1").unwrap().len(), 1);
        let u2 = store.get_user_artists("u2").unwrap();
        assert_eq!(u2.len(), 2);
        assert_eq!(u2[0].artist_id, "a1");
        assert_eq!(u2[1].artist_id, "a2");
        assert!(store.get_artist("u1", "a2").unwrap().is_none());
    }

    #[test]
    fn test_register_user_is_idempotent() {
        let store = SqliteAffinityStore::in_memory().unwrap();

        assert!(!store.user_exists("u1").unwrap());
        store.register_user("u1").unwrap();
        store.register_user("u1").unwrap();
        assert!(store.user_exists("u1").unwrap());
        assert_eq!(store.stats().unwrap().users, 1);
    }
}
