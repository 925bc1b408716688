//! SQLite artifact backend.
//!
//! This module handles opening the SQLite database, applying required pragmas
//! for concurrency (WAL mode), running migrations, and serving artifact
//! pairs from the `artifacts` table.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};

use super::backend::ArtifactBackend;
use super::hash::is_valid_key;
use super::migrations;
use crate::Error;

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Cache database handle.
///
/// The connection is shared behind a mutex; each call holds it for a single
/// statement.
#[derive(Debug)]
pub struct ArtifactDb {
    conn: Mutex<Connection>,
}

impl ArtifactDb {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// and runs any pending migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory database for testing.
    pub fn open_in_memory() -> Result<Self, Error> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, Error> {
        conn.execute_batch(PRAGMAS)?;
        migrations::run(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn select(&self, key: &str, column: &str) -> Result<Option<String>, Error> {
        if !is_valid_key(key) {
            return Err(Error::InvalidHash);
        }
        let sql = format!("SELECT {column} FROM artifacts WHERE key = ?1");
        let value = self
            .conn()
            .query_row(&sql, params![key], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(value)
    }

    /// Number of stored artifact pairs.
    pub fn count(&self) -> Result<u64, Error> {
        let count: i64 = self.conn().query_row("SELECT COUNT(*) FROM artifacts", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl ArtifactBackend for ArtifactDb {
    fn get(&self, key: &str) -> Result<Option<String>, Error> {
        self.select(key, "compacted")
    }

    fn get_raw(&self, key: &str) -> Result<Option<String>, Error> {
        self.select(key, "raw")
    }

    fn put(&self, key: &str, raw: &str, compacted: &str) -> Result<(), Error> {
        if !is_valid_key(key) {
            return Err(Error::InvalidHash);
        }
        self.conn().execute(
            "INSERT INTO artifacts (key, raw, compacted, written_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                raw = excluded.raw,
                compacted = excluded.compacted,
                written_at = excluded.written_at",
            params![key, raw, compacted, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
