//! SQLite-backed key-value storage.
//!
//! Every row is scoped to a browsing origin (`https://www.youtube.com`), so a
//! single database file holds the ledgers of all watched sites side by side.

use std::path::Path;
use std::time::Duration;

use rusqlite::{params, Connection};

use super::{data_dir, KvStore};
use crate::error::{DatabaseError, Result};

/// How long a writer waits for another process holding the database.
const BUSY_TIMEOUT: Duration = Duration::from_secs(2);

/// SQLite database for origin-scoped key-value state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `<data_dir>/viewbudget.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("viewbudget.db"))
    }

    /// Open the database at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    ///
    /// # Errors
    /// Returns an error if the schema cannot be created.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                origin TEXT NOT NULL,
                key    TEXT NOT NULL,
                value  TEXT NOT NULL,
                PRIMARY KEY (origin, key)
            );",
        )?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, origin: &str, key: &str) -> Result<Option<String>, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM kv WHERE origin = ?1 AND key = ?2")?;
        let result = stmt.query_row(params![origin, key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, origin: &str, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (origin, key, value) VALUES (?1, ?2, ?3)",
            params![origin, key, value],
        )?;
        Ok(())
    }

    /// A [`KvStore`] view restricted to one origin.
    pub fn scoped(&self, origin: &str) -> OriginStore<'_> {
        OriginStore {
            db: self,
            origin: origin.to_string(),
        }
    }
}

/// Borrowed view of [`Database`] bound to a single origin.
pub struct OriginStore<'a> {
    db: &'a Database,
    origin: String,
}

impl KvStore for OriginStore<'_> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.db.kv_get(&self.origin, key)?)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        Ok(self.db.kv_set(&self.origin, key, value)?)
    }
}
