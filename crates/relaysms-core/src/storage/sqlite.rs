//! SQLite-backed durable state store.
//!
//! One table, one row per correspondent:
//!
//! ```sql
//! CREATE TABLE state (id TEXT PRIMARY KEY, data BLOB NOT NULL)
//! ```
//!
//! A fresh connection is opened per operation so the store is trivially
//! `Clone + Send + Sync`, and separate processes coordinate through SQLite's
//! own file locking.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use tracing::{debug, trace};

use super::{StateStore, StorageError};
use crate::{config::StorageConfig, record_key::RecordKey};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS state (
    id TEXT PRIMARY KEY,
    data BLOB NOT NULL
);";

const SELECT: &str = "SELECT data FROM state WHERE id = ?1";
const UPSERT: &str = "INSERT OR REPLACE INTO state (id, data) VALUES (?1, ?2)";
const DELETE: &str = "DELETE FROM state WHERE id = ?1";
const COUNT: &str = "SELECT COUNT(*) FROM state";

/// Durable state store backed by a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteStateStore {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteStateStore {
    /// Open or create the state database described by `config`.
    ///
    /// Creates the base directory and the `state` table if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the directory cannot be created or the
    /// database cannot be opened or initialized.
    pub fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.base_dir)?;

        let store = Self { path: config.state_db_path(), busy_timeout: config.busy_timeout };

        let conn = store.connect()?;
        conn.execute_batch(CREATE_TABLE)?;

        debug!(path = %store.path.display(), "opened state store");
        Ok(store)
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, StorageError> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }
}

impl StateStore for SqliteStateStore {
    fn retrieve(&self, identifier: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let key = RecordKey::derive(identifier);
        let conn = self.connect()?;

        let blob = conn
            .query_row(SELECT, params![key.as_str()], |row| row.get::<_, Vec<u8>>(0))
            .optional()?;

        trace!(record = key.short(), found = blob.is_some(), "retrieve");
        Ok(blob)
    }

    fn store(&self, identifier: &str, blob: &[u8]) -> Result<(), StorageError> {
        if blob.is_empty() {
            return Err(StorageError::EmptyRecord);
        }

        let key = RecordKey::derive(identifier);
        let conn = self.connect()?;
        conn.execute(UPSERT, params![key.as_str(), blob])?;

        trace!(record = key.short(), len = blob.len(), "store");
        Ok(())
    }

    fn delete(&self, identifier: &str) -> Result<(), StorageError> {
        let key = RecordKey::derive(identifier);
        let conn = self.connect()?;
        let removed = conn.execute(DELETE, params![key.as_str()])?;

        debug!(record = key.short(), removed, "delete");
        Ok(())
    }

    fn update<T, E, F>(&self, identifier: &str, f: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce(Option<Vec<u8>>) -> Result<(Vec<u8>, T), E>,
    {
        let key = RecordKey::derive(identifier);
        let mut conn = self.connect()?;

        // IMMEDIATE takes the write lock up front, so two processes updating
        // the same record serialize instead of both reading the old blob.
        let txn = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StorageError::from)?;

        let prior = txn
            .query_row(SELECT, params![key.as_str()], |row| row.get::<_, Vec<u8>>(0))
            .optional()
            .map_err(StorageError::from)?;

        let (blob, output) = f(prior)?;
        if blob.is_empty() {
            return Err(StorageError::EmptyRecord.into());
        }

        txn.execute(UPSERT, params![key.as_str(), blob]).map_err(StorageError::from)?;
        txn.commit().map_err(StorageError::from)?;

        trace!(record = key.short(), len = blob.len(), "update committed");
        Ok(output)
    }

    fn count(&self) -> Result<usize, StorageError> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row(COUNT, [], |row| row.get(0))?;
        usize::try_from(count).map_err(|e| StorageError::Io(e.to_string()))
    }
}
