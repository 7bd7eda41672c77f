//! Storage error types.
//!
//! Defines errors that can occur during state store operations:
//! - `EmptyRecord`: Refused to persist an empty session blob
//! - `Busy`: Database locked by another writer past the busy timeout
//! - `Io`: Underlying storage system errors

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Attempted to persist an empty blob
    ///
    /// An empty-but-present record would be read back as "session exists"
    /// and then fail to deserialize, so it is never written.
    #[error("refusing to store an empty session record")]
    EmptyRecord,

    /// Database is locked by another connection
    ///
    /// Another process held the write lock longer than the configured busy
    /// timeout.
    #[error("storage busy: {0}")]
    Busy(String),

    /// I/O error (file system, database, etc.)
    #[error("I/O error: {0}")]
    Io(String),
}

impl StorageError {
    /// Returns true if the operation may succeed if attempted again later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Busy(_))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked) => {
                StorageError::Busy(err.to_string())
            },
            _ => StorageError::Io(err.to_string()),
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}
