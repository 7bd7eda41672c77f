//! Session state persistence.
//!
//! Trait-based abstraction over a durable map from correspondent identifier
//! to an opaque serialized session blob. The trait is synchronous; each call
//! runs to completion on the caller's thread.
//!
//! Identifiers never reach the backend directly. Every implementation keys
//! records by [`RecordKey::derive`](crate::RecordKey::derive).

mod chaotic;
mod error;
mod memory;
mod sqlite;

pub use chaotic::ChaoticStateStore;
pub use error::StorageError;
pub use memory::MemoryStateStore;
pub use sqlite::SqliteStateStore;

/// Durable keyed storage for serialized session state.
///
/// Must be Clone (shared by orchestrators and tests), Send + Sync, and
/// synchronous. Clones access the same underlying records.
///
/// # Invariants
///
/// - At most one record per identifier; `store` replaces the prior value
///   entirely (last write wins, no merge)
/// - A present record is never empty (`EmptyRecord` is returned instead of
///   writing one)
/// - Operations on one identifier never read or modify another's record
pub trait StateStore: Clone + Send + Sync + 'static {
    /// Load the blob stored for `identifier`.
    ///
    /// Returns `None` if no record exists. Absence is not an error; it is
    /// how callers tell first use from resume.
    fn retrieve(&self, identifier: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Insert or replace the blob for `identifier`.
    ///
    /// # Invariants
    ///
    /// - Pre: `blob` is non-empty
    /// - Post: a concurrent `retrieve` observes either the old or the new
    ///   blob, never a partial write
    fn store(&self, identifier: &str, blob: &[u8]) -> Result<(), StorageError>;

    /// Remove the record for `identifier`. Idempotent.
    fn delete(&self, identifier: &str) -> Result<(), StorageError>;

    /// Atomic read-modify-write of one record.
    ///
    /// Loads the current blob, hands it to `f`, and persists the blob `f`
    /// returns. No other `update` or `store` for the same identifier can
    /// interleave between the read and the write. If `f` fails, nothing is
    /// written.
    fn update<T, E, F>(&self, identifier: &str, f: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce(Option<Vec<u8>>) -> Result<(Vec<u8>, T), E>;

    /// Total number of stored records.
    fn count(&self) -> Result<usize, StorageError>;
}
