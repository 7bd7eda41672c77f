#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use super::{StateStore, StorageError};
use crate::record_key::RecordKey;

/// In-memory state store for testing and simulation.
///
/// Keys by [`RecordKey`] exactly like the durable store, so isolation and
/// overwrite semantics match. State is wrapped in `Arc<Mutex<>>`; clones
/// share records. `update` holds the lock across the caller's closure,
/// which makes it atomic with respect to every other operation.
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<Mutex<HashMap<RecordKey, Vec<u8>>>>,
}

impl MemoryStateStore {
    /// Create a new empty `MemoryStateStore`
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a record exists under this exact key.
    ///
    /// Useful for asserting on digests in tests.
    pub fn contains_key(&self, key: &RecordKey) -> Result<bool, StorageError> {
        Ok(self.lock()?.contains_key(key))
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<RecordKey, Vec<u8>>>, StorageError> {
        self.inner.lock().map_err(|_| StorageError::Io("state store mutex poisoned".to_string()))
    }
}

impl StateStore for MemoryStateStore {
    fn retrieve(&self, identifier: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.lock()?.get(&RecordKey::derive(identifier)).cloned())
    }

    fn store(&self, identifier: &str, blob: &[u8]) -> Result<(), StorageError> {
        if blob.is_empty() {
            return Err(StorageError::EmptyRecord);
        }

        self.lock()?.insert(RecordKey::derive(identifier), blob.to_vec());
        Ok(())
    }

    fn delete(&self, identifier: &str) -> Result<(), StorageError> {
        self.lock()?.remove(&RecordKey::derive(identifier));
        Ok(())
    }

    fn update<T, E, F>(&self, identifier: &str, f: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce(Option<Vec<u8>>) -> Result<(Vec<u8>, T), E>,
    {
        let key = RecordKey::derive(identifier);
        let mut records = self.lock()?;

        let (blob, output) = f(records.get(&key).cloned())?;
        if blob.is_empty() {
            return Err(StorageError::EmptyRecord.into());
        }

        records.insert(key, blob);
        Ok(output)
    }

    fn count(&self) -> Result<usize, StorageError> {
        Ok(self.lock()?.len())
    }
}
