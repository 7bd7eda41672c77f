//! Redb-backed record of generated ratchet public keys.
//!
//! This is the primitive's private bookkeeping file (`ratchet.db` next to
//! the session database). The session layer never reads it; it only deletes
//! it before bootstrapping a new session.
//!
//! Only public keys are recorded. Ratchet secrets live in the session state
//! alone, so they are gone once a DH ratchet step replaces them.

use std::path::Path;

use redb::{Database, TableDefinition};

use crate::{error::RatchetError, state::KEY_SIZE};

/// Table: ratchet_keys
/// Key: X25519 public key [32 bytes]
/// Value: none
const RATCHET_KEYS: TableDefinition<&[u8], ()> = TableDefinition::new("ratchet_keys");

/// Durable set of ratchet public keys backed by Redb.
pub struct Keystore {
    db: Database,
}

impl Keystore {
    /// Open or create a keystore at the given path.
    ///
    /// # Errors
    ///
    /// Returns `RatchetError::Keystore` if the database cannot be opened or
    /// created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RatchetError> {
        let db =
            Database::create(path.as_ref()).map_err(|e| RatchetError::Keystore(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| RatchetError::Keystore(e.to_string()))?;
        {
            let _ =
                txn.open_table(RATCHET_KEYS).map_err(|e| RatchetError::Keystore(e.to_string()))?;
        }
        txn.commit().map_err(|e| RatchetError::Keystore(e.to_string()))?;

        Ok(Self { db })
    }

    /// Record a generated ratchet public key. Idempotent.
    pub fn record(&self, public: &[u8; KEY_SIZE]) -> Result<(), RatchetError> {
        let txn = self.db.begin_write().map_err(|e| RatchetError::Keystore(e.to_string()))?;
        {
            let mut table =
                txn.open_table(RATCHET_KEYS).map_err(|e| RatchetError::Keystore(e.to_string()))?;
            table
                .insert(public.as_slice(), ())
                .map_err(|e| RatchetError::Keystore(e.to_string()))?;
        }
        txn.commit().map_err(|e| RatchetError::Keystore(e.to_string()))?;

        Ok(())
    }

    /// Whether `public` was recorded.
    pub fn contains(&self, public: &[u8; KEY_SIZE]) -> Result<bool, RatchetError> {
        let txn = self.db.begin_read().map_err(|e| RatchetError::Keystore(e.to_string()))?;
        let table =
            txn.open_table(RATCHET_KEYS).map_err(|e| RatchetError::Keystore(e.to_string()))?;

        let found =
            table.get(public.as_slice()).map_err(|e| RatchetError::Keystore(e.to_string()))?;
        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn record_and_contains() {
        let dir = tempdir().unwrap();
        let keystore = Keystore::open(dir.path().join("ratchet.db")).unwrap();

        keystore.record(&[1u8; 32]).unwrap();
        keystore.record(&[1u8; 32]).unwrap();
        assert!(keystore.contains(&[1u8; 32]).unwrap());
    }

    #[test]
    fn unknown_key_is_absent() {
        let dir = tempdir().unwrap();
        let keystore = Keystore::open(dir.path().join("ratchet.db")).unwrap();

        assert!(!keystore.contains(&[9u8; 32]).unwrap());
    }

    #[test]
    fn keys_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ratchet.db");

        {
            let keystore = Keystore::open(&path).unwrap();
            keystore.record(&[1u8; 32]).unwrap();
        }

        let keystore = Keystore::open(&path).unwrap();
        assert!(keystore.contains(&[1u8; 32]).unwrap());
    }
}
