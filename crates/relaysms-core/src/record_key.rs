//! Storage keys derived from correspondent identifiers.

use std::fmt;

use sha2::{Digest, Sha256};

/// Digest of a correspondent identifier, used as the storage key.
///
/// Lowercase hex SHA-256 of the UTF-8 identifier: fixed length,
/// deterministic, and not reversible to the phone number. Equal identifiers
/// always map to equal keys; distinct identifiers collide only with
/// negligible probability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey(String);

impl RecordKey {
    /// Length of every key in characters (hex SHA-256)
    pub const LEN: usize = 64;

    /// Number of characters shown by [`RecordKey::short`]
    const SHORT_LEN: usize = 12;

    /// Derive the key for an identifier.
    pub fn derive(identifier: &str) -> Self {
        let digest = Sha256::digest(identifier.as_bytes());
        let key = hex::encode(digest);

        debug_assert_eq!(key.len(), Self::LEN);
        Self(key)
    }

    /// The full key as stored in the database.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key prefix for log lines.
    pub fn short(&self) -> &str {
        &self.0[..Self::SHORT_LEN]
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
