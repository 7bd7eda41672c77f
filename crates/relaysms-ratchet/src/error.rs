//! Error types for Double Ratchet operations

use thiserror::Error;

/// Errors from ratchet operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RatchetError {
    /// Key material has the wrong length
    #[error("invalid {what} length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Which key was rejected
        what: &'static str,
        /// Expected key length
        expected: usize,
        /// Actual key length
        actual: usize,
    },

    /// Peer public key produced a non-contributory (all-zero) DH output
    #[error("peer public key is a low-order point")]
    NonContributoryKey,

    /// Session has no sending chain yet (responder before first receive)
    #[error("no sending chain: session has not received a message yet")]
    MissingSendingChain,

    /// Message counter would overflow
    #[error("message counter overflow at {current}")]
    CounterOverflow {
        /// Counter value when overflow was detected
        current: u32,
    },

    /// Header asks us to skip more message keys than allowed
    #[error("too many skipped messages: at {current}, asked to skip to {requested}")]
    TooManySkipped {
        /// Current receive counter
        current: u32,
        /// Counter the header asked for
        requested: u32,
    },

    /// AEAD authentication failed
    #[error("decryption failed: {reason}")]
    DecryptionFailed {
        /// Reason for decryption failure
        reason: String,
    },

    /// Serialized header could not be parsed
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// Session state could not be encoded
    #[error("state encoding failed: {0}")]
    StateEncoding(String),

    /// Session state bytes are not a valid session
    #[error("state decoding failed: {0}")]
    StateDecoding(String),

    /// Auxiliary keystore failure
    #[error("keystore error: {0}")]
    Keystore(String),
}

impl RatchetError {
    /// Returns true if the error was caused by the caller's key material
    /// rather than by session state or I/O.
    pub fn is_key_error(&self) -> bool {
        matches!(self, Self::InvalidKeyLength { .. } | Self::NonContributoryKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_key_length_is_key_error() {
        let err = RatchetError::InvalidKeyLength { what: "secret key", expected: 32, actual: 3 };
        assert!(err.is_key_error());
    }

    #[test]
    fn decryption_failed_is_not_key_error() {
        let err = RatchetError::DecryptionFailed { reason: "tag mismatch".to_string() };
        assert!(!err.is_key_error());
    }

    #[test]
    fn error_display() {
        let err = RatchetError::TooManySkipped { current: 10, requested: 5000 };
        assert_eq!(err.to_string(), "too many skipped messages: at 10, asked to skip to 5000");
    }
}
