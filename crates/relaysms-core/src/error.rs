//! Error types for the session layer.
//!
//! Strongly-typed errors per concern: configuration, framing, the ratchet
//! primitive seam, and the top-level [`SessionError`] returned by
//! [`SessionOrchestrator`](crate::SessionOrchestrator). Storage errors live in
//! [`crate::storage`].
//!
//! None of these are retried internally. Every error aborts the current
//! invocation and is reported to the caller.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors resolving storage configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// No base directory given and no home directory to default to
    #[error("no storage directory given and HOME is not set")]
    MissingHome,
}

/// Errors encoding or decoding a framed ciphertext.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Input is shorter than the 4-byte length prefix
    #[error("frame too short: need at least 4 bytes, got {actual}")]
    TooShort {
        /// Actual input length
        actual: usize,
    },

    /// Length prefix is negative
    #[error("negative header length: {0}")]
    NegativeHeaderLength(i32),

    /// Length prefix points past the end of the input
    #[error("header length {declared} exceeds remaining {available} bytes")]
    HeaderOverrun {
        /// Header length from the prefix
        declared: usize,
        /// Bytes available after the prefix
        available: usize,
    },

    /// Header too large for a signed 32-bit length prefix
    #[error("header of {size} bytes does not fit an i32 length prefix")]
    HeaderTooLarge {
        /// Serialized header size
        size: usize,
    },

    /// Transport text is not valid base64
    #[error("invalid base64: {0}")]
    Base64(String),
}

/// Failure reported by the ratchet primitive.
///
/// Carries the operation that failed and the primitive's own diagnostic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} failed: {detail}")]
pub struct PrimitiveError {
    /// Primitive operation that failed
    pub operation: &'static str,
    /// Diagnostic text from the primitive
    pub detail: String,
}

impl PrimitiveError {
    /// Wrap a primitive failure.
    pub fn new(operation: &'static str, detail: impl ToString) -> Self {
        Self { operation, detail: detail.to_string() }
    }
}

/// Errors surfaced by [`SessionOrchestrator`](crate::SessionOrchestrator).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A key argument is not valid base64
    ///
    /// Raised before anything is read or written.
    #[error("invalid base64 in {field}: {reason}")]
    InputEncoding {
        /// Which argument was rejected
        field: &'static str,
        /// Decoder diagnostic
        reason: String,
    },

    /// A stored session exists but cannot be deserialized
    ///
    /// Never treated as "no session": silently bootstrapping over it would
    /// desynchronize message keys with the correspondent.
    #[error("stored session state is corrupt: {0}")]
    StateCorruption(#[source] PrimitiveError),

    /// The ratchet primitive rejected the keys or failed to encrypt
    #[error("ratchet primitive error: {0}")]
    Primitive(#[from] PrimitiveError),

    /// The state store failed
    ///
    /// If raised after encryption, the session advanced in memory but not on
    /// disk; the next call resumes from the older persisted state.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The output frame could not be built
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),
}

impl SessionError {
    /// Returns true if the same call may succeed later without any change
    /// to its inputs (another process held the database lock).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_transient())
    }
}
