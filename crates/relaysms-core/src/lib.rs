//! RelaySMS session core
//!
//! Per-correspondent Double Ratchet session lifecycle for SMS encryption:
//! decide whether to bootstrap or resume a session, drive the ratchet, persist
//! the advanced state, and frame the output for transport.
//!
//! # Architecture
//!
//! ```text
//! identifier, plaintext, sk, ppk
//!            │
//!            ▼
//!   SessionOrchestrator ──── StateStore::update(identifier) ────┐
//!            │                  (SQLite, keyed by SHA-256)      │
//!            ▼                                                  │
//!   RatchetPrimitive: init | deserialize → encrypt → serialize ─┘
//!            │
//!            ▼
//!   FramedCiphertext → base64
//! ```
//!
//! # Components
//!
//! - [`StateStore`]: durable map from correspondent to opaque session blob
//! - [`RatchetPrimitive`]: capability seam to the ratchet, implemented by
//!   [`DoubleRatchet`]
//! - [`SessionOrchestrator`]: bootstrap vs. resume, encryption, persistence
//! - [`FramedCiphertext`]: `i32 LE header length ‖ header ‖ ciphertext`
//! - [`StorageConfig`]: where the databases live

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod frame;
pub mod orchestrator;
pub mod primitive;
pub mod record_key;
pub mod storage;

pub use config::{DEFAULT_AUX_DB, DEFAULT_BUSY_TIMEOUT, DEFAULT_STATE_DB, StorageConfig};
pub use error::{ConfigError, FrameError, PrimitiveError, SessionError};
pub use frame::{FramedCiphertext, LENGTH_PREFIX_SIZE};
pub use orchestrator::SessionOrchestrator;
pub use primitive::{DoubleRatchet, RatchetPrimitive};
pub use record_key::RecordKey;
pub use storage::{
    ChaoticStateStore, MemoryStateStore, SqliteStateStore, StateStore, StorageError,
};
