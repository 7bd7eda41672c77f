//! RelaySMS Double Ratchet
//!
//! Signal-style Double Ratchet used to encrypt SMS payloads for a single
//! correspondent. The session layer in `relaysms-core` treats everything in
//! this crate as an opaque capability: it initializes a session, encrypts,
//! and round-trips the state through [`RatchetState::to_bytes`] /
//! [`RatchetState::from_bytes`] without looking inside.
//!
//! # Key Lifecycle
//!
//! ```text
//! Shared Secret (SK) ──┐
//!                      ▼
//! DH(our ratchet key, their ratchet key) → KDF_RK → Root Key + Chain Key
//!                                                        │
//!                                                        ▼
//!                                         KDF_CK → Message Keys
//!                                                        │
//!                                                        ▼
//!                                     ChaCha20-Poly1305 → Ciphertext
//! ```
//!
//! Every DH ratchet step mixes fresh X25519 output into the root key
//! (post-compromise security). Every message advances the symmetric chain and
//! the previous chain key is zeroized (forward secrecy).
//!
//! # Security
//!
//! - Message keys are used for exactly one AEAD operation. Key and nonce are
//!   both expanded from the message key, so no randomness is needed to
//!   encrypt.
//! - The serialized header is bound into the AEAD associated data; a header
//!   swapped between ciphertexts fails authentication.
//! - Out-of-order delivery is bounded by [`MAX_SKIP`] cached message keys.
//! - [`RatchetState`] zeroizes its key material on drop.
//! - [`Keystore`] records ratchet public keys only. A ratchet secret exists
//!   solely in the session state and is overwritten by the next DH step.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod aead;
mod chain;
mod error;
mod header;
mod kdf;
mod keystore;
mod session;
mod state;

pub use error::RatchetError;
pub use header::Header;
pub use keystore::Keystore;
pub use session::{MAX_SKIP, decrypt, encrypt, init_alice, init_bob};
pub use state::{KEY_SIZE, RatchetState};
