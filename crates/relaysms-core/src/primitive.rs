//! Capability seam to the Double Ratchet primitive.
//!
//! The session layer drives the ratchet only through [`RatchetPrimitive`]
//! and never interprets the serialized state: it is an opaque blob passed
//! between the primitive and the [`StateStore`](crate::StateStore).

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use rand::rngs::OsRng;
use relaysms_ratchet::{Header, Keystore, RatchetState};
use tracing::warn;

use crate::error::PrimitiveError;

/// Operations the session layer needs from a ratchet implementation.
pub trait RatchetPrimitive {
    /// Live session state
    type State;

    /// Per-message header
    type Header;

    /// Discard the primitive's own bookkeeping left by an earlier session.
    ///
    /// Called only when no stored session exists, so a new session never
    /// starts on top of stale primitive-side files.
    fn reset_auxiliary_state(&self) -> Result<(), PrimitiveError>;

    /// Bootstrap a session as the initiator.
    fn init(
        &self,
        secret_key: &[u8],
        peer_public_key: &[u8],
    ) -> Result<Self::State, PrimitiveError>;

    /// Encrypt one message, advancing `state`.
    fn encrypt(
        &self,
        state: &mut Self::State,
        plaintext: &[u8],
        associated_data: &[u8],
    ) -> Result<(Self::Header, Vec<u8>), PrimitiveError>;

    /// Serialize state for storage.
    fn serialize_state(&self, state: &Self::State) -> Result<Vec<u8>, PrimitiveError>;

    /// Restore state from storage. Must accept anything
    /// [`serialize_state`](Self::serialize_state) produced.
    fn deserialize_state(&self, bytes: &[u8]) -> Result<Self::State, PrimitiveError>;

    /// Deterministic header encoding used for framing.
    fn serialize_header(&self, header: &Self::Header) -> Vec<u8>;
}

/// [`RatchetPrimitive`] backed by `relaysms-ratchet`.
///
/// Owns the path of the auxiliary keystore in which the primitive records
/// the ratchet keypairs it generates.
#[derive(Debug, Clone)]
pub struct DoubleRatchet {
    aux_path: PathBuf,
}

impl DoubleRatchet {
    /// Adapter whose keystore lives at `aux_path`.
    pub fn new(aux_path: impl Into<PathBuf>) -> Self {
        Self { aux_path: aux_path.into() }
    }

    /// Path of the auxiliary keystore.
    pub fn aux_path(&self) -> &Path {
        &self.aux_path
    }
}

impl RatchetPrimitive for DoubleRatchet {
    type State = RatchetState;
    type Header = Header;

    fn reset_auxiliary_state(&self) -> Result<(), PrimitiveError> {
        match fs::remove_file(&self.aux_path) {
            Ok(()) => {
                warn!(path = %self.aux_path.display(), "removed stale auxiliary ratchet store");
                Ok(())
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PrimitiveError::new("reset auxiliary state", err)),
        }
    }

    fn init(
        &self,
        secret_key: &[u8],
        peer_public_key: &[u8],
    ) -> Result<RatchetState, PrimitiveError> {
        let keystore =
            Keystore::open(&self.aux_path).map_err(|e| PrimitiveError::new("open keystore", e))?;

        relaysms_ratchet::init_alice(&mut OsRng, secret_key, peer_public_key, Some(&keystore))
            .map_err(|e| PrimitiveError::new("initialize session", e))
    }

    fn encrypt(
        &self,
        state: &mut RatchetState,
        plaintext: &[u8],
        associated_data: &[u8],
    ) -> Result<(Header, Vec<u8>), PrimitiveError> {
        relaysms_ratchet::encrypt(state, plaintext, associated_data)
            .map_err(|e| PrimitiveError::new("encrypt", e))
    }

    fn serialize_state(&self, state: &RatchetState) -> Result<Vec<u8>, PrimitiveError> {
        state.to_bytes().map_err(|e| PrimitiveError::new("serialize state", e))
    }

    fn deserialize_state(&self, bytes: &[u8]) -> Result<RatchetState, PrimitiveError> {
        RatchetState::from_bytes(bytes).map_err(|e| PrimitiveError::new("deserialize state", e))
    }

    fn serialize_header(&self, header: &Header) -> Vec<u8> {
        header.to_bytes()
    }
}
