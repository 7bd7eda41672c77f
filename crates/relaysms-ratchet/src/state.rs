//! Persistable Double Ratchet session state.
//!
//! Stored as `[version: u8] ‖ CBOR(state)`. The session layer keeps these
//! bytes as an opaque blob; only this module knows the layout.

use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::error::RatchetError;

/// Size of every key in the session (X25519 keys, root and chain keys)
pub const KEY_SIZE: usize = 32;

/// Current state encoding version
const STATE_VERSION: u8 = 1;

/// A cached message key for a message that has not arrived yet.
#[derive(Clone, Serialize, Deserialize)]
pub(crate) struct SkippedKey {
    /// Ratchet public key of the chain the message belongs to
    pub(crate) dh: [u8; KEY_SIZE],
    /// Message number within that chain
    pub(crate) n: u32,
    /// The message key
    pub(crate) key: [u8; KEY_SIZE],
}

impl Drop for SkippedKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Double Ratchet session state for one correspondent.
///
/// # Invariants
///
/// - `dhs_public` is always the X25519 public key of `dhs_secret`
/// - `ns`, `nr` and `pn` only move forward within a chain
/// - `skipped.len() <= MAX_SKIP`
#[derive(Clone, Serialize, Deserialize)]
pub struct RatchetState {
    /// Our current ratchet secret key
    pub(crate) dhs_secret: [u8; KEY_SIZE],
    /// Our current ratchet public key
    pub(crate) dhs_public: [u8; KEY_SIZE],
    /// Their current ratchet public key
    pub(crate) dhr: Option<[u8; KEY_SIZE]>,
    /// Root key
    pub(crate) rk: [u8; KEY_SIZE],
    /// Sending chain key
    pub(crate) cks: Option<[u8; KEY_SIZE]>,
    /// Receiving chain key
    pub(crate) ckr: Option<[u8; KEY_SIZE]>,
    /// Messages sent in the current sending chain
    pub(crate) ns: u32,
    /// Messages received in the current receiving chain
    pub(crate) nr: u32,
    /// Messages in the previous sending chain
    pub(crate) pn: u32,
    /// Cached keys for skipped messages, oldest first
    pub(crate) skipped: Vec<SkippedKey>,
}

impl RatchetState {
    pub(crate) fn ratchet_secret(&self) -> StaticSecret {
        StaticSecret::from(self.dhs_secret)
    }

    /// Our current ratchet public key.
    pub fn ratchet_public_key(&self) -> [u8; KEY_SIZE] {
        self.dhs_public
    }

    /// The correspondent's ratchet public key, once known.
    pub fn peer_ratchet_key(&self) -> Option<[u8; KEY_SIZE]> {
        self.dhr
    }

    /// Messages sent in the current sending chain.
    pub fn send_count(&self) -> u32 {
        self.ns
    }

    /// Messages received in the current receiving chain.
    pub fn receive_count(&self) -> u32 {
        self.nr
    }

    /// Number of cached skipped-message keys.
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Serialize to bytes for persistence.
    ///
    /// # Errors
    ///
    /// - `StateEncoding` if CBOR encoding fails
    pub fn to_bytes(&self) -> Result<Vec<u8>, RatchetError> {
        let mut bytes = vec![STATE_VERSION];
        ciborium::into_writer(self, &mut bytes)
            .map_err(|e| RatchetError::StateEncoding(e.to_string()))?;
        Ok(bytes)
    }

    /// Deserialize persisted state.
    ///
    /// Never panics on arbitrary input.
    ///
    /// # Errors
    ///
    /// - `StateDecoding` if the bytes are empty, carry an unknown version,
    ///   are not valid CBOR for this structure, or describe an inconsistent
    ///   session (public key not matching the secret)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RatchetError> {
        let Some((&version, body)) = bytes.split_first() else {
            return Err(RatchetError::StateDecoding("empty state".to_string()));
        };

        if version != STATE_VERSION {
            return Err(RatchetError::StateDecoding(format!(
                "unsupported state version {version}"
            )));
        }

        let state: Self =
            ciborium::from_reader(body).map_err(|e| RatchetError::StateDecoding(e.to_string()))?;

        let derived = PublicKey::from(&state.ratchet_secret());
        if derived.as_bytes() != &state.dhs_public {
            return Err(RatchetError::StateDecoding(
                "ratchet public key does not match secret".to_string(),
            ));
        }

        if state.skipped.len() > crate::MAX_SKIP as usize {
            return Err(RatchetError::StateDecoding(format!(
                "{} skipped keys exceeds limit",
                state.skipped.len()
            )));
        }

        Ok(state)
    }
}

impl Drop for RatchetState {
    fn drop(&mut self) {
        self.dhs_secret.zeroize();
        self.rk.zeroize();
        if let Some(ck) = self.cks.as_mut() {
            ck.zeroize();
        }
        if let Some(ck) = self.ckr.as_mut() {
            ck.zeroize();
        }
    }
}

impl std::fmt::Debug for RatchetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RatchetState")
            .field("ns", &self.ns)
            .field("nr", &self.nr)
            .field("pn", &self.pn)
            .field("skipped", &self.skipped.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> RatchetState {
        let secret = StaticSecret::from([5u8; 32]);
        let public = PublicKey::from(&secret);
        RatchetState {
            dhs_secret: secret.to_bytes(),
            dhs_public: *public.as_bytes(),
            dhr: Some([6u8; 32]),
            rk: [7u8; 32],
            cks: Some([8u8; 32]),
            ckr: None,
            ns: 3,
            nr: 0,
            pn: 1,
            skipped: vec![SkippedKey { dh: [1u8; 32], n: 2, key: [9u8; 32] }],
        }
    }

    #[test]
    fn bytes_roundtrip_preserves_fields() {
        let state = test_state();
        let decoded = RatchetState::from_bytes(&state.to_bytes().unwrap()).unwrap();

        assert_eq!(decoded.dhs_public, state.dhs_public);
        assert_eq!(decoded.dhr, state.dhr);
        assert_eq!(decoded.rk, state.rk);
        assert_eq!(decoded.cks, state.cks);
        assert_eq!(decoded.ckr, None);
        assert_eq!(decoded.ns, 3);
        assert_eq!(decoded.pn, 1);
        assert_eq!(decoded.skipped_count(), 1);
    }

    #[test]
    fn encoding_starts_with_version() {
        assert_eq!(test_state().to_bytes().unwrap()[0], STATE_VERSION);
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(RatchetState::from_bytes(&[]), Err(RatchetError::StateDecoding(_))));
    }

    #[test]
    fn rejects_unknown_version() {
        let mut bytes = test_state().to_bytes().unwrap();
        bytes[0] = 0xFF;
        assert!(RatchetState::from_bytes(&bytes).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(RatchetState::from_bytes(&[STATE_VERSION, 0xDE, 0xAD, 0xBE, 0xEF]).is_err());
    }

    #[test]
    fn rejects_mismatched_public_key() {
        let mut state = test_state();
        state.dhs_public = [0u8; 32];
        let bytes = state.to_bytes().unwrap();
        assert!(RatchetState::from_bytes(&bytes).is_err());
    }

    #[test]
    fn debug_does_not_leak_keys() {
        let rendered = format!("{:?}", test_state());
        assert!(!rendered.contains("rk"));
        assert!(rendered.contains("ns"));
    }
}
