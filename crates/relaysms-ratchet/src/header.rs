//! Ratchet message header.
//!
//! Fixed 40-byte little-endian layout:
//!
//! ```text
//! [pn: u32 LE][n: u32 LE][dh: 32-byte X25519 public key]
//! ```
//!
//! The encoding is deterministic, so the same header always serializes to
//! the same bytes. Those bytes are authenticated as part of the AEAD
//! associated data and framed in front of the ciphertext by the session
//! layer.

use crate::{error::RatchetError, state::KEY_SIZE};

/// Header sent alongside every ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Sender's current ratchet public key
    pub dh: [u8; KEY_SIZE],
    /// Number of messages in the sender's previous sending chain
    pub pn: u32,
    /// Message number within the current sending chain
    pub n: u32,
}

impl Header {
    /// Size of the serialized header (40 bytes)
    pub const SIZE: usize = 8 + KEY_SIZE;

    /// Serialize to the fixed wire layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(&self.pn.to_le_bytes());
        out.extend_from_slice(&self.n.to_le_bytes());
        out.extend_from_slice(&self.dh);

        debug_assert_eq!(out.len(), Self::SIZE);
        out
    }

    /// Parse a serialized header.
    ///
    /// # Errors
    ///
    /// - `MalformedHeader` if `bytes` is not exactly [`Header::SIZE`] long
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RatchetError> {
        if bytes.len() != Self::SIZE {
            return Err(RatchetError::MalformedHeader(format!(
                "expected {} bytes, got {}",
                Self::SIZE,
                bytes.len()
            )));
        }

        let mut pn = [0u8; 4];
        let mut n = [0u8; 4];
        let mut dh = [0u8; KEY_SIZE];
        pn.copy_from_slice(&bytes[0..4]);
        n.copy_from_slice(&bytes[4..8]);
        dh.copy_from_slice(&bytes[8..]);

        Ok(Self { dh, pn: u32::from_le_bytes(pn), n: u32::from_le_bytes(n) })
    }
}
