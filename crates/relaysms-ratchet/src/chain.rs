//! Symmetric chain step (KDF_CK)
//!
//! # Security Properties
//!
//! - Forward Secrecy: the old chain key is overwritten when advancing
//! - Key Uniqueness: each step produces a unique message key
//! - Determinism: the same chain key always produces the same sequence

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::state::KEY_SIZE;

type HmacSha256 = Hmac<Sha256>;

/// Input byte for deriving a message key
const MESSAGE_CONSTANT: u8 = 0x01;

/// Input byte for deriving the next chain key
const CHAIN_CONSTANT: u8 = 0x02;

/// A message key derived from a chain.
///
/// Used for a single encryption or decryption, then dropped.
pub(crate) struct MessageKey {
    key: [u8; KEY_SIZE],
}

impl MessageKey {
    pub(crate) fn from_bytes(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    pub(crate) fn bytes(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

impl Drop for MessageKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Advance a chain key in place and return the message key for this step.
pub(crate) fn step(chain_key: &mut [u8; KEY_SIZE]) -> MessageKey {
    let message_key = hmac_constant(chain_key, MESSAGE_CONSTANT);
    let mut next = hmac_constant(chain_key, CHAIN_CONSTANT);

    chain_key.zeroize();
    chain_key.copy_from_slice(&next);
    next.zeroize();

    MessageKey { key: message_key }
}

fn hmac_constant(key: &[u8; KEY_SIZE], constant: u8) -> [u8; KEY_SIZE] {
    let Ok(mut mac) = HmacSha256::new_from_slice(key) else {
        unreachable!("HMAC-SHA256 accepts any key size");
    };
    mac.update(&[constant]);
    let result = mac.finalize().into_bytes();

    let mut out = [0u8; KEY_SIZE];
    out.copy_from_slice(&result);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_chain() -> [u8; 32] {
        let mut chain = [0u8; 32];
        for (i, byte) in chain.iter_mut().enumerate() {
            *byte = i as u8;
        }
        chain
    }

    #[test]
    fn step_changes_chain_key() {
        let mut chain = test_chain();
        let before = chain;
        let _ = step(&mut chain);
        assert_ne!(chain, before);
    }

    #[test]
    fn step_produces_unique_keys() {
        let mut chain = test_chain();
        let k0 = *step(&mut chain).bytes();
        let k1 = *step(&mut chain).bytes();
        let k2 = *step(&mut chain).bytes();

        assert_ne!(k0, k1, "keys must be unique");
        assert_ne!(k1, k2, "keys must be unique");
        assert_ne!(k0, k2, "keys must be unique");
    }

    #[test]
    fn step_is_deterministic() {
        let mut chain1 = test_chain();
        let mut chain2 = test_chain();

        for _ in 0..10 {
            assert_eq!(step(&mut chain1).bytes(), step(&mut chain2).bytes());
        }
    }

    #[test]
    fn message_key_differs_from_next_chain_key() {
        let mut chain = test_chain();
        let mk = *step(&mut chain).bytes();
        assert_ne!(mk, chain);
    }
}
