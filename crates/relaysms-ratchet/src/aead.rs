//! Message encryption using `ChaCha20-Poly1305`
//!
//! Pure functions: key and nonce are expanded from the one-time message key,
//! so nothing here needs randomness.

use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use zeroize::Zeroize;

use crate::{chain::MessageKey, error::RatchetError, kdf::expand_message_key};

/// Poly1305 tag size (16 bytes)
pub(crate) const TAG_SIZE: usize = 16;

/// Encrypt `plaintext` under a message key, authenticating `associated_data`.
pub(crate) fn seal(message_key: &MessageKey, plaintext: &[u8], associated_data: &[u8]) -> Vec<u8> {
    let (mut key, nonce) = expand_message_key(message_key.bytes());
    let cipher = ChaCha20Poly1305::new((&key).into());
    key.zeroize();

    let payload = Payload { msg: plaintext, aad: associated_data };
    let Ok(ciphertext) = cipher.encrypt(Nonce::from_slice(&nonce), payload) else {
        unreachable!("ChaCha20-Poly1305 encryption cannot fail with valid inputs");
    };

    ciphertext
}

/// Decrypt and authenticate a ciphertext.
///
/// # Errors
///
/// - `DecryptionFailed`: ciphertext shorter than a tag, or tag mismatch
pub(crate) fn open(
    message_key: &MessageKey,
    ciphertext: &[u8],
    associated_data: &[u8],
) -> Result<Vec<u8>, RatchetError> {
    if ciphertext.len() < TAG_SIZE {
        return Err(RatchetError::DecryptionFailed {
            reason: format!("ciphertext is {} bytes, shorter than the tag", ciphertext.len()),
        });
    }

    let (mut key, nonce) = expand_message_key(message_key.bytes());
    let cipher = ChaCha20Poly1305::new((&key).into());
    key.zeroize();

    let payload = Payload { msg: ciphertext, aad: associated_data };
    cipher.decrypt(Nonce::from_slice(&nonce), payload).map_err(|_| {
        RatchetError::DecryptionFailed { reason: "authentication failed".to_string() }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(byte: u8) -> MessageKey {
        MessageKey::from_bytes([byte; 32])
    }

    #[test]
    fn seal_open_roundtrip() {
        let ct = seal(&key(1), b"Hello, World!", b"ad");
        assert_eq!(open(&key(1), &ct, b"ad").unwrap(), b"Hello, World!");
    }

    #[test]
    fn ciphertext_is_plaintext_plus_tag() {
        let ct = seal(&key(1), b"test message", b"");
        assert_eq!(ct.len(), b"test message".len() + TAG_SIZE);
    }

    #[test]
    fn wrong_associated_data_fails() {
        let ct = seal(&key(1), b"payload", b"ad-one");
        assert!(matches!(
            open(&key(1), &ct, b"ad-two"),
            Err(RatchetError::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn wrong_key_fails() {
        let ct = seal(&key(1), b"payload", b"");
        assert!(open(&key(2), &ct, b"").is_err());
    }

    #[test]
    fn truncated_ciphertext_fails() {
        assert!(open(&key(1), &[0u8; TAG_SIZE - 1], b"").is_err());
    }
}
