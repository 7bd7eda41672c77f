//! Root-chain and message-key derivation using HKDF

use hkdf::Hkdf;
use sha2::Sha256;

use crate::state::KEY_SIZE;

/// Label for the root chain KDF
const ROOT_LABEL: &[u8] = b"relaysmsRatchetV1";

/// Label for expanding a message key into AEAD key + nonce
const MESSAGE_LABEL: &[u8] = b"relaysmsMessageV1";

/// ChaCha20-Poly1305 nonce size
pub(crate) const NONCE_SIZE: usize = 12;

/// KDF_RK: mix a DH output into the root key.
///
/// Returns `(new_root_key, chain_key)`. The root key is the HKDF salt and
/// the DH output the input keying material.
pub(crate) fn kdf_rk(root_key: &[u8], dh_output: &[u8]) -> ([u8; KEY_SIZE], [u8; KEY_SIZE]) {
    let hkdf = Hkdf::<Sha256>::new(Some(root_key), dh_output);

    let mut okm = [0u8; 2 * KEY_SIZE];
    let Ok(()) = hkdf.expand(ROOT_LABEL, &mut okm) else {
        unreachable!("64 bytes is a valid HKDF-SHA256 output length");
    };

    let mut root = [0u8; KEY_SIZE];
    let mut chain = [0u8; KEY_SIZE];
    root.copy_from_slice(&okm[..KEY_SIZE]);
    chain.copy_from_slice(&okm[KEY_SIZE..]);

    zeroize::Zeroize::zeroize(&mut okm);
    (root, chain)
}

/// Expand a message key into an AEAD key and nonce.
pub(crate) fn expand_message_key(
    message_key: &[u8; KEY_SIZE],
) -> ([u8; KEY_SIZE], [u8; NONCE_SIZE]) {
    let hkdf = Hkdf::<Sha256>::new(None, message_key);

    let mut okm = [0u8; KEY_SIZE + NONCE_SIZE];
    let Ok(()) = hkdf.expand(MESSAGE_LABEL, &mut okm) else {
        unreachable!("44 bytes is a valid HKDF-SHA256 output length");
    };

    let mut key = [0u8; KEY_SIZE];
    let mut nonce = [0u8; NONCE_SIZE];
    key.copy_from_slice(&okm[..KEY_SIZE]);
    nonce.copy_from_slice(&okm[KEY_SIZE..]);

    zeroize::Zeroize::zeroize(&mut okm);
    (key, nonce)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kdf_rk_is_deterministic() {
        let a = kdf_rk(&[1u8; 32], &[2u8; 32]);
        let b = kdf_rk(&[1u8; 32], &[2u8; 32]);
        assert_eq!(a, b);
    }

    #[test]
    fn kdf_rk_outputs_differ() {
        let (root, chain) = kdf_rk(&[1u8; 32], &[2u8; 32]);
        assert_ne!(root, chain, "root and chain key must be independent");
    }

    #[test]
    fn different_dh_outputs_produce_different_roots() {
        let (root_a, _) = kdf_rk(&[1u8; 32], &[2u8; 32]);
        let (root_b, _) = kdf_rk(&[1u8; 32], &[3u8; 32]);
        assert_ne!(root_a, root_b);
    }

    #[test]
    fn message_key_expansion_is_deterministic() {
        let mk = [7u8; 32];
        assert_eq!(expand_message_key(&mk), expand_message_key(&mk));
    }
}
