//! Double Ratchet session operations.
//!
//! Follows the Signal Double Ratchet construction: an X25519 DH ratchet
//! feeding an HKDF root chain, with HMAC symmetric chains for sending and
//! receiving. Randomness is only needed for new ratchet keypairs and is
//! supplied by the caller.

use rand::{CryptoRng, RngCore};
use tracing::{debug, trace};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::{
    aead,
    chain::{self, MessageKey},
    error::RatchetError,
    header::Header,
    kdf::kdf_rk,
    keystore::Keystore,
    state::{KEY_SIZE, RatchetState, SkippedKey},
};

/// Maximum number of message keys skipped in one chain, and the cap on the
/// skipped-key cache. Bounds the work an attacker-chosen header can cause.
pub const MAX_SKIP: u32 = 1000;

/// Initialize a session as the initiator ("Alice").
///
/// Generates our first ratchet keypair, records its public half in
/// `keystore` when one is given, and performs the initial DH ratchet step against the peer's public
/// key, so the returned state can encrypt immediately.
///
/// # Errors
///
/// - `InvalidKeyLength` if either key is not 32 bytes
/// - `NonContributoryKey` if the peer key is a low-order point
/// - `Keystore` if the public key cannot be recorded
pub fn init_alice<R: RngCore + CryptoRng>(
    rng: &mut R,
    shared_secret: &[u8],
    peer_public_key: &[u8],
    keystore: Option<&Keystore>,
) -> Result<RatchetState, RatchetError> {
    let mut sk = to_key("secret key", shared_secret)?;
    let peer = to_key("peer public key", peer_public_key)?;

    let secret = StaticSecret::random_from_rng(&mut *rng);
    let public = PublicKey::from(&secret);

    let dh = secret.diffie_hellman(&PublicKey::from(peer));
    if !dh.was_contributory() {
        sk.zeroize();
        return Err(RatchetError::NonContributoryKey);
    }

    let (rk, cks) = kdf_rk(&sk, dh.as_bytes());
    sk.zeroize();

    if let Some(keystore) = keystore {
        keystore.record(public.as_bytes())?;
    }

    debug!("initialized initiator session");

    Ok(RatchetState {
        dhs_secret: secret.to_bytes(),
        dhs_public: *public.as_bytes(),
        dhr: Some(peer),
        rk,
        cks: Some(cks),
        ckr: None,
        ns: 0,
        nr: 0,
        pn: 0,
        skipped: Vec::new(),
    })
}

/// Initialize a session as the responder ("Bob").
///
/// `own_secret` is the X25519 secret whose public half the initiator used as
/// `peer_public_key`. The responder cannot send until it has received.
///
/// # Errors
///
/// - `InvalidKeyLength` if either key is not 32 bytes
pub fn init_bob(shared_secret: &[u8], own_secret: &[u8]) -> Result<RatchetState, RatchetError> {
    let rk = to_key("secret key", shared_secret)?;
    let secret = StaticSecret::from(to_key("own secret key", own_secret)?);
    let public = PublicKey::from(&secret);

    Ok(RatchetState {
        dhs_secret: secret.to_bytes(),
        dhs_public: *public.as_bytes(),
        dhr: None,
        rk,
        cks: None,
        ckr: None,
        ns: 0,
        nr: 0,
        pn: 0,
        skipped: Vec::new(),
    })
}

/// Encrypt a message, advancing the sending chain.
///
/// The AEAD associated data is `associated_data ‖ header.to_bytes()`.
///
/// # Errors
///
/// - `MissingSendingChain` if the session has never had a sending chain
/// - `CounterOverflow` if the sending chain is exhausted
pub fn encrypt(
    state: &mut RatchetState,
    plaintext: &[u8],
    associated_data: &[u8],
) -> Result<(Header, Vec<u8>), RatchetError> {
    let ns_next =
        state.ns.checked_add(1).ok_or(RatchetError::CounterOverflow { current: state.ns })?;

    let Some(cks) = state.cks.as_mut() else {
        return Err(RatchetError::MissingSendingChain);
    };
    let message_key = chain::step(cks);

    let header = Header { dh: state.dhs_public, pn: state.pn, n: state.ns };
    state.ns = ns_next;

    let ciphertext = aead::seal(&message_key, plaintext, &bind_header(associated_data, &header));

    trace!(n = header.n, pn = header.pn, "encrypted message");
    Ok((header, ciphertext))
}

/// Decrypt a message, advancing the receiving side of the ratchet.
///
/// The state is only updated when decryption succeeds; a forged or
/// corrupted message leaves it untouched.
///
/// # Errors
///
/// - `TooManySkipped` if the header skips more than [`MAX_SKIP`] messages
/// - `NonContributoryKey` if the header carries a low-order ratchet key
/// - `DecryptionFailed` on authentication failure
pub fn decrypt<R: RngCore + CryptoRng>(
    rng: &mut R,
    state: &mut RatchetState,
    header: &Header,
    ciphertext: &[u8],
    associated_data: &[u8],
) -> Result<Vec<u8>, RatchetError> {
    let mut working = state.clone();
    let plaintext = decrypt_in_place(rng, &mut working, header, ciphertext, associated_data)?;
    *state = working;
    Ok(plaintext)
}

fn decrypt_in_place<R: RngCore + CryptoRng>(
    rng: &mut R,
    state: &mut RatchetState,
    header: &Header,
    ciphertext: &[u8],
    associated_data: &[u8],
) -> Result<Vec<u8>, RatchetError> {
    let aad = bind_header(associated_data, header);

    if let Some(pos) = state.skipped.iter().position(|k| k.dh == header.dh && k.n == header.n) {
        let skipped = state.skipped.remove(pos);
        let message_key = MessageKey::from_bytes(skipped.key);
        return aead::open(&message_key, ciphertext, &aad);
    }

    if state.dhr != Some(header.dh) {
        skip_message_keys(state, header.pn)?;
        dh_ratchet(rng, state, header)?;
    }

    skip_message_keys(state, header.n)?;

    let nr_next =
        state.nr.checked_add(1).ok_or(RatchetError::CounterOverflow { current: state.nr })?;
    let Some(ckr) = state.ckr.as_mut() else {
        return Err(RatchetError::DecryptionFailed { reason: "no receiving chain".to_string() });
    };
    let message_key = chain::step(ckr);
    state.nr = nr_next;

    aead::open(&message_key, ciphertext, &aad)
}

fn skip_message_keys(state: &mut RatchetState, until: u32) -> Result<(), RatchetError> {
    if u64::from(state.nr) + u64::from(MAX_SKIP) < u64::from(until) {
        return Err(RatchetError::TooManySkipped { current: state.nr, requested: until });
    }

    let (Some(dhr), Some(ckr)) = (state.dhr, state.ckr.as_mut()) else {
        return Ok(());
    };

    while state.nr < until {
        let message_key = chain::step(ckr);
        state.skipped.push(SkippedKey { dh: dhr, n: state.nr, key: *message_key.bytes() });
        state.nr += 1;
    }

    let overflow = state.skipped.len().saturating_sub(MAX_SKIP as usize);
    if overflow > 0 {
        state.skipped.drain(..overflow);
    }

    Ok(())
}

fn dh_ratchet<R: RngCore + CryptoRng>(
    rng: &mut R,
    state: &mut RatchetState,
    header: &Header,
) -> Result<(), RatchetError> {
    state.pn = state.ns;
    state.ns = 0;
    state.nr = 0;
    state.dhr = Some(header.dh);

    let theirs = PublicKey::from(header.dh);

    let dh = state.ratchet_secret().diffie_hellman(&theirs);
    if !dh.was_contributory() {
        return Err(RatchetError::NonContributoryKey);
    }
    let (rk, ckr) = kdf_rk(&state.rk, dh.as_bytes());
    state.rk = rk;
    state.ckr = Some(ckr);

    let secret = StaticSecret::random_from_rng(&mut *rng);
    state.dhs_secret = secret.to_bytes();
    state.dhs_public = *PublicKey::from(&secret).as_bytes();

    let dh = secret.diffie_hellman(&theirs);
    let (rk, cks) = kdf_rk(&state.rk, dh.as_bytes());
    state.rk = rk;
    state.cks = Some(cks);

    debug!(pn = state.pn, "performed DH ratchet step");
    Ok(())
}

fn bind_header(associated_data: &[u8], header: &Header) -> Vec<u8> {
    let mut aad = Vec::with_capacity(associated_data.len() + Header::SIZE);
    aad.extend_from_slice(associated_data);
    aad.extend_from_slice(&header.to_bytes());
    aad
}

fn to_key(what: &'static str, bytes: &[u8]) -> Result<[u8; KEY_SIZE], RatchetError> {
    bytes.try_into().map_err(|_| RatchetError::InvalidKeyLength {
        what,
        expected: KEY_SIZE,
        actual: bytes.len(),
    })
}
