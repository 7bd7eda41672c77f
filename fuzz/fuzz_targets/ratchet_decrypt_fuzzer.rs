//! Fuzz target for the receiving side of the ratchet
//!
//! Feeds a responder a mix of genuine messages and attacker-controlled
//! headers and ciphertexts.
//!
//! # Invariants
//!
//! - Decryption NEVER panics on forged input
//! - A rejected message leaves the session untouched
//! - Genuine messages still decrypt after any number of forgeries

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use relaysms_ratchet::{Header, decrypt, encrypt, init_alice, init_bob};
use x25519_dalek::{PublicKey, StaticSecret};

#[derive(Debug, Arbitrary)]
struct Scenario {
    seed: u64,
    operations: Vec<Operation>,
}

#[derive(Debug, Arbitrary)]
enum Operation {
    /// Alice sends and Bob receives immediately
    Genuine { plaintext: Vec<u8> },
    /// Alice sends but the message is held back
    Withhold { plaintext: Vec<u8> },
    /// Deliver the oldest withheld message
    Release,
    /// Completely forged message
    Forge { header: Vec<u8>, ciphertext: Vec<u8> },
    /// Genuine header with tampered ciphertext
    Tamper { plaintext: Vec<u8>, flip: u8 },
}

const AD: &[u8] = b"fuzz";

fuzz_target!(|scenario: Scenario| {
    let mut rng = ChaCha20Rng::seed_from_u64(scenario.seed);
    let sk = [0x5Au8; 32];
    let bob_secret = StaticSecret::random_from_rng(&mut rng);
    let bob_public = PublicKey::from(&bob_secret);

    let Ok(mut alice) = init_alice(&mut rng, &sk, bob_public.as_bytes(), None) else {
        return;
    };
    let Ok(mut bob) = init_bob(&sk, &bob_secret.to_bytes()) else {
        return;
    };
    let mut withheld = Vec::new();

    for op in scenario.operations.into_iter().take(64) {
        match op {
            Operation::Genuine { plaintext } => {
                let Ok((header, ct)) = encrypt(&mut alice, &plaintext, AD) else { return };
                let pt = decrypt(&mut rng, &mut bob, &header, &ct, AD).expect("genuine message");
                assert_eq!(pt, plaintext);
            },
            Operation::Withhold { plaintext } => {
                let Ok((header, ct)) = encrypt(&mut alice, &plaintext, AD) else { return };
                withheld.push((header, ct, plaintext));
            },
            Operation::Release => {
                if withheld.is_empty() {
                    continue;
                }
                let (header, ct, plaintext) = withheld.remove(0);
                let pt = decrypt(&mut rng, &mut bob, &header, &ct, AD).expect("withheld message");
                assert_eq!(pt, plaintext);
            },
            Operation::Forge { header, ciphertext } => {
                let before = bob.to_bytes().expect("state encodes");
                if let Ok(header) = Header::from_bytes(&header) {
                    if decrypt(&mut rng, &mut bob, &header, &ciphertext, AD).is_err() {
                        assert_eq!(bob.to_bytes().expect("state encodes"), before);
                    }
                }
            },
            Operation::Tamper { plaintext, flip } => {
                let Ok((header, mut ct)) = encrypt(&mut alice, &plaintext, AD) else { return };
                let idx = usize::from(flip) % ct.len();
                ct[idx] ^= 0x01;

                let before = bob.to_bytes().expect("state encodes");
                assert!(decrypt(&mut rng, &mut bob, &header, &ct, AD).is_err());
                assert_eq!(bob.to_bytes().expect("state encodes"), before);
            },
        }
    }
});
