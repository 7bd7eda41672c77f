//! Fuzz target for RatchetState::from_bytes
//!
//! Stored session blobs come from disk and may be truncated or corrupted.
//! Decoding must return an error, never panic, and a blob that does decode
//! must survive another serialization pass.

#![no_main]

use libfuzzer_sys::fuzz_target;
use relaysms_ratchet::RatchetState;

fuzz_target!(|data: &[u8]| {
    if let Ok(state) = RatchetState::from_bytes(data) {
        let bytes = state.to_bytes().expect("decoded state must re-encode");
        assert!(RatchetState::from_bytes(&bytes).is_ok());
    }
});
