//! Fuzz target for FramedCiphertext decoding
//!
//! Arbitrary bytes and arbitrary text must never panic the frame parser:
//! - Length prefixes that are negative or point past the end
//! - Inputs shorter than the prefix
//! - Non-base64 transport text
//!
//! Any frame that does decode must re-encode to the same bytes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use relaysms_core::FramedCiphertext;

fuzz_target!(|data: &[u8]| {
    if let Ok(frame) = FramedCiphertext::decode(data) {
        assert_eq!(frame.to_vec().ok().as_deref(), Some(data));
    }

    if let Ok(text) = std::str::from_utf8(data) {
        let _ = FramedCiphertext::from_base64(text);
    }
});
