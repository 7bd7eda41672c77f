//! Framed ciphertext: the transport payload returned to the caller.
//!
//! Layout on the wire (before base64):
//!
//! ```text
//! [header_len: i32 LE][header: header_len bytes][ciphertext: rest]
//! ```
//!
//! The whole frame is then base64-encoded (standard alphabet, padded) for
//! SMS transport.

use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::{Buf, BufMut, Bytes};

use crate::error::FrameError;

/// Size of the little-endian header length prefix
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Serialized ratchet header plus ciphertext.
///
/// # Invariants
///
/// - `header.len() <= i32::MAX`, enforced by [`FramedCiphertext::encode`]
/// - `decode(encode(f)) == f` for every encodable frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedCiphertext {
    /// Serialized ratchet header
    pub header: Bytes,
    /// Ciphertext (everything after the header)
    pub ciphertext: Bytes,
}

impl FramedCiphertext {
    /// Create a frame from a serialized header and a ciphertext.
    pub fn new(header: impl Into<Bytes>, ciphertext: impl Into<Bytes>) -> Self {
        Self { header: header.into(), ciphertext: ciphertext.into() }
    }

    /// Encoded size in bytes (before base64).
    pub fn encoded_len(&self) -> usize {
        LENGTH_PREFIX_SIZE + self.header.len() + self.ciphertext.len()
    }

    /// Encode into a buffer.
    ///
    /// # Errors
    ///
    /// - `FrameError::HeaderTooLarge` if the header length does not fit the
    ///   signed 32-bit prefix
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<(), FrameError> {
        let header_len = i32::try_from(self.header.len())
            .map_err(|_| FrameError::HeaderTooLarge { size: self.header.len() })?;

        dst.put_i32_le(header_len);
        dst.put_slice(&self.header);
        dst.put_slice(&self.ciphertext);
        Ok(())
    }

    /// Encode into a new vector.
    pub fn to_vec(&self) -> Result<Vec<u8>, FrameError> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode(&mut out)?;

        debug_assert_eq!(out.len(), self.encoded_len());
        Ok(out)
    }

    /// Decode a frame.
    ///
    /// # Errors
    ///
    /// - `TooShort` if there is no complete length prefix
    /// - `NegativeHeaderLength` if the prefix is negative
    /// - `HeaderOverrun` if the prefix claims more bytes than remain
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < LENGTH_PREFIX_SIZE {
            return Err(FrameError::TooShort { actual: bytes.len() });
        }

        let mut buf = bytes;
        let declared = buf.get_i32_le();
        let header_len =
            usize::try_from(declared).map_err(|_| FrameError::NegativeHeaderLength(declared))?;

        if header_len > buf.remaining() {
            return Err(FrameError::HeaderOverrun {
                declared: header_len,
                available: buf.remaining(),
            });
        }

        let header = Bytes::copy_from_slice(&buf[..header_len]);
        let ciphertext = Bytes::copy_from_slice(&buf[header_len..]);
        Ok(Self { header, ciphertext })
    }

    /// Encode and base64 for transport.
    pub fn to_base64(&self) -> Result<String, FrameError> {
        Ok(STANDARD.encode(self.to_vec()?))
    }

    /// Parse a base64 transport payload.
    ///
    /// # Errors
    ///
    /// - `Base64` if `text` is not valid base64, otherwise as [`Self::decode`]
    pub fn from_base64(text: &str) -> Result<Self, FrameError> {
        let bytes = STANDARD.decode(text.trim()).map_err(|e| FrameError::Base64(e.to_string()))?;
        Self::decode(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_little_endian_header_length() {
        let frame = FramedCiphertext::new(vec![0xAA; 40], vec![0xBB; 5]);
        let bytes = frame.to_vec().unwrap();

        assert_eq!(&bytes[..4], &[40, 0, 0, 0]);
        assert_eq!(&bytes[4..44], &[0xAA; 40]);
        assert_eq!(&bytes[44..], &[0xBB; 5]);
    }

    #[test]
    fn empty_ciphertext() {
        let frame = FramedCiphertext::new(vec![1, 2, 3], Vec::new());
        let decoded = FramedCiphertext::decode(&frame.to_vec().unwrap()).unwrap();
        assert_eq!(decoded, frame);
    }

    #[test]
    fn rejects_short_input() {
        assert_eq!(FramedCiphertext::decode(&[1, 0, 0]), Err(FrameError::TooShort { actual: 3 }));
    }

    #[test]
    fn rejects_negative_length() {
        let bytes = (-1i32).to_le_bytes();
        assert_eq!(FramedCiphertext::decode(&bytes), Err(FrameError::NegativeHeaderLength(-1)));
    }

    #[test]
    fn rejects_overrun() {
        let mut bytes = 10i32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 6]);
        assert_eq!(
            FramedCiphertext::decode(&bytes),
            Err(FrameError::HeaderOverrun { declared: 10, available: 6 })
        );
    }

    #[test]
    fn base64_is_standard_padded() {
        let frame = FramedCiphertext::new(vec![0u8; 1], vec![0xFF]);
        let text = frame.to_base64().unwrap();

        assert_eq!(text, "AQAAAAD/");
        assert_eq!(FramedCiphertext::from_base64(&text).unwrap(), frame);
    }

    #[test]
    fn rejects_invalid_base64() {
        assert!(matches!(FramedCiphertext::from_base64("not base64!"), Err(FrameError::Base64(_))));
    }
}
