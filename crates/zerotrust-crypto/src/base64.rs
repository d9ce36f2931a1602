//! Standard (padded) base64, the alphabet every envelope field uses.

use base64ct::{Base64, Encoding};

use crate::error::CryptoError;

/// Base64 encode bytes with the standard alphabet and padding.
pub fn base64_encode(data: &[u8]) -> String {
    Base64::encode_string(data)
}

/// Base64 decode a standard, padded string. Rejects non-canonical input.
pub fn base64_decode(s: &str) -> Result<Vec<u8>, CryptoError> {
    Base64::decode_vec(s).map_err(|e| CryptoError::Base64Decode(e.to_string()))
}

/// Decode into a fixed-size array, failing on any length mismatch.
pub fn base64_decode_array<const N: usize>(s: &str) -> Result<[u8; N], CryptoError> {
    let bytes = base64_decode(s)?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| CryptoError::InvalidKeyLength {
        expected: N,
        got: bytes.len(),
    })
}
