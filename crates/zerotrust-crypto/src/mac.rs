//! HMAC-SHA-512 used for envelope integrity, separate from the AEAD tag.

use hmac::{Hmac, Mac};
use sha2::Sha512;

use crate::error::CryptoError;
use crate::types::MAC_LENGTH;

type HmacSha512 = Hmac<Sha512>;

fn keyed(key: &[u8]) -> Result<HmacSha512, CryptoError> {
    // HMAC accepts keys of any length; an error here is unreachable in practice.
    HmacSha512::new_from_slice(key)
        .map_err(|_| CryptoError::InvalidKeyMaterial("HMAC key rejected"))
}

/// Compute HMAC-SHA-512 over `data`.
pub fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<[u8; MAC_LENGTH], CryptoError> {
    let mut mac = keyed(key)?;
    mac.update(data);
    let mut out = [0u8; MAC_LENGTH];
    out.copy_from_slice(&mac.finalize().into_bytes());
    Ok(out)
}

/// Recompute and compare in constant time. Any length mismatch is a failure.
pub fn verify_hmac_sha512(key: &[u8], data: &[u8], expected: &[u8]) -> Result<bool, CryptoError> {
    let mut mac = keyed(key)?;
    mac.update(data);
    Ok(mac.verify_slice(expected).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc4231_test_case_2() {
        let mac = hmac_sha512(b"Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            hex::encode(mac),
            "164b7a7bfcf819e2e395fbe73b56e0a387bd64222e831fd610270cd7ea250554\
             9758bf75c05a994a6d034f65f8f0e6fdcaeab1a34d4a6b4b636e070a38bce737"
        );
    }

    #[test]
    fn verify_accepts_matching_mac() {
        let key = [0x42u8; 32];
        let mac = hmac_sha512(&key, b"payload").unwrap();
        assert!(verify_hmac_sha512(&key, b"payload", &mac).unwrap());
    }

    #[test]
    fn verify_rejects_modified_data() {
        let key = [0x42u8; 32];
        let mac = hmac_sha512(&key, b"payload").unwrap();
        assert!(!verify_hmac_sha512(&key, b"payloae", &mac).unwrap());
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let mac = hmac_sha512(&[1u8; 32], b"payload").unwrap();
        assert!(!verify_hmac_sha512(&[2u8; 32], b"payload", &mac).unwrap());
    }

    #[test]
    fn verify_rejects_truncated_mac() {
        let key = [0x42u8; 32];
        let mac = hmac_sha512(&key, b"payload").unwrap();
        assert!(!verify_hmac_sha512(&key, b"payload", &mac[..63]).unwrap());
    }
}
