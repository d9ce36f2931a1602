//! AES-256-GCM with the authentication tag kept apart from the ciphertext.
//!
//! Envelopes carry `value` (ciphertext, same length as the plaintext) and `tag`
//! (16 bytes) as separate fields, so this codec never produces `ct || tag`.

use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};

use crate::error::CryptoError;
use crate::types::{
    AES_GCM_IV_LENGTH, AES_GCM_TAG_LENGTH, DEFAULT_MAX_PAYLOAD_SIZE, SHARED_KEY_LENGTH,
};

/// Generate a random 12-byte IV for AES-GCM.
pub fn generate_iv() -> Result<[u8; AES_GCM_IV_LENGTH], CryptoError> {
    let mut iv = [0u8; AES_GCM_IV_LENGTH];
    getrandom::getrandom(&mut iv).map_err(|e| CryptoError::RngFailed(e.to_string()))?;
    Ok(iv)
}

/// Whole-message AES-256-GCM with a bounded plaintext size.
pub struct AeadCodec {
    cipher: Aes256Gcm,
    max_plaintext: usize,
}

impl AeadCodec {
    /// Create a codec for one 32-byte key with the default 1 MiB bound.
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != SHARED_KEY_LENGTH {
            return Err(CryptoError::InvalidKeyLength {
                expected: SHARED_KEY_LENGTH,
                got: key.len(),
            });
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        Ok(Self {
            cipher,
            max_plaintext: DEFAULT_MAX_PAYLOAD_SIZE,
        })
    }

    pub fn with_max_plaintext(mut self, max_plaintext: usize) -> Self {
        self.max_plaintext = max_plaintext;
        self
    }

    pub fn max_plaintext(&self) -> usize {
        self.max_plaintext
    }

    fn check_size(&self, size: usize) -> Result<(), CryptoError> {
        if size > self.max_plaintext {
            return Err(CryptoError::PayloadTooLarge {
                size,
                max: self.max_plaintext,
            });
        }
        Ok(())
    }

    /// Encrypt, returning `(ciphertext, tag)`. Ciphertext length equals plaintext length.
    pub fn encrypt(
        &self,
        nonce: &[u8; AES_GCM_IV_LENGTH],
        plaintext: &[u8],
    ) -> Result<(Vec<u8>, [u8; AES_GCM_TAG_LENGTH]), CryptoError> {
        self.check_size(plaintext.len())?;

        let mut buffer = plaintext.to_vec();
        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(nonce), b"", &mut buffer)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut tag_bytes = [0u8; AES_GCM_TAG_LENGTH];
        tag_bytes.copy_from_slice(&tag);
        Ok((buffer, tag_bytes))
    }

    /// Verify the tag and decrypt.
    ///
    /// A wrong key and a modified ciphertext, IV or tag all yield the same
    /// `AuthenticationFailed`.
    pub fn decrypt(
        &self,
        nonce: &[u8; AES_GCM_IV_LENGTH],
        ciphertext: &[u8],
        tag: &[u8; AES_GCM_TAG_LENGTH],
    ) -> Result<Vec<u8>, CryptoError> {
        self.check_size(ciphertext.len())?;

        let mut buffer = ciphertext.to_vec();
        self.cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(nonce),
                b"",
                &mut buffer,
                Tag::from_slice(tag),
            )
            .map_err(|_| CryptoError::AuthenticationFailed)?;
        Ok(buffer)
    }
}
