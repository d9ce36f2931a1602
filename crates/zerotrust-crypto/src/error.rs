use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(&'static str),

    #[error("Payload too large: {size} bytes exceeds limit of {max}")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Tag mismatch and wrong key are deliberately the same variant.
    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Key pair not initialized")]
    NotInitialized,

    #[error("Base64 decode error: {0}")]
    Base64Decode(String),

    #[error("Random number generation failed: {0}")]
    RngFailed(String),
}
