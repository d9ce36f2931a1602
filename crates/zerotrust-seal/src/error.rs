use thiserror::Error;
use zerotrust_crypto::CryptoError;

/// Failure of a seal or unseal operation.
///
/// Variants stay distinct for logging and tests. Anything facing a remote
/// party must collapse them into one generic rejection.
#[derive(Debug, Error)]
pub enum SealError {
    #[error("Invalid key material: {0}")]
    InvalidKeyMaterial(String),

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Envelope expired: age {age}s exceeds {max_age}s")]
    Expired { age: u64, max_age: u64 },

    #[error("Envelope issued {ahead}s in the future (allowed skew {max_skew}s)")]
    IssuedInFuture { ahead: u64, max_skew: u64 },

    #[error("Payload too large: {size} bytes exceeds limit of {max}")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Payload is empty")]
    EmptyPayload,

    #[error("Local key pair not initialized")]
    NotInitialized,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Random number generation failed: {0}")]
    Rng(String),
}

/// Coarse classification of a [`SealError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SealErrorKind {
    InvalidKeyMaterial,
    MalformedEnvelope,
    AuthenticationFailed,
    Expired,
    PayloadTooLarge,
    EmptyPayload,
    NotInitialized,
    Internal,
}

impl SealErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidKeyMaterial => "invalid_key_material",
            Self::MalformedEnvelope => "malformed_envelope",
            Self::AuthenticationFailed => "authentication_failed",
            Self::Expired => "expired",
            Self::PayloadTooLarge => "payload_too_large",
            Self::EmptyPayload => "empty_payload",
            Self::NotInitialized => "not_initialized",
            Self::Internal => "internal",
        }
    }
}

impl SealError {
    pub fn kind(&self) -> SealErrorKind {
        match self {
            Self::InvalidKeyMaterial(_) => SealErrorKind::InvalidKeyMaterial,
            Self::MalformedEnvelope(_) => SealErrorKind::MalformedEnvelope,
            Self::AuthenticationFailed => SealErrorKind::AuthenticationFailed,
            Self::Expired { .. } | Self::IssuedInFuture { .. } => SealErrorKind::Expired,
            Self::PayloadTooLarge { .. } => SealErrorKind::PayloadTooLarge,
            Self::EmptyPayload => SealErrorKind::EmptyPayload,
            Self::NotInitialized => SealErrorKind::NotInitialized,
            Self::EncryptionFailed(_) | Self::Serialization(_) | Self::Rng(_) => {
                SealErrorKind::Internal
            }
        }
    }
}

impl From<CryptoError> for SealError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidKeyLength { .. } | CryptoError::InvalidKeyMaterial(_) => {
                Self::InvalidKeyMaterial(e.to_string())
            }
            CryptoError::Base64Decode(_) => Self::MalformedEnvelope(e.to_string()),
            CryptoError::PayloadTooLarge { size, max } => Self::PayloadTooLarge { size, max },
            CryptoError::AuthenticationFailed => Self::AuthenticationFailed,
            CryptoError::NotInitialized => Self::NotInitialized,
            CryptoError::EncryptionFailed(msg) => Self::EncryptionFailed(msg),
            CryptoError::RngFailed(msg) => Self::Rng(msg),
        }
    }
}

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crypto_errors_map_onto_taxonomy() {
        let e: SealError = CryptoError::InvalidKeyLength {
            expected: 32,
            got: 31,
        }
        .into();
        assert_eq!(e.kind(), SealErrorKind::InvalidKeyMaterial);

        let e: SealError = CryptoError::AuthenticationFailed.into();
        assert_eq!(e.kind(), SealErrorKind::AuthenticationFailed);

        let e: SealError = CryptoError::PayloadTooLarge { size: 2, max: 1 }.into();
        assert_eq!(e.kind(), SealErrorKind::PayloadTooLarge);

        let e: SealError = CryptoError::NotInitialized.into();
        assert_eq!(e.kind(), SealErrorKind::NotInitialized);

        let e: SealError = CryptoError::Base64Decode("bad".into()).into();
        assert_eq!(e.kind(), SealErrorKind::MalformedEnvelope);
    }

    #[test]
    fn future_issue_counts_as_expired() {
        let e = SealError::IssuedInFuture {
            ahead: 900,
            max_skew: 300,
        };
        assert_eq!(e.kind(), SealErrorKind::Expired);
    }
}
