use serde_json::{json, Value};
use thiserror::Error;
use zerotrust_seal::SealError;

/// HTTP status for every rejected sealed request.
pub const REJECTION_STATUS: u16 = 400;

/// Message for every rejected sealed request.
pub const REJECTION_MESSAGE: &str = "invalid sealed payload";

/// What a remote caller sees when a sealed request fails.
///
/// Deliberately carries nothing: an expired envelope, a forged MAC and a
/// truncated key all produce the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid sealed payload")]
pub struct Rejection;

impl Rejection {
    pub fn status(&self) -> u16 {
        REJECTION_STATUS
    }

    pub fn message(&self) -> &'static str {
        REJECTION_MESSAGE
    }

    /// `{"error": "invalid sealed payload"}`
    pub fn to_json(&self) -> Value {
        json!({ "error": REJECTION_MESSAGE })
    }
}

/// Internal cause of a rejection. Logged, never returned to the caller.
#[derive(Debug, Error)]
pub enum GateError {
    #[error(transparent)]
    Seal(#[from] SealError),

    #[error("Envelope field is not a string")]
    EnvelopeNotString,

    #[error("Plaintext is not valid UTF-8")]
    PlaintextNotUtf8,

    #[error("Plaintext is not a JSON object")]
    PlaintextNotObject,

    #[error("Invalid client public key: {0}")]
    InvalidPublicKey(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GateError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Seal(e) => e.kind().as_str(),
            Self::EnvelopeNotString | Self::PlaintextNotUtf8 | Self::PlaintextNotObject => {
                "malformed_plaintext"
            }
            Self::InvalidPublicKey(_) => "invalid_public_key",
            Self::Serialization(_) => "internal",
        }
    }
}

impl From<GateError> for Rejection {
    fn from(e: GateError) -> Self {
        tracing::warn!(kind = e.kind(), error = %e, "rejected sealed request");
        Rejection
    }
}
