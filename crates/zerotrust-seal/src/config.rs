//! Seal policy and server key configuration.
//!
//! Values come from code (builder methods), from serde, or from the
//! environment:
//!
//! | variable                          | field                  |
//! |-----------------------------------|------------------------|
//! | `ZEROTRUST_MAX_AGE_SECS`          | `max_age_secs`         |
//! | `ZEROTRUST_MAX_PAYLOAD_SIZE`      | `max_payload_size`     |
//! | `ZEROTRUST_MAX_FUTURE_SKEW_SECS`  | `max_future_skew_secs` |
//! | `ZEROTRUST_SERVER_KEY`            | server private key     |
//! | `ZEROTRUST_SERVER_PUBLIC_KEY`     | server public key      |
//!
//! Keys use the `base64:<standard base64>` form; the prefix is optional.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;
use zerotrust_crypto::{
    base64_decode, base64_encode, KeyPair, PublicKey, DEFAULT_MAX_AGE_SECS,
    DEFAULT_MAX_PAYLOAD_SIZE,
};

use crate::error::ConfigError;
use crate::integrity::FreshnessPolicy;

pub const ENV_MAX_AGE_SECS: &str = "ZEROTRUST_MAX_AGE_SECS";
pub const ENV_MAX_PAYLOAD_SIZE: &str = "ZEROTRUST_MAX_PAYLOAD_SIZE";
pub const ENV_MAX_FUTURE_SKEW_SECS: &str = "ZEROTRUST_MAX_FUTURE_SKEW_SECS";
pub const ENV_SERVER_KEY: &str = "ZEROTRUST_SERVER_KEY";
pub const ENV_SERVER_PUBLIC_KEY: &str = "ZEROTRUST_SERVER_PUBLIC_KEY";

const KEY_PREFIX: &str = "base64:";

/// Largest accepted `max_payload_size` (64 MiB).
pub const MAX_PAYLOAD_CEILING: usize = 64 * 1024 * 1024;

const DEFAULT_ENVELOPE_FIELD: &str = "envelope";
const DEFAULT_SENDER_KEY_FIELD: &str = "client_public_key";

/// Policy applied by a `SealedTransport` and the request boundary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SealConfig {
    /// Default max age for `unseal` when the caller passes none.
    pub max_age_secs: u64,

    /// Upper bound on plaintext and ciphertext size in bytes.
    pub max_payload_size: usize,

    /// Bound on how far in the future `issued_at` may be. `None` accepts any.
    pub max_future_skew_secs: Option<u64>,

    /// Request field that carries the sealed string.
    pub envelope_field: String,

    /// Request field the sender's public key is written to after unsealing.
    pub sender_key_field: String,
}

impl Default for SealConfig {
    fn default() -> Self {
        Self {
            max_age_secs: DEFAULT_MAX_AGE_SECS,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            max_future_skew_secs: None,
            envelope_field: DEFAULT_ENVELOPE_FIELD.to_string(),
            sender_key_field: DEFAULT_SENDER_KEY_FIELD.to_string(),
        }
    }
}

impl SealConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_age_secs(mut self, secs: u64) -> Self {
        self.max_age_secs = secs;
        self
    }

    pub fn with_max_payload_size(mut self, bytes: usize) -> Self {
        self.max_payload_size = bytes;
        self
    }

    pub fn with_max_future_skew_secs(mut self, secs: Option<u64>) -> Self {
        self.max_future_skew_secs = secs;
        self
    }

    pub fn with_envelope_field(mut self, name: impl Into<String>) -> Self {
        self.envelope_field = name.into();
        self
    }

    pub fn with_sender_key_field(mut self, name: impl Into<String>) -> Self {
        self.sender_key_field = name.into();
        self
    }

    /// Freshness policy for a given max age.
    pub fn freshness(&self, max_age_secs: u64) -> FreshnessPolicy {
        FreshnessPolicy::new(max_age_secs).with_max_future_skew(self.max_future_skew_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_payload_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_payload_size".into(),
                reason: "max payload size must be greater than zero".into(),
            });
        }
        if self.max_payload_size > MAX_PAYLOAD_CEILING {
            return Err(ConfigError::InvalidValue {
                field: "max_payload_size".into(),
                reason: format!("max payload size cannot exceed {MAX_PAYLOAD_CEILING} bytes"),
            });
        }
        if self.envelope_field.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "envelope_field".into(),
                reason: "envelope field name cannot be empty".into(),
            });
        }
        if self.sender_key_field.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "sender_key_field".into(),
                reason: "sender key field name cannot be empty".into(),
            });
        }
        if self.envelope_field == self.sender_key_field {
            return Err(ConfigError::InvalidValue {
                field: "sender_key_field".into(),
                reason: "sender key field must differ from the envelope field".into(),
            });
        }
        Ok(())
    }

    /// Defaults overridden by any `ZEROTRUST_*` variables that are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`SealConfig::from_env`] but reads through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(v) = lookup(ENV_MAX_AGE_SECS) {
            config.max_age_secs = parse_number(ENV_MAX_AGE_SECS, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_PAYLOAD_SIZE) {
            config.max_payload_size = parse_number(ENV_MAX_PAYLOAD_SIZE, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_FUTURE_SKEW_SECS) {
            config.max_future_skew_secs = Some(parse_number(ENV_MAX_FUTURE_SKEW_SECS, &v)?);
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        reason: format!("expected a non-negative integer, got {value:?}"),
    })
}

/// Decode a `base64:`-prefixed (or bare) standard base64 key value.
pub fn decode_key_value(value: &str) -> Result<Zeroizing<Vec<u8>>, ConfigError> {
    let trimmed = value.trim();
    let encoded = trimmed.strip_prefix(KEY_PREFIX).unwrap_or(trimmed);
    base64_decode(encoded)
        .map(Zeroizing::new)
        .map_err(|e| ConfigError::InvalidKey(e.to_string()))
}

/// Render key bytes in the `base64:` form.
pub fn encode_key_value(bytes: &[u8]) -> String {
    format!("{KEY_PREFIX}{}", base64_encode(bytes))
}

/// Parse a distributed public key value.
pub fn parse_public_key_config(value: &str) -> Result<PublicKey, ConfigError> {
    let bytes = decode_key_value(value)?;
    Ok(PublicKey::from_bytes(&bytes)?)
}

/// The server's long-lived identity.
///
/// The server process holds the private key; clients only know the public
/// half.
pub enum ServerKeyConfig {
    Private(KeyPair),
    PublicOnly(PublicKey),
}

impl ServerKeyConfig {
    /// A fresh identity, for provisioning.
    pub fn generate() -> Result<Self, ConfigError> {
        Ok(Self::Private(KeyPair::generate()?))
    }

    /// Parse a private key value such as `base64:AAAA…`.
    pub fn from_private_value(value: &str) -> Result<Self, ConfigError> {
        let bytes = decode_key_value(value)?;
        Ok(Self::Private(KeyPair::from_private_bytes(&bytes)?))
    }

    pub fn from_public_value(value: &str) -> Result<Self, ConfigError> {
        Ok(Self::PublicOnly(parse_public_key_config(value)?))
    }

    /// Read `ZEROTRUST_SERVER_KEY`, falling back to `ZEROTRUST_SERVER_PUBLIC_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// When both values are present they must describe the same key pair.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let private = lookup(ENV_SERVER_KEY).map(Zeroizing::new);
        let public = lookup(ENV_SERVER_PUBLIC_KEY);

        match (private, public) {
            (Some(private), public) => {
                let config = Self::from_private_value(&private)?;
                if let Some(public) = public {
                    if parse_public_key_config(&public)? != config.public_key() {
                        return Err(ConfigError::InvalidKey(format!(
                            "{ENV_SERVER_PUBLIC_KEY} does not match {ENV_SERVER_KEY}"
                        )));
                    }
                }
                Ok(config)
            }
            (None, Some(public)) => Self::from_public_value(&public),
            (None, None) => Err(ConfigError::MissingVar(ENV_SERVER_KEY)),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            Self::Private(pair) => pair.public_key(),
            Self::PublicOnly(public) => *public,
        }
    }

    pub fn public_config_value(&self) -> String {
        encode_key_value(self.public_key().as_bytes())
    }

    /// Private key in the `base64:` form, if this config holds one.
    pub fn private_config_value(&self) -> Option<Zeroizing<String>> {
        match self {
            Self::Private(pair) => Some(Zeroizing::new(encode_key_value(
                pair.private_key().as_bytes(),
            ))),
            Self::PublicOnly(_) => None,
        }
    }

    pub fn into_key_pair(self) -> Option<KeyPair> {
        match self {
            Self::Private(pair) => Some(pair),
            Self::PublicOnly(_) => None,
        }
    }
}

impl std::fmt::Debug for ServerKeyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Private(pair) => f.debug_tuple("Private").field(pair).finish(),
            Self::PublicOnly(public) => f.debug_tuple("PublicOnly").field(public).finish(),
        }
    }
}
