//! Seal/unseal pipeline.
//!
//! Seal:   validate → derive(local, recipient) → encrypt → MAC → encode
//! Unseal: decode → derive(local, sender) → verify MAC → freshness → decrypt
//!
//! Each call takes one snapshot of the local key pair, so a rotation landing
//! mid-call never mixes two identities within one envelope.

use std::fmt;
use std::sync::Arc;

use zerotrust_crypto::{
    agree, generate_iv, AeadCodec, KeyPair, KeyPairStore, PublicKey, SharedKey,
    MIN_HMAC_KEY_LENGTH,
};

use crate::clock::{Clock, SystemClock};
use crate::config::SealConfig;
use crate::envelope::{decode_envelope, encode_envelope, max_encoded_len};
use crate::error::{ConfigError, SealError};
use crate::integrity::{compute_mac, verify_mac};
use crate::types::{Envelope, EnvelopeBody, Unsealed};

/// Pipeline step a failure happened in. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ValidateShape,
    DeriveKey,
    Encrypt,
    Decrypt,
    ValidateIntegrity,
    CheckFreshness,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidateShape => "validate_shape",
            Self::DeriveKey => "derive_key",
            Self::Encrypt => "encrypt",
            Self::Decrypt => "decrypt",
            Self::ValidateIntegrity => "validate_integrity",
            Self::CheckFreshness => "check_freshness",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn at<T>(stage: Stage, result: Result<T, SealError>) -> Result<T, SealError> {
    if let Err(e) = &result {
        tracing::debug!(stage = %stage, kind = e.kind().as_str(), "seal pipeline step failed");
    }
    result
}

/// One side of a sealed channel: a local identity, an optional default
/// counterparty and the policy to apply.
pub struct SealedTransport {
    keys: Arc<KeyPairStore>,
    default_recipient: Option<PublicKey>,
    config: SealConfig,
    clock: Arc<dyn Clock>,
}

impl SealedTransport {
    /// Fails if `config` does not pass [`SealConfig::validate`].
    pub fn new(keys: Arc<KeyPairStore>, config: SealConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            keys,
            default_recipient: None,
            config,
            clock: Arc::new(SystemClock),
        })
    }

    /// Server side: a fixed, long-lived identity. Responses are addressed to
    /// whichever public key arrived in the request.
    pub fn server(key_pair: KeyPair, config: SealConfig) -> Result<Self, ConfigError> {
        Self::new(Arc::new(KeyPairStore::from(key_pair)), config)
    }

    /// Client side: a rotatable identity that seals to the server by default.
    pub fn client(
        keys: Arc<KeyPairStore>,
        server_public_key: PublicKey,
        config: SealConfig,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(keys, config)?.with_default_recipient(server_public_key))
    }

    pub fn with_default_recipient(mut self, recipient: PublicKey) -> Self {
        self.default_recipient = Some(recipient);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SealConfig {
        &self.config
    }

    pub fn key_store(&self) -> &Arc<KeyPairStore> {
        &self.keys
    }

    /// The local public key, as it would be stamped on the next envelope.
    pub fn public_key(&self) -> Result<PublicKey, SealError> {
        Ok(self.keys.public_key()?)
    }

    /// Encrypt `plaintext` for `recipient` (or the default counterparty) and
    /// return the wire string.
    ///
    /// Input checks all run before key derivation or nonce generation.
    pub fn seal(
        &self,
        plaintext: &[u8],
        recipient: Option<&PublicKey>,
        hmac_key: Option<&[u8]>,
    ) -> Result<String, SealError> {
        let max = self.config.max_payload_size;
        at(Stage::ValidateShape, self.check_plaintext(plaintext.len()))?;
        at(Stage::ValidateShape, check_hmac_key(hmac_key))?;
        let recipient = at(
            Stage::ValidateShape,
            recipient
                .or(self.default_recipient.as_ref())
                .copied()
                .ok_or_else(|| SealError::InvalidKeyMaterial("no recipient public key".into())),
        )?;
        let local = at(Stage::DeriveKey, self.keys.current().map_err(SealError::from))?;

        let shared = at(Stage::DeriveKey, derive(&local, &recipient))?;
        let codec = at(Stage::Encrypt, codec(&shared, max))?;
        let iv = at(Stage::Encrypt, generate_iv().map_err(SealError::from))?;
        let (value, tag) = at(
            Stage::Encrypt,
            codec.encrypt(&iv, plaintext).map_err(SealError::from),
        )?;

        let body = EnvelopeBody {
            iv,
            tag,
            value,
            public_key: local.public_key(),
            issued_at: self.clock.now_unix(),
        };
        let mac_key = hmac_key.unwrap_or(&shared.as_bytes()[..]);
        let mac = at(Stage::ValidateIntegrity, compute_mac(mac_key, &body))?;
        let encoded = at(Stage::Encrypt, encode_envelope(&Envelope { body, mac }))?;

        tracing::debug!(
            plaintext_len = plaintext.len(),
            envelope_len = encoded.len(),
            "sealed envelope"
        );
        Ok(encoded)
    }

    /// Decrypt an envelope and return the plaintext.
    ///
    /// `sender` overrides the public key embedded in the envelope; `max_age`
    /// overrides the configured default.
    pub fn unseal(
        &self,
        envelope: &str,
        sender: Option<&PublicKey>,
        hmac_key: Option<&[u8]>,
        max_age: Option<u64>,
    ) -> Result<Vec<u8>, SealError> {
        Ok(self.unseal_with_sender(envelope, sender, hmac_key, max_age)?.plaintext)
    }

    /// Like [`SealedTransport::unseal`], also returning the public key the
    /// shared key was derived against so a response can be addressed back.
    pub fn unseal_with_sender(
        &self,
        envelope: &str,
        sender: Option<&PublicKey>,
        hmac_key: Option<&[u8]>,
        max_age: Option<u64>,
    ) -> Result<Unsealed, SealError> {
        let max = self.config.max_payload_size;
        let bound = max_encoded_len(max);
        if envelope.len() > bound {
            return at(
                Stage::ValidateShape,
                Err(SealError::PayloadTooLarge {
                    size: envelope.len(),
                    max: bound,
                }),
            );
        }
        let envelope = at(Stage::ValidateShape, decode_envelope(envelope))?;
        at(Stage::ValidateShape, self.check_ciphertext(envelope.body.value.len()))?;
        at(Stage::ValidateShape, check_hmac_key(hmac_key))?;

        let sender = sender.copied().unwrap_or(envelope.body.public_key);
        let local = at(Stage::DeriveKey, self.keys.current().map_err(SealError::from))?;
        let shared = at(Stage::DeriveKey, derive(&local, &sender))?;

        let mac_key = hmac_key.unwrap_or(&shared.as_bytes()[..]);
        let authentic = at(Stage::ValidateIntegrity, verify_mac(mac_key, &envelope))?;
        if !authentic {
            return at(Stage::ValidateIntegrity, Err(SealError::AuthenticationFailed));
        }

        let policy = self
            .config
            .freshness(max_age.unwrap_or(self.config.max_age_secs));
        at(
            Stage::CheckFreshness,
            policy.check(envelope.body.issued_at, self.clock.now_unix()),
        )?;

        let codec = at(Stage::Decrypt, codec(&shared, max))?;
        let body = &envelope.body;
        let plaintext = at(
            Stage::Decrypt,
            codec
                .decrypt(&body.iv, &body.value, &body.tag)
                .map_err(SealError::from),
        )?;

        tracing::debug!(plaintext_len = plaintext.len(), "unsealed envelope");
        Ok(Unsealed { plaintext, sender })
    }

    fn check_plaintext(&self, len: usize) -> Result<(), SealError> {
        if len == 0 {
            return Err(SealError::EmptyPayload);
        }
        self.check_ciphertext(len)
    }

    fn check_ciphertext(&self, len: usize) -> Result<(), SealError> {
        let max = self.config.max_payload_size;
        if len > max {
            return Err(SealError::PayloadTooLarge { size: len, max });
        }
        Ok(())
    }
}

impl fmt::Debug for SealedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedTransport")
            .field("keys", &self.keys)
            .field("default_recipient", &self.default_recipient)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn check_hmac_key(hmac_key: Option<&[u8]>) -> Result<(), SealError> {
    match hmac_key {
        Some(key) if key.len() < MIN_HMAC_KEY_LENGTH => Err(SealError::InvalidKeyMaterial(format!(
            "HMAC key must be at least {MIN_HMAC_KEY_LENGTH} bytes, got {}",
            key.len()
        ))),
        _ => Ok(()),
    }
}

fn derive(local: &KeyPair, remote: &PublicKey) -> Result<SharedKey, SealError> {
    Ok(agree(local.private_key(), remote)?)
}

fn codec(shared: &SharedKey, max: usize) -> Result<AeadCodec, SealError> {
    Ok(AeadCodec::new(shared.as_bytes())?.with_max_plaintext(max))
}
