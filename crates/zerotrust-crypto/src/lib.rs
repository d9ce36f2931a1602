//! Cryptographic primitives for zero-trust sealed envelopes.
//!
//! One fixed suite: X25519 key agreement with BLAKE2b-256 extraction,
//! AES-256-GCM with a detached tag, and HMAC-SHA-512.

pub mod aead;
pub mod base64;
pub mod error;
pub mod key_agreement;
pub mod keys;
pub mod mac;
pub mod types;

pub use aead::{generate_iv, AeadCodec};
pub use base64::{base64_decode, base64_decode_array, base64_encode};
pub use error::CryptoError;
pub use key_agreement::{agree, derive_shared_key, SharedKey};
pub use keys::{KeyPair, KeyPairStore, PrivateKey, PublicKey};
pub use mac::{hmac_sha512, verify_hmac_sha512};
pub use types::{
    AES_GCM_IV_LENGTH, AES_GCM_TAG_LENGTH, DEFAULT_MAX_AGE_SECS, DEFAULT_MAX_PAYLOAD_SIZE,
    KEY_LENGTH, MAC_LENGTH, MIN_HMAC_KEY_LENGTH, SHARED_KEY_LENGTH,
};
