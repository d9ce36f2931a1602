//! Zero-trust sealed envelopes.
//!
//! A sealed envelope carries an AES-256-GCM ciphertext under a key agreed
//! between the sender's and the recipient's X25519 identities, the sender's
//! public key, an issue timestamp and an HMAC-SHA-512 over all of it. It is
//! self-contained: the receiver needs only its own private key.

pub mod clock;
pub mod config;
pub mod envelope;
pub mod error;
pub mod integrity;
pub mod transport;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{parse_public_key_config, SealConfig, ServerKeyConfig, MAX_PAYLOAD_CEILING};
pub use envelope::{canonical_mac_input, decode_envelope, encode_envelope, max_encoded_len};
pub use error::{ConfigError, SealError, SealErrorKind};
pub use integrity::{check_freshness, compute_mac, verify_mac, FreshnessPolicy};
pub use transport::{SealedTransport, Stage};
pub use types::{Envelope, EnvelopeBody, Unsealed};

pub use zerotrust_crypto::{KeyPair, KeyPairStore, PrivateKey, PublicKey};
