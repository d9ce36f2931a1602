//! X25519 key material and the process-local key pair holder.
//!
//! The server holds one long-lived pair for its whole lifetime. A client holds
//! an ephemeral pair that may be rotated; rotation swaps the whole pair in one
//! step, so a concurrent seal sees either the old pair or the new one.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use x25519_dalek::{PublicKey as DalekPublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::base64::{base64_decode, base64_encode};
use crate::error::CryptoError;
use crate::types::KEY_LENGTH;

/// X25519 public point. Safe to transmit.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; KEY_LENGTH]);

impl PublicKey {
    /// Create from raw bytes. Length is checked, point validity is checked at agreement time.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr = <[u8; KEY_LENGTH]>::try_from(bytes).map_err(|_| {
            CryptoError::InvalidKeyLength {
                expected: KEY_LENGTH,
                got: bytes.len(),
            }
        })?;
        Ok(Self(arr))
    }

    /// Parse a standard base64 encoded point.
    pub fn from_base64(s: &str) -> Result<Self, CryptoError> {
        Self::from_bytes(&base64_decode(s)?)
    }

    pub fn to_base64(&self) -> String {
        base64_encode(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
}

impl From<[u8; KEY_LENGTH]> for PublicKey {
    fn from(bytes: [u8; KEY_LENGTH]) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, ..] = self.0;
        write!(f, "PublicKey({a:02x}{b:02x}{c:02x}{d:02x}..)")
    }
}

/// X25519 private scalar. Never transmitted, wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; KEY_LENGTH]);

impl PrivateKey {
    /// Generate a fresh scalar from the OS RNG.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut bytes = [0u8; KEY_LENGTH];
        getrandom::getrandom(&mut bytes).map_err(|e| CryptoError::RngFailed(e.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr = <[u8; KEY_LENGTH]>::try_from(bytes).map_err(|_| {
            CryptoError::InvalidKeyLength {
                expected: KEY_LENGTH,
                got: bytes.len(),
            }
        })?;
        if arr.iter().all(|b| *b == 0) {
            return Err(CryptoError::InvalidKeyMaterial("private key is all zeros"));
        }
        Ok(Self(arr))
    }

    /// Derive the public point (X25519 base-point multiplication).
    pub fn public_key(&self) -> PublicKey {
        let secret = StaticSecret::from(self.0);
        PublicKey(DalekPublicKey::from(&secret).to_bytes())
    }

    /// Raw scalar bytes.
    ///
    /// # Security
    ///
    /// Handle with care - this exposes the private key.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey([REDACTED])")
    }
}

// Clone is not implemented for PrivateKey: copies of the scalar only leave
// through `KeyPairStore::export_private_key`, which wipes on drop.

/// A private scalar together with its derived public point.
pub struct KeyPair {
    private: PrivateKey,
    public: PublicKey,
}

impl KeyPair {
    pub fn generate() -> Result<Self, CryptoError> {
        Ok(Self::from(PrivateKey::generate()?))
    }

    pub fn from_private_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self::from(PrivateKey::from_bytes(bytes)?))
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    pub fn public_key(&self) -> PublicKey {
        self.public
    }
}

impl From<PrivateKey> for KeyPair {
    fn from(private: PrivateKey) -> Self {
        let public = private.public_key();
        Self { private, public }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

/// Holder for the local key pair.
///
/// Readers take an `Arc` snapshot, so a rotation racing a seal never yields a
/// torn scalar: the seal finishes with whichever pair it started with.
#[derive(Default)]
pub struct KeyPairStore {
    current: RwLock<Option<Arc<KeyPair>>>,
}

impl KeyPairStore {
    /// A store with no key pair yet. Sealing fails with `NotInitialized`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A store holding a freshly generated pair.
    pub fn generate() -> Result<Self, CryptoError> {
        Ok(Self::from(KeyPair::generate()?))
    }

    pub fn from_private_key(bytes: &[u8]) -> Result<Self, CryptoError> {
        Ok(Self::from(KeyPair::from_private_bytes(bytes)?))
    }

    pub fn is_initialized(&self) -> bool {
        self.current.read().is_some()
    }

    /// Snapshot of the current pair.
    pub fn current(&self) -> Result<Arc<KeyPair>, CryptoError> {
        self.current
            .read()
            .as_ref()
            .cloned()
            .ok_or(CryptoError::NotInitialized)
    }

    pub fn public_key(&self) -> Result<PublicKey, CryptoError> {
        Ok(self.current()?.public_key())
    }

    /// Replace the pair with one built from `bytes`.
    pub fn import_private_key(&self, bytes: &[u8]) -> Result<(), CryptoError> {
        let pair = KeyPair::from_private_bytes(bytes)?;
        *self.current.write() = Some(Arc::new(pair));
        Ok(())
    }

    /// Copy of the private scalar, wiped when the returned value drops.
    pub fn export_private_key(&self) -> Result<Zeroizing<[u8; KEY_LENGTH]>, CryptoError> {
        let pair = self.current()?;
        Ok(Zeroizing::new(*pair.private_key().as_bytes()))
    }

    /// Generate a new pair and swap it in. Returns the new public key.
    pub fn rotate(&self) -> Result<PublicKey, CryptoError> {
        let pair = KeyPair::generate()?;
        let public = pair.public_key();
        *self.current.write() = Some(Arc::new(pair));
        tracing::info!(public_key = ?public, "rotated local key pair");
        Ok(public)
    }
}

impl From<KeyPair> for KeyPairStore {
    fn from(pair: KeyPair) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(pair))),
        }
    }
}

impl fmt::Debug for KeyPairStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let public = self.current.read().as_ref().map(|p| p.public_key());
        f.debug_struct("KeyPairStore").field("public", &public).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_key_is_deterministic() {
        let pair = KeyPair::generate().unwrap();
        let again = KeyPair::from_private_bytes(pair.private_key().as_bytes()).unwrap();
        assert_eq!(pair.public_key(), again.public_key());
    }

    #[test]
    fn rfc7748_public_key_vector() {
        // RFC 7748 §6.1, Alice
        let private =
            hex::decode("77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a")
                .unwrap();
        let expected =
            hex::decode("8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a")
                .unwrap();
        let pair = KeyPair::from_private_bytes(&private).unwrap();
        assert_eq!(pair.public_key().as_bytes().to_vec(), expected);
    }

    #[test]
    fn rejects_wrong_lengths() {
        assert!(PrivateKey::from_bytes(&[1u8; 31]).is_err());
        assert!(PublicKey::from_bytes(&[1u8; 33]).is_err());
    }

    #[test]
    fn rejects_zero_private_key() {
        let err = PrivateKey::from_bytes(&[0u8; 32]).unwrap_err();
        assert!(matches!(err, CryptoError::InvalidKeyMaterial(_)));
    }

    #[test]
    fn public_key_base64_round_trip() {
        let public = KeyPair::generate().unwrap().public_key();
        let encoded = public.to_base64();
        assert_eq!(encoded.len(), 44);
        assert_eq!(PublicKey::from_base64(&encoded).unwrap(), public);
    }

    #[test]
    fn debug_does_not_leak_private_key() {
        let pair = KeyPair::generate().unwrap();
        let rendered = format!("{:?}", pair.private_key());
        assert_eq!(rendered, "PrivateKey([REDACTED])");
    }

    #[test]
    fn empty_store_is_not_initialized() {
        let store = KeyPairStore::empty();
        assert!(!store.is_initialized());
        assert!(matches!(store.current(), Err(CryptoError::NotInitialized)));
        assert!(matches!(
            store.export_private_key(),
            Err(CryptoError::NotInitialized)
        ));
    }

    #[test]
    fn import_then_export() {
        let store = KeyPairStore::empty();
        let source = KeyPair::generate().unwrap();
        store
            .import_private_key(source.private_key().as_bytes())
            .unwrap();
        assert!(store.is_initialized());
        let exported = store.export_private_key().unwrap();
        assert_eq!(&*exported, source.private_key().as_bytes());
        assert_eq!(store.public_key().unwrap(), source.public_key());
    }

    #[test]
    fn import_rejects_bad_length() {
        let store = KeyPairStore::empty();
        assert!(store.import_private_key(&[3u8; 16]).is_err());
        assert!(!store.is_initialized());
    }

    #[test]
    fn rotate_replaces_identity() {
        let store = KeyPairStore::generate().unwrap();
        let before = store.public_key().unwrap();
        let after = store.rotate().unwrap();
        assert_ne!(before, after);
        assert_eq!(store.public_key().unwrap(), after);
    }

    #[test]
    fn snapshot_survives_rotation() {
        let store = KeyPairStore::generate().unwrap();
        let snapshot = store.current().unwrap();
        let old_public = snapshot.public_key();
        store.rotate().unwrap();
        assert_eq!(snapshot.public_key(), old_public);
        assert_eq!(
            snapshot.private_key().public_key(),
            old_public,
            "old snapshot must stay internally consistent"
        );
    }

    #[test]
    fn rotate_initializes_empty_store() {
        let store = KeyPairStore::empty();
        store.rotate().unwrap();
        assert!(store.is_initialized());
    }
}
