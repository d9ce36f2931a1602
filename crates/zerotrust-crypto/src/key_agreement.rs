//! X25519 key agreement followed by BLAKE2b extraction.
//!
//! sharedKey = BLAKE2b-256(X25519(localPrivate, remotePublic))
//!
//! Unkeyed, 32-byte output: identical to libsodium `crypto_generichash(32, s)`,
//! so keys agree with peers built on libsodium.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use x25519_dalek::{PublicKey as DalekPublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;
use crate::keys::{PrivateKey, PublicKey};
use crate::types::{KEY_LENGTH, SHARED_KEY_LENGTH};

/// Symmetric key derived for one operation. Never stored.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SharedKey([u8; SHARED_KEY_LENGTH]);

impl SharedKey {
    pub fn as_bytes(&self) -> &[u8; SHARED_KEY_LENGTH] {
        &self.0
    }
}

impl std::fmt::Debug for SharedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SharedKey([REDACTED])")
    }
}

/// Derive the shared key from raw key bytes.
///
/// Fails with `InvalidKeyLength` if either input is not 32 bytes and with
/// `InvalidKeyMaterial` for the all-zero point or any low-order point.
pub fn derive_shared_key(
    local_private: &[u8],
    remote_public: &[u8],
) -> Result<SharedKey, CryptoError> {
    if local_private.len() != KEY_LENGTH {
        return Err(CryptoError::InvalidKeyLength {
            expected: KEY_LENGTH,
            got: local_private.len(),
        });
    }
    let private = PrivateKey::from_bytes(local_private)?;
    let public = PublicKey::from_bytes(remote_public)?;
    agree(&private, &public)
}

/// Derive the shared key from typed keys.
pub fn agree(
    local_private: &PrivateKey,
    remote_public: &PublicKey,
) -> Result<SharedKey, CryptoError> {
    if remote_public.as_bytes().iter().all(|b| *b == 0) {
        return Err(CryptoError::InvalidKeyMaterial("public key is the zero point"));
    }

    let mut raw = scalar_mult(local_private, remote_public)?;
    let key = blake2b_256(&raw);
    raw.zeroize();
    Ok(SharedKey(key))
}

fn scalar_mult(
    local_private: &PrivateKey,
    remote_public: &PublicKey,
) -> Result<[u8; KEY_LENGTH], CryptoError> {
    let secret = StaticSecret::from(*local_private.as_bytes());
    let peer = DalekPublicKey::from(*remote_public.as_bytes());
    let shared = secret.diffie_hellman(&peer);
    if !shared.was_contributory() {
        return Err(CryptoError::InvalidKeyMaterial("public key is a low-order point"));
    }
    Ok(shared.to_bytes())
}

fn blake2b_256(input: &[u8]) -> [u8; SHARED_KEY_LENGTH] {
    let digest = Blake2b::<U32>::digest(input);
    let mut out = [0u8; SHARED_KEY_LENGTH];
    out.copy_from_slice(&digest);
    out
}
