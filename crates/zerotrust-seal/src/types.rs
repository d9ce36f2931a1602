use zerotrust_crypto::{PublicKey, AES_GCM_IV_LENGTH, AES_GCM_TAG_LENGTH, MAC_LENGTH};

/// Everything in an envelope except the MAC. This is what the MAC covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeBody {
    /// Fresh per encryption.
    pub iv: [u8; AES_GCM_IV_LENGTH],
    /// AES-GCM tag, never appended to `value`.
    pub tag: [u8; AES_GCM_TAG_LENGTH],
    /// Ciphertext, same length as the plaintext.
    pub value: Vec<u8>,
    /// The sender's public point.
    pub public_key: PublicKey,
    /// Unix seconds at encryption time.
    pub issued_at: u64,
}

/// One sealed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub body: EnvelopeBody,
    /// HMAC-SHA-512 over the canonical rendering of `body`.
    pub mac: [u8; MAC_LENGTH],
}

/// Result of a successful unseal.
#[derive(Clone)]
pub struct Unsealed {
    pub plaintext: Vec<u8>,
    /// The public key the shared key was derived against.
    pub sender: PublicKey,
}

impl std::fmt::Debug for Unsealed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsealed")
            .field("plaintext", &format_args!("[REDACTED; {} bytes]", self.plaintext.len()))
            .field("sender", &self.sender)
            .finish()
    }
}
