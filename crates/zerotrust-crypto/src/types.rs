/// X25519 scalar and point length in bytes.
pub const KEY_LENGTH: usize = 32;

/// Derived symmetric key length in bytes (AES-256).
pub const SHARED_KEY_LENGTH: usize = 32;

/// AES-GCM IV length in bytes (96 bits per NIST recommendation).
pub const AES_GCM_IV_LENGTH: usize = 12;

/// AES-GCM tag length in bytes (128 bits).
pub const AES_GCM_TAG_LENGTH: usize = 16;

/// HMAC-SHA-512 output length in bytes.
pub const MAC_LENGTH: usize = 64;

/// Minimum length of an explicitly supplied HMAC key.
pub const MIN_HMAC_KEY_LENGTH: usize = 32;

/// Default plaintext bound (1 MiB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 1024 * 1024;

/// Default envelope lifetime in seconds (1 hour).
pub const DEFAULT_MAX_AGE_SECS: u64 = 3600;
