//! HMAC integrity and freshness checks over a decoded envelope.

use zerotrust_crypto::{hmac_sha512, verify_hmac_sha512, MAC_LENGTH};

use crate::envelope::canonical_mac_input;
use crate::error::SealError;
use crate::types::{Envelope, EnvelopeBody};

/// HMAC-SHA-512 over the canonical rendering of the five non-MAC fields.
pub fn compute_mac(key: &[u8], body: &EnvelopeBody) -> Result<[u8; MAC_LENGTH], SealError> {
    let input = canonical_mac_input(body)?;
    Ok(hmac_sha512(key, &input)?)
}

/// Recompute the MAC and compare it with `envelope.mac` in constant time.
pub fn verify_mac(key: &[u8], envelope: &Envelope) -> Result<bool, SealError> {
    let input = canonical_mac_input(&envelope.body)?;
    Ok(verify_hmac_sha512(key, &input, &envelope.mac)?)
}

/// `true` unless `now - issued_at` exceeds `max_age`. A future `issued_at`
/// has a negative age and passes.
pub fn check_freshness(issued_at: u64, max_age: u64, now: u64) -> bool {
    now.saturating_sub(issued_at) <= max_age
}

/// Age policy applied after the MAC has been verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    pub max_age_secs: u64,
    /// How far ahead of `now` an `issued_at` may sit. `None` means unbounded.
    pub max_future_skew_secs: Option<u64>,
}

impl FreshnessPolicy {
    pub fn new(max_age_secs: u64) -> Self {
        Self {
            max_age_secs,
            max_future_skew_secs: None,
        }
    }

    pub fn with_max_future_skew(mut self, skew: Option<u64>) -> Self {
        self.max_future_skew_secs = skew;
        self
    }

    pub fn check(&self, issued_at: u64, now: u64) -> Result<(), SealError> {
        if !check_freshness(issued_at, self.max_age_secs, now) {
            return Err(SealError::Expired {
                age: now - issued_at,
                max_age: self.max_age_secs,
            });
        }
        if let Some(max_skew) = self.max_future_skew_secs {
            let ahead = issued_at.saturating_sub(now);
            if ahead > max_skew {
                return Err(SealError::IssuedInFuture { ahead, max_skew });
            }
        }
        Ok(())
    }
}
