//! Request boundary.
//!
//! Inbound: if the request carries the envelope field, unseal it, merge the
//! plaintext JSON object into the request fields and attach the sender's
//! public key. Outbound: seal a response body to a client's key.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use zerotrust_crypto::{base64_decode, PublicKey, KEY_LENGTH};
use zerotrust_seal::SealedTransport;

use crate::error::{GateError, Rejection};

/// Key under which a sealed response is returned.
pub const RESPONSE_FIELD: &str = "server";

/// Length of a standard-base64 rendering of a 32-byte key.
const ENCODED_KEY_LENGTH: usize = 44;

pub type Fields = Map<String, Value>;

/// Parse a client public key as submitted in a form field.
///
/// Exactly 44 characters of the standard base64 alphabet that decode to
/// 32 bytes.
pub fn parse_client_public_key(value: &str) -> Result<PublicKey, GateError> {
    if value.len() != ENCODED_KEY_LENGTH {
        return Err(GateError::InvalidPublicKey(format!(
            "expected {ENCODED_KEY_LENGTH} characters, got {}",
            value.len()
        )));
    }
    if !value
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
    {
        return Err(GateError::InvalidPublicKey(
            "contains characters outside the base64 alphabet".into(),
        ));
    }
    let bytes = base64_decode(value).map_err(|e| GateError::InvalidPublicKey(e.to_string()))?;
    if bytes.len() != KEY_LENGTH {
        return Err(GateError::InvalidPublicKey(format!(
            "expected {KEY_LENGTH} bytes, got {}",
            bytes.len()
        )));
    }
    PublicKey::from_bytes(&bytes).map_err(|e| GateError::InvalidPublicKey(e.to_string()))
}

#[derive(Debug, Clone)]
pub struct SealGate {
    transport: Arc<SealedTransport>,
}

impl SealGate {
    pub fn new(transport: Arc<SealedTransport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &SealedTransport {
        &self.transport
    }

    /// Unseal the envelope field, if any, into the request fields.
    ///
    /// Without the envelope field the fields come back untouched. With it,
    /// the plaintext must be a JSON object; its members overwrite same-named
    /// request fields, the envelope field is dropped, and the sender key
    /// field is written last so the plaintext cannot set it.
    pub fn open(&self, fields: Fields) -> Result<Fields, Rejection> {
        Ok(self.try_open(fields)?)
    }

    /// Seal `body` for `recipient` and return the wire string.
    pub fn seal_response(&self, body: &[u8], recipient: &PublicKey) -> Result<String, Rejection> {
        let sealed = self
            .transport
            .seal(body, Some(recipient), None)
            .map_err(GateError::from)?;
        Ok(sealed)
    }

    /// Serialize `value`, seal it and wrap it as `{"server": "<sealed>"}`.
    pub fn seal_json_response(
        &self,
        value: &Value,
        recipient: &PublicKey,
    ) -> Result<Value, Rejection> {
        let body =
            serde_json::to_vec(value).map_err(|e| GateError::Serialization(e.to_string()))?;
        let sealed = self.seal_response(&body, recipient)?;
        Ok(json!({ RESPONSE_FIELD: sealed }))
    }

    /// Unseal the request and seal the same plaintext straight back to its
    /// sender. Lets a client confirm both directions of the channel.
    ///
    /// Returns `None` when the request carries no envelope.
    pub fn echo(&self, fields: &Fields) -> Result<Option<Value>, Rejection> {
        let Some(raw) = fields.get(&self.transport.config().envelope_field) else {
            return Ok(None);
        };
        let sealed = raw.as_str().ok_or(GateError::EnvelopeNotString)?;
        let unsealed = self
            .transport
            .unseal_with_sender(sealed, None, None, None)
            .map_err(GateError::from)?;
        let resealed = self.seal_response(&unsealed.plaintext, &unsealed.sender)?;
        Ok(Some(json!({ RESPONSE_FIELD: resealed })))
    }

    /// Read back the sender key an earlier [`SealGate::open`] attached.
    pub fn sender_public_key(&self, fields: &Fields) -> Result<PublicKey, Rejection> {
        let field = &self.transport.config().sender_key_field;
        let value = fields
            .get(field)
            .and_then(Value::as_str)
            .ok_or_else(|| GateError::InvalidPublicKey(format!("{field} is missing")))?;
        Ok(parse_client_public_key(value)?)
    }

    fn try_open(&self, mut fields: Fields) -> Result<Fields, GateError> {
        let config = self.transport.config();
        let Some(raw) = fields.shift_remove(&config.envelope_field) else {
            return Ok(fields);
        };
        let sealed = raw.as_str().ok_or(GateError::EnvelopeNotString)?;

        let unsealed = self.transport.unseal_with_sender(sealed, None, None, None)?;
        let text =
            std::str::from_utf8(&unsealed.plaintext).map_err(|_| GateError::PlaintextNotUtf8)?;
        let Ok(Value::Object(plain)) = serde_json::from_str::<Value>(text) else {
            return Err(GateError::PlaintextNotObject);
        };

        tracing::debug!(merged = plain.len(), "opened sealed request");
        fields.extend(plain);
        fields.insert(
            config.sender_key_field.clone(),
            Value::String(unsealed.sender.to_base64()),
        );
        Ok(fields)
    }
}
