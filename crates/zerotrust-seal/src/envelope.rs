//! Envelope wire codec.
//!
//! Wire format: base64(JSON) with keys in this exact order:
//! `{"iv":…,"tag":…,"value":…,"public_key":…,"issued_at":N,"mac":…}`
//!
//! The MAC input is the same compact JSON minus `mac`. Both renderings come
//! from structs whose declaration order is the wire order; serde_json emits
//! no whitespace and never escapes `/`, so the bytes match what PHP's
//! `json_encode(.., JSON_UNESCAPED_SLASHES)` and JS `JSON.stringify` produce
//! for the same fields. Every byte field is standard padded base64.

use serde::Serialize;
use serde_json::{Map, Value};
use zerotrust_crypto::{
    base64_decode, base64_encode, PublicKey, AES_GCM_IV_LENGTH, AES_GCM_TAG_LENGTH, KEY_LENGTH,
    MAC_LENGTH,
};

use crate::error::SealError;
use crate::types::{Envelope, EnvelopeBody};

/// Wire keys, in canonical order.
pub const FIELD_IV: &str = "iv";
pub const FIELD_TAG: &str = "tag";
pub const FIELD_VALUE: &str = "value";
pub const FIELD_PUBLIC_KEY: &str = "public_key";
pub const FIELD_ISSUED_AT: &str = "issued_at";
pub const FIELD_MAC: &str = "mac";

/// Fixed overhead allowance for the JSON scaffolding and fixed-size fields.
const ENVELOPE_OVERHEAD: usize = 512;

#[derive(Serialize)]
struct MacInput<'a> {
    iv: &'a str,
    tag: &'a str,
    value: &'a str,
    public_key: &'a str,
    issued_at: u64,
}

#[derive(Serialize)]
struct WireEnvelope<'a> {
    iv: &'a str,
    tag: &'a str,
    value: &'a str,
    public_key: &'a str,
    issued_at: u64,
    mac: &'a str,
}

struct EncodedBody {
    iv: String,
    tag: String,
    value: String,
    public_key: String,
    issued_at: u64,
}

impl EncodedBody {
    fn new(body: &EnvelopeBody) -> Self {
        Self {
            iv: base64_encode(&body.iv),
            tag: base64_encode(&body.tag),
            value: base64_encode(&body.value),
            public_key: body.public_key.to_base64(),
            issued_at: body.issued_at,
        }
    }
}

/// Canonical bytes the MAC is computed over.
pub fn canonical_mac_input(body: &EnvelopeBody) -> Result<Vec<u8>, SealError> {
    let encoded = EncodedBody::new(body);
    serde_json::to_vec(&MacInput {
        iv: &encoded.iv,
        tag: &encoded.tag,
        value: &encoded.value,
        public_key: &encoded.public_key,
        issued_at: encoded.issued_at,
    })
    .map_err(|e| SealError::Serialization(e.to_string()))
}

/// Serialize an envelope to its wire string.
pub fn encode_envelope(envelope: &Envelope) -> Result<String, SealError> {
    let encoded = EncodedBody::new(&envelope.body);
    let mac = base64_encode(&envelope.mac);
    let json = serde_json::to_vec(&WireEnvelope {
        iv: &encoded.iv,
        tag: &encoded.tag,
        value: &encoded.value,
        public_key: &encoded.public_key,
        issued_at: encoded.issued_at,
        mac: &mac,
    })
    .map_err(|e| SealError::Serialization(e.to_string()))?;
    Ok(base64_encode(&json))
}

/// Largest wire string that can carry a plaintext of `max_payload` bytes.
///
/// Saturates at `usize::MAX` (no bound) when the computation overflows.
pub fn max_encoded_len(max_payload: usize) -> usize {
    let b64 = |n: usize| n.div_ceil(3).checked_mul(4);
    b64(max_payload)
        .and_then(|inner| inner.checked_add(ENVELOPE_OVERHEAD))
        .and_then(b64)
        .unwrap_or(usize::MAX)
}

/// Parse a wire string into an envelope.
///
/// Every check here is structural; nothing cryptographic runs. Any missing,
/// empty or mistyped key, or any field with the wrong decoded length, is a
/// `MalformedEnvelope`.
pub fn decode_envelope(encoded: &str) -> Result<Envelope, SealError> {
    if encoded.trim().is_empty() {
        return Err(SealError::MalformedEnvelope("empty envelope".to_string()));
    }

    let json = base64_decode(encoded)
        .map_err(|_| SealError::MalformedEnvelope("envelope is not valid base64".to_string()))?;
    let document: Value = serde_json::from_slice(&json)
        .map_err(|_| SealError::MalformedEnvelope("envelope is not valid JSON".to_string()))?;
    let object = document
        .as_object()
        .ok_or_else(|| SealError::MalformedEnvelope("envelope is not a JSON object".to_string()))?;

    let iv = fixed_field::<AES_GCM_IV_LENGTH>(object, FIELD_IV)?;
    let tag = fixed_field::<AES_GCM_TAG_LENGTH>(object, FIELD_TAG)?;
    let value = bytes_field(object, FIELD_VALUE)?;
    let public_key = PublicKey::from(fixed_field::<KEY_LENGTH>(object, FIELD_PUBLIC_KEY)?);
    let issued_at = object
        .get(FIELD_ISSUED_AT)
        .and_then(Value::as_u64)
        .ok_or_else(|| {
            SealError::MalformedEnvelope(format!(
                "{FIELD_ISSUED_AT} must be a non-negative integer"
            ))
        })?;
    let mac = fixed_field::<MAC_LENGTH>(object, FIELD_MAC)?;

    Ok(Envelope {
        body: EnvelopeBody {
            iv,
            tag,
            value,
            public_key,
            issued_at,
        },
        mac,
    })
}

fn string_field<'a>(object: &'a Map<String, Value>, key: &str) -> Result<&'a str, SealError> {
    match object.get(key).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        Some(_) => Err(SealError::MalformedEnvelope(format!("{key} is empty"))),
        None => Err(SealError::MalformedEnvelope(format!(
            "{key} is missing or not a string"
        ))),
    }
}

fn bytes_field(object: &Map<String, Value>, key: &str) -> Result<Vec<u8>, SealError> {
    let decoded = base64_decode(string_field(object, key)?)
        .map_err(|_| SealError::MalformedEnvelope(format!("{key} is not valid base64")))?;
    if decoded.is_empty() {
        return Err(SealError::MalformedEnvelope(format!("{key} is empty")));
    }
    Ok(decoded)
}

fn fixed_field<const N: usize>(
    object: &Map<String, Value>,
    key: &str,
) -> Result<[u8; N], SealError> {
    let decoded = bytes_field(object, key)?;
    <[u8; N]>::try_from(decoded.as_slice()).map_err(|_| {
        SealError::MalformedEnvelope(format!(
            "{key} must decode to {N} bytes, got {}",
            decoded.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SealErrorKind;
    use serde_json::json;

    fn sample() -> Envelope {
        Envelope {
            body: EnvelopeBody {
                iv: [1u8; 12],
                tag: [2u8; 16],
                value: vec![0xfb, 0xff, 0xfe, 4, 5],
                public_key: PublicKey::from([3u8; 32]),
                issued_at: 1_700_000_000,
            },
            mac: [9u8; 64],
        }
    }

    fn wire(value: &Value) -> String {
        base64_encode(serde_json::to_string(value).unwrap().as_bytes())
    }

    fn sample_json() -> Value {
        let encoded = encode_envelope(&sample()).unwrap();
        serde_json::from_slice(&base64_decode(&encoded).unwrap()).unwrap()
    }

    #[test]
    fn round_trip() {
        let envelope = sample();
        let encoded = encode_envelope(&envelope).unwrap();
        assert_eq!(decode_envelope(&encoded).unwrap(), envelope);
    }

    #[test]
    fn canonical_field_order() {
        let encoded = encode_envelope(&sample()).unwrap();
        let json = String::from_utf8(base64_decode(&encoded).unwrap()).unwrap();
        let keys = [
            "\"iv\"",
            "\"tag\"",
            "\"value\"",
            "\"public_key\"",
            "\"issued_at\"",
            "\"mac\"",
        ];
        let positions: Vec<usize> = keys.iter().map(|k| json.find(k).unwrap()).collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
        assert!(json.ends_with(&format!("\"mac\":\"{}\"}}", base64_encode(&[9u8; 64]))));
    }

    #[test]
    fn mac_input_is_byte_exact() {
        let input = canonical_mac_input(&sample().body).unwrap();
        let expected = format!(
            concat!(
                "{{\"iv\":\"{}\",\"tag\":\"{}\",\"value\":\"+//+BAU=\",",
                "\"public_key\":\"{}\",\"issued_at\":1700000000}}"
            ),
            base64_encode(&[1u8; 12]),
            base64_encode(&[2u8; 16]),
            base64_encode(&[3u8; 32]),
        );
        assert_eq!(String::from_utf8(input).unwrap(), expected);
    }

    #[test]
    fn slashes_are_not_escaped() {
        let input = String::from_utf8(canonical_mac_input(&sample().body).unwrap()).unwrap();
        assert!(input.contains("+//+"));
        assert!(!input.contains("\\/"));
    }

    #[test]
    fn extra_keys_are_ignored() {
        let mut doc = sample_json();
        doc["extra"] = json!("ignored");
        assert_eq!(decode_envelope(&wire(&doc)).unwrap(), sample());
    }

    #[test]
    fn rejects_invalid_base64() {
        let err = decode_envelope("%%%not-base64%%%").unwrap_err();
        assert_eq!(err.kind(), SealErrorKind::MalformedEnvelope);
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(decode_envelope("").unwrap_err().kind(), SealErrorKind::MalformedEnvelope);
        assert_eq!(decode_envelope("   ").unwrap_err().kind(), SealErrorKind::MalformedEnvelope);
    }

    #[test]
    fn rejects_invalid_json() {
        let err = decode_envelope(&base64_encode(b"{not json")).unwrap_err();
        assert_eq!(err.kind(), SealErrorKind::MalformedEnvelope);
    }

    #[test]
    fn rejects_non_object_json() {
        let err = decode_envelope(&base64_encode(b"[1,2,3]")).unwrap_err();
        assert_eq!(err.kind(), SealErrorKind::MalformedEnvelope);
    }

    #[test]
    fn rejects_each_missing_key() {
        let keys = [
            FIELD_IV,
            FIELD_TAG,
            FIELD_VALUE,
            FIELD_PUBLIC_KEY,
            FIELD_ISSUED_AT,
            FIELD_MAC,
        ];
        for key in keys {
            let mut doc = sample_json();
            doc.as_object_mut().unwrap().remove(key);
            let err = decode_envelope(&wire(&doc)).unwrap_err();
            assert_eq!(err.kind(), SealErrorKind::MalformedEnvelope, "missing {key}");
        }
    }

    #[test]
    fn rejects_empty_string_fields() {
        for key in [FIELD_IV, FIELD_TAG, FIELD_VALUE, FIELD_PUBLIC_KEY, FIELD_MAC] {
            let mut doc = sample_json();
            doc[key] = json!("");
            let err = decode_envelope(&wire(&doc)).unwrap_err();
            assert_eq!(err.kind(), SealErrorKind::MalformedEnvelope, "empty {key}");
        }
    }

    #[test]
    fn rejects_mistyped_fields() {
        let mut doc = sample_json();
        doc[FIELD_IV] = json!(12);
        assert!(decode_envelope(&wire(&doc)).is_err());

        for bad in [json!("1700000000"), json!(-5), json!(1.5), json!(null)] {
            let mut doc = sample_json();
            doc[FIELD_ISSUED_AT] = bad;
            let err = decode_envelope(&wire(&doc)).unwrap_err();
            assert_eq!(err.kind(), SealErrorKind::MalformedEnvelope);
        }
    }

    #[test]
    fn accepts_zero_issued_at() {
        let mut doc = sample_json();
        doc[FIELD_ISSUED_AT] = json!(0);
        assert_eq!(decode_envelope(&wire(&doc)).unwrap().body.issued_at, 0);
    }

    #[test]
    fn rejects_short_public_key() {
        let mut doc = sample_json();
        doc[FIELD_PUBLIC_KEY] = json!(base64_encode(&[3u8; 31]));
        let err = decode_envelope(&wire(&doc)).unwrap_err();
        assert_eq!(err.kind(), SealErrorKind::MalformedEnvelope);
        assert!(err.to_string().contains("public_key must decode to 32 bytes, got 31"));
    }

    #[test]
    fn rejects_wrong_fixed_lengths() {
        for (key, len) in [(FIELD_IV, 11), (FIELD_TAG, 15), (FIELD_MAC, 32)] {
            let mut doc = sample_json();
            doc[key] = json!(base64_encode(&vec![0u8; len]));
            let err = decode_envelope(&wire(&doc)).unwrap_err();
            assert_eq!(err.kind(), SealErrorKind::MalformedEnvelope, "{key}");
        }
    }

    #[test]
    fn rejects_url_safe_field_encoding() {
        let mut doc = sample_json();
        doc[FIELD_VALUE] = json!("-__-");
        let err = decode_envelope(&wire(&doc)).unwrap_err();
        assert_eq!(err.kind(), SealErrorKind::MalformedEnvelope);
    }

    #[test]
    fn max_encoded_len_saturates_on_overflow() {
        assert_eq!(max_encoded_len(usize::MAX), usize::MAX);
        assert_eq!(max_encoded_len(usize::MAX / 4 * 3), usize::MAX);
        assert!(max_encoded_len(1024 * 1024) > 1024 * 1024);
    }

    #[test]
    fn max_encoded_len_covers_real_envelopes() {
        let mut envelope = sample();
        envelope.body.value = vec![0xaa; 1000];
        let encoded = encode_envelope(&envelope).unwrap();
        assert!(encoded.len() <= max_encoded_len(1000));
    }
}
