// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pluggable byte encodings for store contents.
//
// The `Codec` trait is the only contract the store has with its on-disk
// format. Two implementations ship with the crate: pretty-printed JSON via
// serde_json (human-readable, the default) and CBOR via ciborium (compact,
// native byte strings for `Data` values).

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::value::{Contents, Value};

/// Converts a store's contents to and from durable bytes.
///
/// Implementations must round-trip every [`Value`] variant, including
/// binary data, and must keep `Integer` distinct from `Real`.
pub trait Codec: Send + Sync {
    /// Serialize the full contents map.
    fn encode(&self, contents: &Contents) -> StoreResult<Vec<u8>>;

    /// Parse bytes previously produced by [`Codec::encode`].
    fn decode(&self, bytes: &[u8]) -> StoreResult<Contents>;

    /// A human-readable name, used in logging.
    fn name(&self) -> &str;

    /// File extension (without the dot) for stores whose location is
    /// derived from their name.
    fn extension(&self) -> &str;
}

/// Selects one of the built-in codecs from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    /// [`JsonCodec`].
    #[default]
    Json,
    /// [`CborCodec`].
    Cbor,
}

impl CodecKind {
    /// Parse a codec name as it appears in configuration (`json`, `cbor`).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Some(CodecKind::Json),
            "cbor" => Some(CodecKind::Cbor),
            _ => None,
        }
    }

    /// Build the codec this kind names.
    pub fn build(self) -> Box<dyn Codec> {
        match self {
            CodecKind::Json => Box::new(JsonCodec),
            CodecKind::Cbor => Box::new(CborCodec),
        }
    }
}

/// Pretty-printed JSON. Each value is wrapped in a single-key object naming
/// its variant, e.g. `{"volume": {"integer": 7}}`.
///
/// JSON has no representation for NaN or infinities; encoding a store that
/// holds one fails rather than silently writing `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, contents: &Contents) -> StoreResult<Vec<u8>> {
        if let Some(key) = contents
            .iter()
            .find(|(_, value)| contains_non_finite(value))
            .map(|(key, _)| key)
        {
            return Err(StoreError::Codec(format!(
                "value for key '{}' contains a non-finite number, which JSON cannot represent",
                key
            )));
        }

        serde_json::to_vec_pretty(contents)
            .map_err(|e| StoreError::Codec(format!("failed to encode JSON: {}", e)))
    }

    fn decode(&self, bytes: &[u8]) -> StoreResult<Contents> {
        serde_json::from_slice(bytes)
            .map_err(|e| StoreError::Codec(format!("failed to decode JSON: {}", e)))
    }

    fn name(&self) -> &str {
        "json"
    }

    fn extension(&self) -> &str {
        "json"
    }
}

/// Compact binary CBOR.
#[derive(Debug, Clone, Copy, Default)]
pub struct CborCodec;

impl Codec for CborCodec {
    fn encode(&self, contents: &Contents) -> StoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(contents, &mut buf)
            .map_err(|e| StoreError::Codec(format!("failed to encode CBOR: {}", e)))?;
        Ok(buf)
    }

    fn decode(&self, bytes: &[u8]) -> StoreResult<Contents> {
        ciborium::from_reader(bytes)
            .map_err(|e| StoreError::Codec(format!("failed to decode CBOR: {}", e)))
    }

    fn name(&self) -> &str {
        "cbor"
    }

    fn extension(&self) -> &str {
        "cbor"
    }
}

fn contains_non_finite(value: &Value) -> bool {
    match value {
        Value::Real(r) => !r.is_finite(),
        Value::Array(items) => items.iter().any(contains_non_finite),
        Value::Dictionary(map) => map.values().any(contains_non_finite),
        Value::String(_) | Value::Data(_) | Value::Integer(_) | Value::Bool(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample() -> Contents {
        let mut nested = BTreeMap::new();
        nested.insert("depth".to_string(), Value::Integer(2));
        nested.insert("blob".to_string(), Value::Data(vec![0, 255, 7]));

        let mut contents = Contents::new();
        contents.insert("name".to_string(), Value::from("lite"));
        contents.insert("count".to_string(), Value::Integer(-12));
        contents.insert("ratio".to_string(), Value::Real(1.0));
        contents.insert("enabled".to_string(), Value::Bool(true));
        contents.insert("raw".to_string(), Value::Data(vec![0xde, 0xad, 0xbe, 0xef]));
        contents.insert(
            "list".to_string(),
            Value::Array(vec![Value::from("a"), Value::Integer(1), Value::Bool(false)]),
        );
        contents.insert("nested".to_string(), Value::Dictionary(nested));
        contents
    }

    #[test]
    fn test_json_round_trip_preserves_variants() {
        let codec = JsonCodec;
        let original = sample();
        let decoded = codec.decode(&codec.encode(&original).unwrap()).unwrap();
        assert_eq!(decoded, original);
        // 1.0 must come back as Real, not Integer.
        assert_eq!(decoded["ratio"], Value::Real(1.0));
    }

    #[test]
    fn test_cbor_round_trip_preserves_variants() {
        let codec = CborCodec;
        let original = sample();
        let decoded = codec.decode(&codec.encode(&original).unwrap()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_json_rejects_non_finite() {
        let mut contents = Contents::new();
        contents.insert(
            "bad".to_string(),
            Value::Array(vec![Value::Real(f64::INFINITY)]),
        );
        match JsonCodec.encode(&contents) {
            Err(StoreError::Codec(msg)) => assert!(msg.contains("bad")),
            other => panic!("expected Codec error, got: {:?}", other),
        }
    }

    #[test]
    fn test_cbor_keeps_nan() {
        let mut contents = Contents::new();
        contents.insert("nan".to_string(), Value::Real(f64::NAN));
        let decoded = CborCodec.decode(&CborCodec.encode(&contents).unwrap()).unwrap();
        match decoded["nan"] {
            Value::Real(r) => assert!(r.is_nan()),
            ref other => panic!("expected Real, got: {:?}", other),
        }
    }

    #[test]
    fn test_decode_garbage_is_codec_error() {
        assert!(matches!(
            JsonCodec.decode(b"not-valid-json!!!"),
            Err(StoreError::Codec(_))
        ));
        assert!(matches!(
            CborCodec.decode(&[0xff, 0x00, 0x13]),
            Err(StoreError::Codec(_))
        ));
    }

    #[test]
    fn test_codec_kind_parse_and_build() {
        assert_eq!(CodecKind::parse("JSON"), Some(CodecKind::Json));
        assert_eq!(CodecKind::parse(" cbor "), Some(CodecKind::Cbor));
        assert_eq!(CodecKind::parse("plist"), None);
        assert_eq!(CodecKind::default(), CodecKind::Json);

        assert_eq!(CodecKind::Json.build().extension(), "json");
        assert_eq!(CodecKind::Cbor.build().name(), "cbor");
    }
}
