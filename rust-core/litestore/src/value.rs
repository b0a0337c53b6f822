// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The untyped value cell stored under each key.
//
// `Value` is a closed sum type. Every codec round-trips every variant, so a
// store's contents can never hold something the persistence layer cannot
// write back out.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

/// The in-memory contents of a store: key to untyped value, sorted by key so
/// that encoded files are stable across runs.
pub type Contents = BTreeMap<String, Value>;

/// A single stored value.
///
/// The variant is chosen at write time (by the typed setter used, or by the
/// shape handed to [`crate::Store::set`]) and is preserved until overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// UTF-8 text.
    String(String),
    /// Ordered list of values.
    Array(Vec<Value>),
    /// Nested mapping from string key to value.
    Dictionary(BTreeMap<String, Value>),
    /// Opaque binary blob. CBOR writes a native byte string; JSON writes
    /// an array of numbers.
    Data(#[serde(with = "serde_bytes")] Vec<u8>),
    /// Signed 64-bit integer.
    Integer(i64),
    /// 64-bit float. Single-precision writes are widened into this variant.
    Real(f64),
    /// Boolean flag.
    Bool(bool),
}

impl Value {
    /// Short lowercase name of the variant, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Dictionary(_) => "dictionary",
            Value::Data(_) => "data",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Bool(_) => "bool",
        }
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Dictionary(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Data(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Data(v.to_vec())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Real(f64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

/// URLs are stored as their serialized string form.
impl From<&Url> for Value {
    fn from(v: &Url) -> Self {
        Value::String(v.as_str().to_string())
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::Array(v.into_iter().map(Value::String).collect())
    }
}
