// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Read-side coercion from an untyped `Value` to each typed view.
//
// Coercion is permissive: a function here never fails. An absent value or a
// variant with no sensible conversion yields the target type's default. The
// caller therefore cannot tell "missing" from "wrong type" through these
// functions; that ambiguity is part of the public contract and is kept as-is.
//
// Write-side conversion lives in the `From` impls on `Value`, which always
// produce the exact variant for the input type.
//
// # Read policy
//
// | target  | accepted                                                        |
// |---------|-----------------------------------------------------------------|
// | string  | String; Integer / Real rendered in decimal                      |
// | array   | Array                                                           |
// | dict    | Dictionary                                                      |
// | data    | Data                                                            |
// | strings | Array whose elements are all String (otherwise empty)           |
// | integer | Integer; Real truncated (saturating); Bool 0/1; numeric String  |
// | double  | Real; Integer; Bool 0/1; numeric String                         |
// | float   | `double` narrowed to f32                                        |
// | bool    | Bool; non-zero Integer / Real; "true" / "yes" / "1" (any case)  |
// | url     | absolute URL String; String starting with `/` as a file URL     |

use std::collections::BTreeMap;

use url::Url;

use crate::value::Value;

/// Coerce to a string. Numbers render in decimal; other variants give `""`.
pub fn to_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Integer(i)) => i.to_string(),
        Some(Value::Real(r)) => r.to_string(),
        Some(Value::Array(_))
        | Some(Value::Dictionary(_))
        | Some(Value::Data(_))
        | Some(Value::Bool(_))
        | None => String::new(),
    }
}

/// Coerce to an ordered list.
pub fn to_array(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

/// Coerce to a nested mapping.
pub fn to_dictionary(value: Option<&Value>) -> BTreeMap<String, Value> {
    match value {
        Some(Value::Dictionary(map)) => map.clone(),
        _ => BTreeMap::new(),
    }
}

/// Coerce to a binary blob.
pub fn to_data(value: Option<&Value>) -> Vec<u8> {
    match value {
        Some(Value::Data(bytes)) => bytes.clone(),
        _ => Vec::new(),
    }
}

/// Coerce to a list of strings.
///
/// All-or-nothing: a single non-string element discards the whole list.
pub fn to_string_array(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };

    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Some(s.clone()),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .unwrap_or_default()
}

/// Coerce to a signed integer.
pub fn to_integer(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Integer(i)) => *i,
        // `as` saturates at the i64 bounds and maps NaN to 0.
        Some(Value::Real(r)) => *r as i64,
        Some(Value::Bool(b)) => i64::from(*b),
        Some(Value::String(s)) => parse_integer(s),
        Some(Value::Array(_)) | Some(Value::Dictionary(_)) | Some(Value::Data(_)) | None => 0,
    }
}

/// Coerce to a double.
pub fn to_double(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Real(r)) => *r,
        Some(Value::Integer(i)) => *i as f64,
        Some(Value::Bool(b)) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        Some(Value::Array(_)) | Some(Value::Dictionary(_)) | Some(Value::Data(_)) | None => 0.0,
    }
}

/// Coerce to a single-precision float. Same sources as [`to_double`].
pub fn to_float(value: Option<&Value>) -> f32 {
    to_double(value) as f32
}

/// Coerce to a boolean.
pub fn to_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Integer(i)) => *i != 0,
        Some(Value::Real(r)) => *r != 0.0,
        Some(Value::String(s)) => {
            let s = s.trim();
            s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("yes") || s == "1"
        }
        Some(Value::Array(_)) | Some(Value::Dictionary(_)) | Some(Value::Data(_)) | None => false,
    }
}

/// Coerce to a URL. Returns `None` when the stored value is not a string or
/// does not parse.
pub fn to_url(value: Option<&Value>) -> Option<Url> {
    let Some(Value::String(s)) = value else {
        return None;
    };

    if s.starts_with('/') {
        return Url::from_file_path(s).ok();
    }
    Url::parse(s).ok()
}

fn parse_integer(s: &str) -> i64 {
    let s = s.trim();
    s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().map(|r| r as i64))
        .unwrap_or(0)
}
