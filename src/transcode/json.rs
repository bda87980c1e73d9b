//! JSON, the internal representation seen by the wrapped application.
//!
//! # Mapping
//! ```text
//! LLSD            JSON
//! undef        ↔  null
//! boolean      ↔  true / false
//! integer      ↔  number (fits in i32)
//! real         ↔  number (anything else); NaN and ±inf cannot be encoded
//! string       ↔  string
//! uri          →  string
//! uuid         →  "6bad258e-06f0-4a87-a659-493117c9c162"
//! date         →  "2006-02-01T14:29:53.430000Z"
//! binary       →  standard padded base64 string
//! array        ↔  array
//! map          ↔  object
//! ```

use serde_json::{Map, Number};

use crate::llsd::{self, Value};

use super::TranscodeError;

/// Convert an LLSD value into a JSON value.
pub fn to_json(value: &Value) -> Result<serde_json::Value, TranscodeError> {
    Ok(match value {
        Value::Undefined => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Integer(i) => serde_json::Value::Number((*i).into()),
        Value::Real(r) => Number::from_f64(*r)
            .map(serde_json::Value::Number)
            .ok_or_else(|| TranscodeError::Encode(format!("real {r}")))?,
        Value::String(s) | Value::Uri(s) => serde_json::Value::String(s.clone()),
        Value::Uuid(u) => serde_json::Value::String(u.hyphenated().to_string()),
        Value::Date(d) => serde_json::Value::String(d.to_string()),
        Value::Binary(b) => serde_json::Value::String(llsd::encode_base64(b)),
        Value::Array(items) => serde_json::Value::Array(
            items.iter().map(to_json).collect::<Result<_, _>>()?,
        ),
        Value::Map(entries) => serde_json::Value::Object(
            entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), to_json(v)?)))
                .collect::<Result<Map<_, _>, TranscodeError>>()?,
        ),
    })
}

/// Convert a JSON value into an LLSD value.
pub fn from_json(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Undefined,
        serde_json::Value::Bool(b) => Value::Boolean(*b),
        serde_json::Value::Number(n) => match n.as_i64().and_then(|i| i32::try_from(i).ok()) {
            Some(i) => Value::Integer(i),
            // as_f64 only fails for arbitrary-precision numbers, which are not enabled.
            None => Value::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::Array(items.iter().map(from_json).collect()),
        serde_json::Value::Object(entries) => Value::Map(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), from_json(v)))
                .collect(),
        ),
    }
}

/// Serialize an LLSD value as JSON bytes.
pub fn encode(value: &Value) -> Result<Vec<u8>, TranscodeError> {
    serde_json::to_vec(&to_json(value)?).map_err(|e| TranscodeError::Encode(e.to_string()))
}

/// Parse JSON bytes into an LLSD value.
pub fn decode(bytes: &[u8]) -> Result<Value, TranscodeError> {
    let json: serde_json::Value = serde_json::from_slice(bytes).map_err(TranscodeError::InvalidJson)?;
    Ok(from_json(&json))
}
