//! JSON value encoding for cache storage.
//!
//! Values are stored as strings. Structured values (objects, arrays, numbers,
//! booleans) are written as JSON text; a plain string is written as-is so other
//! clients of the keyspace can read it without unquoting.
//!
//! ```text
//! Value                      stored as
//! ─────────────────────────  ─────────────────────
//! "hypeMan"                  hypeMan
//! {"id":1,"name":"Alice"}    {"id":1,"name":"Alice"}
//! [1,2,3]                    [1,2,3]
//! ```
//!
//! Reading is lenient: whatever parses as JSON comes back as JSON, and anything
//! else comes back as the raw string. A stored `"42"` string therefore reads
//! back as the number 42.
//!
//! # Example
//!
//! ```rust
//! use cache_shell::serialization::{decode_value, encode_value};
//! use serde_json::json;
//!
//! let taxonomy = json!({ "id": 7, "labels": ["a", "b"] });
//! let stored = encode_value(&taxonomy);
//! assert_eq!(decode_value(stored), Some(taxonomy));
//!
//! assert_eq!(encode_value(&json!("hypeMan")), "hypeMan");
//! assert_eq!(decode_value("hypeMan".to_string()), Some(json!("hypeMan")));
//! ```

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Encode a value into its stored string form.
pub fn encode_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Decode a stored string.
///
/// Returns `None` for a stored JSON `null`, so a cached null reads the same as
/// a missing key.
pub fn decode_value(raw: String) -> Option<Value> {
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(e) => {
            trace!("Stored value is not JSON ({}), returning raw string", e);
            Some(Value::String(raw))
        }
    }
}

/// Convert a typed payload into a cacheable value.
///
/// # Errors
///
/// Returns `Error::SerializationError` if the payload's `Serialize`
/// implementation fails (e.g. a map with non-string keys).
pub fn to_value<T: Serialize + ?Sized>(payload: &T) -> Result<Value> {
    serde_json::to_value(payload).map_err(|e| {
        error!("Cache serialization failed: {}", e);
        Error::SerializationError(e.to_string())
    })
}

/// Convert a cached value into a typed payload.
///
/// # Errors
///
/// Returns `Error::DeserializationError` if the value does not have the shape
/// of `T`.
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        warn!("Cached value does not match requested type: {}", e);
        Error::DeserializationError(e.to_string())
    })
}
