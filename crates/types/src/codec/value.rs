// Path: crates/types/src/codec/value.rs
//! The value model the wire codec operates on.

use bytes::Bytes;

use super::marshal::Marshalled;

/// A value the canonical codec can serialize.
///
/// The variant chosen for a given piece of data follows the codec's fixed
/// dispatch order (see [`super::serialize`]); values that need type fidelity
/// beyond the native tag set (dates, nested binaries) are wrapped in a
/// [`Marshalled`] envelope, and unknown-shape JSON objects fall through to
/// [`Value::Json`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The absent value (tag 0).
    Null,
    /// A UTF-8 string (tag 1).
    String(String),
    /// A non-negative 32-bit integer (tag 2).
    Uint(u32),
    /// A raw byte buffer (tag 6).
    Bytes(Bytes),
    /// An ordered list of values (tag 4).
    Array(Vec<Value>),
    /// A typed envelope (tag 5).
    Marshalled(Marshalled),
    /// An unknown-shape JSON value (tag 3).
    Json(serde_json::Value),
}

impl Value {
    /// Maps an untyped JSON value onto the codec's dispatch rules: integers
    /// in `u32` range become [`Value::Uint`], arrays stay arrays, objects
    /// fall through to the generic JSON form, and everything the tag set
    /// cannot express (booleans, negative or fractional numbers) is wrapped
    /// in a marshalled envelope.
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Number(n) => {
                if let Some(u) = n.as_u64().filter(|u| *u <= u32::MAX as u64) {
                    Value::Uint(u as u32)
                } else if let Some(i) = n.as_i64() {
                    Value::Marshalled(Marshalled::Integer(i))
                } else {
                    Value::Marshalled(Marshalled::Decimal(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            serde_json::Value::Bool(b) => Value::Marshalled(Marshalled::Boolean(b)),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from_json).collect())
            }
            obj @ serde_json::Value::Object(_) => Value::Json(obj),
        }
    }
}

/// Conversion of a user payload into the codec's value model.
///
/// Implemented for the payload shapes a transaction commonly carries; custom
/// payload types implement it to pick their own canonical representation.
pub trait ToCodecValue {
    /// Returns the canonical codec value for this payload.
    fn to_codec_value(&self) -> Value;
}

impl ToCodecValue for Value {
    fn to_codec_value(&self) -> Value {
        self.clone()
    }
}

impl ToCodecValue for String {
    fn to_codec_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl ToCodecValue for &str {
    fn to_codec_value(&self) -> Value {
        Value::String((*self).to_string())
    }
}

impl ToCodecValue for u32 {
    fn to_codec_value(&self) -> Value {
        Value::Uint(*self)
    }
}

impl ToCodecValue for Vec<u8> {
    fn to_codec_value(&self) -> Value {
        Value::Bytes(Bytes::from(self.clone()))
    }
}

impl ToCodecValue for Bytes {
    fn to_codec_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl ToCodecValue for serde_json::Value {
    fn to_codec_value(&self) -> Value {
        Value::from_json(self.clone())
    }
}

impl ToCodecValue for Marshalled {
    fn to_codec_value(&self) -> Value {
        Value::Marshalled(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_dispatch() {
        assert_eq!(Value::from_json(json!(null)), Value::Null);
        assert_eq!(Value::from_json(json!("s")), Value::String("s".into()));
        assert_eq!(Value::from_json(json!(7)), Value::Uint(7));
        assert_eq!(
            Value::from_json(json!(-7)),
            Value::Marshalled(Marshalled::Integer(-7))
        );
        assert_eq!(
            Value::from_json(json!(1.5)),
            Value::Marshalled(Marshalled::Decimal(1.5))
        );
        assert_eq!(
            Value::from_json(json!(true)),
            Value::Marshalled(Marshalled::Boolean(true))
        );
        assert_eq!(
            Value::from_json(json!([1, "a"])),
            Value::Array(vec![Value::Uint(1), Value::String("a".into())])
        );
        assert!(matches!(
            Value::from_json(json!({ "k": 1 })),
            Value::Json(_)
        ));
    }

    #[test]
    fn test_u32_boundary() {
        assert_eq!(
            Value::from_json(json!(u32::MAX)),
            Value::Uint(u32::MAX)
        );
        assert_eq!(
            Value::from_json(json!(u32::MAX as u64 + 1)),
            Value::Marshalled(Marshalled::Integer(u32::MAX as i64 + 1))
        );
    }
}
