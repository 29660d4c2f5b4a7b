// Path: crates/types/src/codec/marshal.rs
//! The typed envelope for values the tag set cannot discriminate natively.
//!
//! A marshalled value travels as the JSON object `{"$mid": <int>, "value": …}`
//! so that binary data and dates survive a round trip through the codec. The
//! `$mid` integers are fixed; changing one is a wire-format break.

use std::collections::BTreeMap;

use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;

use crate::error::ChainError;
use crate::Result;

/// Marshal id for the `Null` variant.
pub const MID_NULL: u8 = 0;
/// Marshal id for the `Binary` variant.
pub const MID_BINARY: u8 = 1;
/// Marshal id for the `String` variant.
pub const MID_STRING: u8 = 2;
/// Marshal id for the `Integer` variant.
pub const MID_INTEGER: u8 = 3;
/// Marshal id for the `Decimal` variant.
pub const MID_DECIMAL: u8 = 4;
/// Marshal id for the `Boolean` variant.
pub const MID_BOOLEAN: u8 = 5;
/// Marshal id for the `Object` variant.
pub const MID_OBJECT: u8 = 6;
/// Marshal id for the `Array` variant.
pub const MID_ARRAY: u8 = 7;
/// Marshal id for the `Date` variant.
pub const MID_DATE: u8 = 8;

/// A value reconstructible with full type fidelity from its JSON envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum Marshalled {
    /// The absent value.
    Null,
    /// Raw bytes; travels base64-encoded.
    Binary(Bytes),
    /// A UTF-8 string.
    String(String),
    /// A signed integer.
    Integer(i64),
    /// A floating-point number.
    Decimal(f64),
    /// A boolean.
    Boolean(bool),
    /// A string-keyed mapping of marshalled values. Kept ordered so the
    /// envelope serializes deterministically.
    Object(BTreeMap<String, Marshalled>),
    /// An ordered list of marshalled values.
    Array(Vec<Marshalled>),
    /// A point in time; travels as an ISO-8601 string.
    Date(DateTime<Utc>),
}

impl Marshalled {
    /// Returns the `$mid` discriminator for this variant.
    pub fn mid(&self) -> u8 {
        match self {
            Self::Null => MID_NULL,
            Self::Binary(_) => MID_BINARY,
            Self::String(_) => MID_STRING,
            Self::Integer(_) => MID_INTEGER,
            Self::Decimal(_) => MID_DECIMAL,
            Self::Boolean(_) => MID_BOOLEAN,
            Self::Object(_) => MID_OBJECT,
            Self::Array(_) => MID_ARRAY,
            Self::Date(_) => MID_DATE,
        }
    }

    /// Produces the `{"$mid": …, "value": …}` JSON envelope.
    pub fn to_json(&self) -> serde_json::Value {
        let value = match self {
            Self::Null => serde_json::Value::Null,
            Self::Binary(bytes) => {
                json!(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            Self::String(s) => json!(s),
            Self::Integer(i) => json!(i),
            Self::Decimal(d) => json!(d),
            Self::Boolean(b) => json!(b),
            Self::Object(map) => {
                let mut out = serde_json::Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), v.to_json());
                }
                serde_json::Value::Object(out)
            }
            Self::Array(items) => {
                serde_json::Value::Array(items.iter().map(Marshalled::to_json).collect())
            }
            Self::Date(dt) => json!(dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
        };
        json!({ "$mid": self.mid(), "value": value })
    }

    /// Revives a marshalled value from its JSON envelope.
    pub fn from_json(envelope: &serde_json::Value) -> Result<Self> {
        let mid = envelope
            .get("$mid")
            .and_then(serde_json::Value::as_u64)
            .and_then(|m| u8::try_from(m).ok())
            .ok_or_else(|| ChainError::InvalidType("marshalled envelope without $mid".into()))?;
        let value = envelope.get("value").unwrap_or(&serde_json::Value::Null);

        let wrong = |expected: &str| {
            ChainError::InvalidType(format!("marshalled value is not a {expected}"))
        };

        match mid {
            MID_NULL => Ok(Self::Null),
            MID_BINARY => {
                let text = value.as_str().ok_or_else(|| wrong("base64 string"))?;
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(text)
                    .map_err(|e| ChainError::InvalidType(format!("invalid base64: {e}")))?;
                Ok(Self::Binary(Bytes::from(bytes)))
            }
            MID_STRING => Ok(Self::String(
                value.as_str().ok_or_else(|| wrong("string"))?.to_string(),
            )),
            MID_INTEGER => Ok(Self::Integer(
                value.as_i64().ok_or_else(|| wrong("integer"))?,
            )),
            MID_DECIMAL => Ok(Self::Decimal(
                value.as_f64().ok_or_else(|| wrong("number"))?,
            )),
            MID_BOOLEAN => Ok(Self::Boolean(
                value.as_bool().ok_or_else(|| wrong("boolean"))?,
            )),
            MID_OBJECT => {
                let obj = value.as_object().ok_or_else(|| wrong("object"))?;
                let mut map = BTreeMap::new();
                for (k, v) in obj {
                    map.insert(k.clone(), Self::from_json(v)?);
                }
                Ok(Self::Object(map))
            }
            MID_ARRAY => {
                let items = value.as_array().ok_or_else(|| wrong("array"))?;
                items
                    .iter()
                    .map(Self::from_json)
                    .collect::<Result<Vec<_>>>()
                    .map(Self::Array)
            }
            MID_DATE => {
                let text = value.as_str().ok_or_else(|| wrong("date string"))?;
                let parsed = DateTime::parse_from_rfc3339(text)
                    .map_err(|e| ChainError::InvalidType(format!("invalid date string: {e}")))?;
                Ok(Self::Date(parsed.with_timezone(&Utc)))
            }
            other => Err(ChainError::InvalidType(format!(
                "unknown marshal id {other}"
            ))),
        }
    }

    /// Converts an untyped JSON value into its marshalled form.
    pub fn from_json_untyped(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Boolean(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Integer(i)
                } else {
                    Self::Decimal(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Self::String(s.clone()),
            serde_json::Value::Array(items) => {
                Self::Array(items.iter().map(Self::from_json_untyped).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json_untyped(v)))
                    .collect(),
            ),
        }
    }
}
