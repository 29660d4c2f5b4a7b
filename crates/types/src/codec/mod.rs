// Path: crates/types/src/codec/mod.rs
//! The canonical, deterministic binary codec for all signed state.
//!
//! Every value is encoded as `tag(1 byte) || body`, with lengths carried as
//! little-endian base-128 varints (VQL). Centralizing the codec here in the
//! base `types` crate ensures every component produces the exact same byte
//! stream for the same value; that canonicality is what makes signatures
//! over serialized blocks reproducible.
//!
//! The dispatch order of [`serialize`] is part of the wire contract:
//! null, string, byte buffer, 32-bit unsigned integer, array, marshalled
//! envelope, and finally the generic JSON object form. Deserialization is
//! strictly tag-driven.

/// Scoped writer/reader buffer primitives.
pub mod buffer;
/// The `{"$mid": …}` typed envelope for dates, binaries and friends.
pub mod marshal;
/// The value model the codec operates on.
pub mod value;

pub use buffer::{ByteReader, ByteWriter};
pub use marshal::Marshalled;
pub use value::{ToCodecValue, Value};

use bytes::Bytes;

use crate::error::ChainError;
use crate::Result;

/// Tag for the absent value.
pub const TAG_NULL: u8 = 0;
/// Tag for a UTF-8 string.
pub const TAG_STRING: u8 = 1;
/// Tag for a non-negative 32-bit integer.
pub const TAG_UINT: u8 = 2;
/// Tag for a generic JSON object body.
pub const TAG_JSON: u8 = 3;
/// Tag for an array of encoded elements.
pub const TAG_ARRAY: u8 = 4;
/// Tag for a marshalled-envelope JSON body.
pub const TAG_MARSHALLED: u8 = 5;
/// Tag for a raw byte buffer.
pub const TAG_BYTES: u8 = 6;

/// Appends the VQL encoding of `value` to `out`.
///
/// Each emitted byte carries 7 value bits, low group first; the high bit is
/// the continuation flag. Zero emits exactly one `0x00` byte.
pub fn write_u32_vql(out: &mut Vec<u8>, value: u32) {
    let mut v = value;
    loop {
        let mut byte = (v & 0x7f) as u8;
        v >>= 7;
        if v != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if v == 0 {
            break;
        }
    }
}

/// Reads a VQL-encoded integer from the reader.
pub fn read_u32_vql(reader: &mut ByteReader) -> Result<u32> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;
    loop {
        let byte = reader.read_u8()?;
        if shift >= 32 {
            return Err(ChainError::InvalidChunk(
                "varint exceeds 32 bits".to_string(),
            ));
        }
        value |= ((byte & 0x7f) as u64) << shift;
        if byte & 0x80 == 0 {
            return u32::try_from(value).map_err(|_| {
                ChainError::InvalidChunk("varint exceeds 32 bits".to_string())
            });
        }
        shift += 7;
    }
}

fn write_length(out: &mut Vec<u8>, len: usize) -> Result<()> {
    let len = u32::try_from(len)
        .map_err(|_| ChainError::InvalidArgument(format!("length {len} exceeds u32")))?;
    write_u32_vql(out, len);
    Ok(())
}

/// Serializes a value into its canonical byte form.
pub fn serialize(value: &Value) -> Result<Bytes> {
    let mut out = Vec::new();
    encode_into(value, &mut out)?;
    Ok(Bytes::from(out))
}

fn encode_into(value: &Value, out: &mut Vec<u8>) -> Result<()> {
    match value {
        Value::Null => out.push(TAG_NULL),
        Value::String(s) => {
            out.push(TAG_STRING);
            write_length(out, s.len())?;
            out.extend_from_slice(s.as_bytes());
        }
        Value::Bytes(bytes) => {
            out.push(TAG_BYTES);
            write_length(out, bytes.len())?;
            out.extend_from_slice(bytes);
        }
        Value::Uint(v) => {
            out.push(TAG_UINT);
            write_u32_vql(out, *v);
        }
        Value::Array(items) => {
            out.push(TAG_ARRAY);
            write_length(out, items.len())?;
            for item in items {
                encode_into(item, out)?;
            }
        }
        Value::Marshalled(m) => {
            out.push(TAG_MARSHALLED);
            let body = serde_json::to_vec(&m.to_json())?;
            write_length(out, body.len())?;
            out.extend_from_slice(&body);
        }
        Value::Json(v) => {
            out.push(TAG_JSON);
            let body = serde_json::to_vec(v)?;
            write_length(out, body.len())?;
            out.extend_from_slice(&body);
        }
    }
    Ok(())
}

/// Deserializes a canonical byte form back into a value.
///
/// Fails with `ERR_INVALID_CHUNK` when trailing bytes remain after the
/// value, and with `ERR_UNSUPPORTED_OPERATION` on an unknown tag.
pub fn deserialize(bytes: impl Into<Bytes>) -> Result<Value> {
    let mut reader = ByteReader::new(bytes);
    let value = decode_next(&mut reader)?;
    if reader.remaining()? != 0 {
        return Err(ChainError::InvalidChunk(format!(
            "{} trailing bytes after value",
            reader.remaining()?
        )));
    }
    reader.dispose();
    Ok(value)
}

fn decode_next(reader: &mut ByteReader) -> Result<Value> {
    let tag = reader.read_u8()?;
    match tag {
        TAG_NULL => Ok(Value::Null),
        TAG_STRING => {
            let len = read_u32_vql(reader)? as usize;
            let bytes = reader.read(Some(len))?;
            Ok(Value::String(String::from_utf8(bytes.to_vec())?))
        }
        TAG_UINT => Ok(Value::Uint(read_u32_vql(reader)?)),
        TAG_BYTES => {
            let len = read_u32_vql(reader)? as usize;
            Ok(Value::Bytes(reader.read(Some(len))?))
        }
        TAG_ARRAY => {
            let count = read_u32_vql(reader)? as usize;
            let mut items = Vec::with_capacity(count.min(4096));
            for _ in 0..count {
                items.push(decode_next(reader)?);
            }
            Ok(Value::Array(items))
        }
        TAG_MARSHALLED => {
            let len = read_u32_vql(reader)? as usize;
            let body = reader.read(Some(len))?;
            let envelope: serde_json::Value = serde_json::from_slice(&body)?;
            Ok(Value::Marshalled(Marshalled::from_json(&envelope)?))
        }
        TAG_JSON => {
            let len = read_u32_vql(reader)? as usize;
            let body = reader.read(Some(len))?;
            Ok(Value::Json(serde_json::from_slice(&body)?))
        }
        other => Err(ChainError::UnsupportedOperation(format!(
            "unknown codec tag {other}"
        ))),
    }
}
