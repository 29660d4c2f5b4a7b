// Path: crates/types/src/app/mod.rs
//! Core application-level data structures: blocks, transactions and headers.

use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::{self, Marshalled, ToCodecValue, Value};
use crate::hash::HashEntity;
use crate::Result;

/// The version number stamped into every block header this library produces.
pub const BLOCK_VERSION: u32 = 1;

/// The number of `'0'` characters in the genesis previous-hash marker.
pub const GENESIS_HASH_LENGTH: usize = 64;

/// Builds the genesis marker: the ASCII string `"0"` repeated 64 times,
/// wrapped in a [`HashEntity`]. This is the only representation of "no
/// predecessor" the chain format admits; a zeroed digest is not equivalent.
pub fn genesis_previous_hash() -> HashEntity {
    HashEntity::new(vec![b'0'; GENESIS_HASH_LENGTH])
}

/// Formats a millisecond timestamp as the RFC-style UTC string carried in
/// block headers, e.g. `Sat, 01 Aug 2026 12:00:00 GMT`.
pub fn format_utc_timestamp(ts_millis: u64) -> String {
    match Utc.timestamp_millis_opt(ts_millis as i64).single() {
        Some(dt) => dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        None => String::from("Thu, 01 Jan 1970 00:00:00 GMT"),
    }
}

/// The metadata header of a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeaders {
    /// Milliseconds since the Unix epoch at assembly time.
    pub ts: u64,
    /// The same instant as an RFC-style UTC string.
    pub timestamp: String,
    /// The byte length of the canonically serialized payload.
    pub content_length: u32,
    /// The Merkle root over the chunked transaction.
    pub merkle_root: HashEntity,
    /// The block format version.
    pub version: u32,
    /// Reserved; always zero for blocks produced by this library.
    pub nonce: u32,
}

impl BlockHeaders {
    fn canonical_value(&self) -> Result<Marshalled> {
        let mut map = BTreeMap::new();
        map.insert(
            "contentLength".to_string(),
            Marshalled::Integer(self.content_length as i64),
        );
        map.insert(
            "merkleRoot".to_string(),
            Marshalled::Binary(self.merkle_root.buffer()?),
        );
        map.insert("nonce".to_string(), Marshalled::Integer(self.nonce as i64));
        map.insert(
            "timestamp".to_string(),
            Marshalled::String(self.timestamp.clone()),
        );
        map.insert("ts".to_string(), Marshalled::Integer(self.ts as i64));
        map.insert(
            "version".to_string(),
            Marshalled::Integer(self.version as i64),
        );
        Ok(Marshalled::Object(map))
    }
}

/// The unit of user data a block carries. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction<P> {
    /// The user payload.
    pub payload: P,
    /// The position this transaction claims in the chain.
    pub sequence: u32,
}

impl<P> Transaction<P> {
    /// Creates a transaction.
    pub fn new(payload: P, sequence: u32) -> Self {
        Self { payload, sequence }
    }
}

impl<P: ToCodecValue> Transaction<P> {
    /// Returns the canonical codec value of the whole transaction record.
    pub fn to_codec_value(&self) -> Value {
        let mut map = BTreeMap::new();
        map.insert(
            "payload".to_string(),
            Marshalled::from_value(&self.payload.to_codec_value()),
        );
        map.insert(
            "sequence".to_string(),
            Marshalled::Integer(self.sequence as i64),
        );
        Value::Marshalled(Marshalled::Object(map))
    }
}

/// A signed, sequenced record carrying one transaction and linking to its
/// predecessor by signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block<P> {
    /// The storage identifier, globally unique across a chain.
    #[serde(rename = "_id")]
    pub id: String,
    /// The public, dashless UUIDv7 identifier.
    pub public_block_id: String,
    /// The `block_signature` of the predecessor, or the genesis marker.
    pub previous_hash: HashEntity,
    /// The block's position; contiguous from zero.
    pub sequence: u32,
    /// The carried transaction.
    pub transaction: Transaction<P>,
    /// The block headers.
    pub headers: BlockHeaders,
    /// Free-form scalar annotations that travel with the block.
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Signature over the serialized payload.
    pub content_signature: HashEntity,
    /// Signature over the canonical form of every other field.
    pub block_signature: HashEntity,
}

impl<P: ToCodecValue> Block<P> {
    /// Returns the canonical codec value of this block with the
    /// `blockSignature` field absent.
    ///
    /// Field order is fixed lexicographically at every nesting level, so two
    /// implementations that agree on the codec produce byte-identical
    /// preimages.
    pub fn canonical_value(&self) -> Result<Value> {
        let mut map = BTreeMap::new();
        map.insert("_id".to_string(), Marshalled::String(self.id.clone()));
        map.insert(
            "contentSignature".to_string(),
            Marshalled::Binary(self.content_signature.buffer()?),
        );
        map.insert("headers".to_string(), self.headers.canonical_value()?);
        map.insert(
            "metadata".to_string(),
            Marshalled::Object(
                self.metadata
                    .iter()
                    .map(|(k, v)| (k.clone(), Marshalled::from_json_untyped(v)))
                    .collect(),
            ),
        );
        map.insert(
            "previousHash".to_string(),
            Marshalled::Binary(self.previous_hash.buffer()?),
        );
        map.insert(
            "publicBlockId".to_string(),
            Marshalled::String(self.public_block_id.clone()),
        );
        map.insert(
            "sequence".to_string(),
            Marshalled::Integer(self.sequence as i64),
        );
        let transaction = match self.transaction.to_codec_value() {
            Value::Marshalled(m) => m,
            other => Marshalled::from_value(&other),
        };
        map.insert("transaction".to_string(), transaction);
        Ok(Value::Marshalled(Marshalled::Object(map)))
    }

    /// Serializes the canonical form: the byte stream `block_signature`
    /// covers.
    pub fn canonical_bytes(&self) -> Result<bytes::Bytes> {
        codec::serialize(&self.canonical_value()?)
    }
}

impl Marshalled {
    /// Lowers a codec value into its marshalled form for embedding inside a
    /// canonical record.
    pub fn from_value(value: &Value) -> Marshalled {
        match value {
            Value::Null => Marshalled::Null,
            Value::String(s) => Marshalled::String(s.clone()),
            Value::Uint(v) => Marshalled::Integer(*v as i64),
            Value::Bytes(b) => Marshalled::Binary(b.clone()),
            Value::Array(items) => {
                Marshalled::Array(items.iter().map(Marshalled::from_value).collect())
            }
            Value::Marshalled(m) => m.clone(),
            Value::Json(v) => Marshalled::from_json_untyped(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_block() -> Block<String> {
        Block {
            id: "00000000000000000000000000000000".to_string(),
            public_block_id: "0190d3f7aaaa7aaabbbbccccddddeeee".to_string(),
            previous_hash: genesis_previous_hash(),
            sequence: 0,
            transaction: Transaction::new("x".to_string(), 0),
            headers: BlockHeaders {
                ts: 1_700_000_000_000,
                timestamp: format_utc_timestamp(1_700_000_000_000),
                content_length: 3,
                merkle_root: HashEntity::new(vec![0xaa; 48]),
                version: BLOCK_VERSION,
                nonce: 0,
            },
            metadata: BTreeMap::new(),
            content_signature: HashEntity::new(vec![0x01; 64]),
            block_signature: HashEntity::new(vec![0x02; 70]),
        }
    }

    #[test]
    fn test_genesis_marker_is_ascii_zeroes() {
        let marker = genesis_previous_hash();
        let bytes = marker.buffer().unwrap();
        assert_eq!(bytes.len(), 64);
        assert!(bytes.iter().all(|b| *b == b'0'));
    }

    #[test]
    fn test_utc_timestamp_format() {
        // 2023-11-14T22:13:20Z
        assert_eq!(
            format_utc_timestamp(1_700_000_000_000),
            "Tue, 14 Nov 2023 22:13:20 GMT"
        );
    }

    #[test]
    fn test_canonical_bytes_exclude_block_signature() {
        let block = sample_block();
        let baseline = block.canonical_bytes().unwrap();

        // Changing the block signature must not affect the preimage.
        let mut resigned = block.clone();
        resigned.block_signature = HashEntity::new(vec![0xff; 70]);
        assert_eq!(resigned.canonical_bytes().unwrap(), baseline);

        // Changing any covered field must.
        let mut retagged = block.clone();
        retagged.metadata.insert("note".into(), serde_json::json!("x"));
        assert_ne!(retagged.canonical_bytes().unwrap(), baseline);
    }

    #[test]
    fn test_canonical_bytes_are_deterministic() {
        let block = sample_block();
        assert_eq!(
            block.canonical_bytes().unwrap(),
            block.canonical_bytes().unwrap()
        );
    }

    #[test]
    fn test_transaction_codec_value_shape() {
        let tx = Transaction::new("x".to_string(), 3);
        match tx.to_codec_value() {
            Value::Marshalled(Marshalled::Object(map)) => {
                assert_eq!(
                    map.get("payload"),
                    Some(&Marshalled::String("x".to_string()))
                );
                assert_eq!(map.get("sequence"), Some(&Marshalled::Integer(3)));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }
}
