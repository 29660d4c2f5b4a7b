// Path: crates/types/src/hash.rs
//! The immutable container for digests and signatures.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use base64::Engine;
use bytes::Bytes;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ChainError;
use crate::Result;

/// An immutable byte sequence representing a digest or signature.
///
/// The underlying bytes are never mutated after construction; equality is
/// byte-exact. The entity additionally carries a read cursor for partial
/// consumption and a disposal flag. Cloning produces an independent handle
/// over the same bytes with a fresh cursor.
pub struct HashEntity {
    bytes: Bytes,
    cursor: AtomicUsize,
    disposed: AtomicBool,
}

impl HashEntity {
    /// Wraps an existing byte sequence.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            cursor: AtomicUsize::new(0),
            disposed: AtomicBool::new(false),
        }
    }

    fn guard(&self) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(ChainError::ResourceDisposed("HashEntity"));
        }
        Ok(())
    }

    /// Returns the number of bytes held.
    pub fn byte_length(&self) -> Result<usize> {
        self.guard()?;
        Ok(self.bytes.len())
    }

    /// Returns the digest as a lowercase hex string.
    pub fn to_hex(&self) -> Result<String> {
        self.guard()?;
        Ok(hex::encode(&self.bytes))
    }

    /// Returns the digest as a standard base64 string.
    pub fn to_base64(&self) -> Result<String> {
        self.guard()?;
        Ok(base64::engine::general_purpose::STANDARD.encode(&self.bytes))
    }

    /// Returns the raw bytes. The returned handle shares storage and is cheap.
    pub fn buffer(&self) -> Result<Bytes> {
        self.guard()?;
        Ok(self.bytes.clone())
    }

    /// Reads up to `n` bytes from the internal cursor and advances it.
    ///
    /// With `None`, the whole remainder is returned. Requesting more bytes
    /// than remain fails with `ERR_END_OF_STREAM` and leaves the cursor
    /// untouched.
    pub fn read(&self, n: Option<usize>) -> Result<Bytes> {
        self.guard()?;
        let pos = self.cursor.load(Ordering::Acquire);
        let remaining = self.bytes.len() - pos;
        let take = n.unwrap_or(remaining);
        if take > remaining {
            return Err(ChainError::EndOfStream);
        }
        self.cursor.store(pos + take, Ordering::Release);
        Ok(self.bytes.slice(pos..pos + take))
    }

    /// Marks this handle disposed. Idempotent.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }

    /// Whether this handle has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl Clone for HashEntity {
    fn clone(&self) -> Self {
        Self::new(self.bytes.clone())
    }
}

impl PartialEq for HashEntity {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for HashEntity {}

impl std::fmt::Debug for HashEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HashEntity({})", hex::encode(&self.bytes))
    }
}

impl From<Vec<u8>> for HashEntity {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl Serialize for HashEntity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.bytes))
    }
}

impl<'de> Deserialize<'de> for HashEntity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(D::Error::custom)?;
        Ok(Self::new(bytes))
    }
}
