// Path: crates/crypto/src/hash/mod.rs
//! Digest and HMAC primitives.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha384, Sha512};

use hychain_types::error::ChainError;
use hychain_types::hash::HashEntity;
use hychain_types::Result;

/// The number of key bytes an HMAC computation consumes. Longer keys are
/// truncated to this prefix so key objects carrying trailing regions (IV,
/// auth tag) still authenticate with the master material alone.
pub const HMAC_KEY_BYTES: usize = 64;

/// The digest algorithms the library dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// SHA-256, 32-byte digests.
    Sha256,
    /// SHA-384, 48-byte digests. The library-wide default.
    Sha384,
    /// SHA-512, 64-byte digests.
    Sha512,
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        Self::Sha384
    }
}

impl HashAlgorithm {
    /// Returns the digest size in bytes.
    pub fn digest_size(&self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Returns the canonical name of the algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "SHA256",
            Self::Sha384 => "SHA384",
            Self::Sha512 => "SHA512",
        }
    }

    /// Parses an algorithm from its canonical name.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "SHA256" => Ok(Self::Sha256),
            "SHA384" => Ok(Self::Sha384),
            "SHA512" => Ok(Self::Sha512),
            other => Err(ChainError::InvalidType(format!(
                "unknown hash algorithm {other}"
            ))),
        }
    }
}

/// Hashes `data` with the given algorithm.
///
/// Without a key this is a plain digest. With a key, the result is an HMAC
/// under the first [`HMAC_KEY_BYTES`] bytes of the key.
pub fn hash_data(
    data: &[u8],
    algorithm: HashAlgorithm,
    key: Option<&[u8]>,
) -> Result<HashEntity> {
    let digest = match key {
        None => match algorithm {
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        },
        Some(key) => {
            let key = key.get(..HMAC_KEY_BYTES.min(key.len())).unwrap_or(key);
            match algorithm {
                HashAlgorithm::Sha256 => {
                    let mut mac = Hmac::<Sha256>::new_from_slice(key)
                        .map_err(|e| ChainError::Unknown(format!("hmac init: {e}")))?;
                    mac.update(data);
                    mac.finalize().into_bytes().to_vec()
                }
                HashAlgorithm::Sha384 => {
                    let mut mac = Hmac::<Sha384>::new_from_slice(key)
                        .map_err(|e| ChainError::Unknown(format!("hmac init: {e}")))?;
                    mac.update(data);
                    mac.finalize().into_bytes().to_vec()
                }
                HashAlgorithm::Sha512 => {
                    let mut mac = Hmac::<Sha512>::new_from_slice(key)
                        .map_err(|e| ChainError::Unknown(format!("hmac init: {e}")))?;
                    mac.update(data);
                    mac.finalize().into_bytes().to_vec()
                }
            }
        }
    };
    Ok(HashEntity::new(digest))
}

/// Hashes `data` under the library default (SHA-384), unkeyed.
pub fn hash_data_default(data: &[u8]) -> Result<HashEntity> {
    hash_data(data, HashAlgorithm::default(), None)
}
