// Path: crates/crypto/src/keys/mod.rs
//! The key-material container and its factories.
//!
//! A [`KeyMaterial`] owns secret or asymmetric key bytes together with an
//! algorithm descriptor that tells it how to slice the buffer: master key,
//! then IV, then auth tag, then whatever trailing region the caller
//! reserved. Material can be loaded from several envelope formats (raw,
//! base64, hex, armored) and re-emitted under the authenticated armor
//! envelope; decoding is normalized in place and never undone.

use base64::Engine;
use ed25519_dalek::pkcs8::{EncodePrivateKey as _, EncodePublicKey as _};
use rand::rngs::OsRng;
use rsa::pkcs1::{EncodeRsaPrivateKey as _, EncodeRsaPublicKey as _};
use rsa::traits::PublicKeyParts;
use serde::{Deserialize, Serialize};
use serde_json::json;
use zeroize::Zeroizing;

use hychain_api::entropy::EntropySource;
use hychain_api::token::CancellationToken;
use hychain_types::error::ChainError;
use hychain_types::Result;

use crate::armor::{self, TextEncoding};

/// The number of trailing bytes a generated symmetric key reserves for a
/// caller-defined region past the declared layout.
pub const TRAILING_RESERVE_BYTES: usize = 8;

/// The size of the per-key armor-wrapping secret.
pub const ARMOR_SECRET_BYTES: usize = 40;

/// What a key's underlying buffer represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    /// Symmetric material with a sliceable layout.
    Secret,
    /// Opaque DER-encoded public key material.
    Public,
    /// Opaque DER-encoded private key material.
    Private,
}

/// The envelope format key bytes are currently stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFormat {
    /// Plain bytes; the terminal format every transition converges to.
    Raw,
    /// Base64 text.
    Base64,
    /// Hex text.
    Hex,
    /// PEM text. Recognized but not decodable yet.
    Pem,
    /// An armor envelope (see [`crate::armor`]).
    Armored,
}

/// Describes how to slice a key's underlying buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyAlgorithm {
    /// What the buffer represents.
    pub kind: KeyKind,
    /// Master-key length in bytes; `[0, length)` of the buffer.
    pub length: usize,
    /// IV length; `[length, length + iv_length)`.
    #[serde(default)]
    pub iv_length: usize,
    /// Auth-tag length; the region after the IV.
    #[serde(default)]
    pub auth_tag_length: usize,
    /// Optional display name, e.g. `"AES-GCM-256"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl KeyAlgorithm {
    /// Looks a symmetric layout up by name.
    ///
    /// | Name | length | iv | authTag |
    /// |---|---|---|---|
    /// | SHA256/384/512 | 64 | — | — |
    /// | AES-CBC-128 | 16 | 16 | — |
    /// | AES-CBC-256 | 32 | 16 | — |
    /// | AES-GCM-128 / AES-CCM-128 | 16 | 12 | 16 |
    /// | AES-GCM-256 / AES-CCM-256 | 32 | 12 | 16 |
    /// | CHACHA20 | 32 | 12 | — |
    pub fn named(name: &str) -> Result<Self> {
        let (length, iv_length, auth_tag_length) = match name {
            "SHA256" | "SHA384" | "SHA512" => (64, 0, 0),
            "AES-CBC-128" => (16, 16, 0),
            "AES-CBC-256" => (32, 16, 0),
            "AES-GCM-128" | "AES-CCM-128" => (16, 12, 16),
            "AES-GCM-256" | "AES-CCM-256" => (32, 12, 16),
            "CHACHA20" => (32, 12, 0),
            other => {
                return Err(ChainError::InvalidType(format!(
                    "unknown symmetric algorithm {other}"
                )))
            }
        };
        Ok(Self {
            kind: KeyKind::Secret,
            length,
            iv_length,
            auth_tag_length,
            name: Some(name.to_string()),
        })
    }

    /// Builds a descriptor for opaque asymmetric material.
    pub fn asymmetric(kind: KeyKind, name: &str, der_length: usize) -> Self {
        Self {
            kind,
            length: der_length,
            iv_length: 0,
            auth_tag_length: 0,
            name: Some(name.to_string()),
        }
    }

    fn layout_end(&self) -> usize {
        self.length + self.iv_length + self.auth_tag_length
    }
}

/// Free-form tags that travel with a key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDetails {
    /// A human-readable label.
    pub label: String,
    /// The owning user, when one applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// A partial update merged into a key's details.
#[derive(Debug, Clone, Default)]
pub struct KeyDetailsUpdate {
    /// Replacement label, when present.
    pub label: Option<String>,
    /// Replacement user id, when present.
    pub user_id: Option<String>,
}

/// Metadata captured at asymmetric key generation time.
#[derive(Debug, Clone, PartialEq)]
pub struct AsymmetricMetadata {
    /// The key family: `"rsa"`, `"ec"` or `"ed25519"`.
    pub key_type: String,
    /// RSA modulus length in bits.
    pub modulus_length: Option<usize>,
    /// RSA public exponent as a decimal string.
    pub public_exponent: Option<String>,
    /// Named curve for EC keys.
    pub curve: Option<String>,
}

/// The key-material container.
pub struct KeyMaterial {
    buf: Zeroizing<Vec<u8>>,
    cursor: usize,
    format: KeyFormat,
    algorithm: KeyAlgorithm,
    details: KeyDetails,
    armor_key: Option<Zeroizing<Vec<u8>>>,
    asymmetric: Option<AsymmetricMetadata>,
    disposed: bool,
}

impl KeyMaterial {
    /// Wraps already-encoded key bytes.
    pub fn from_encoded(
        bytes: Vec<u8>,
        format: KeyFormat,
        algorithm: KeyAlgorithm,
        details: KeyDetails,
        armor_key: Option<Vec<u8>>,
    ) -> Self {
        Self {
            buf: Zeroizing::new(bytes),
            cursor: 0,
            format,
            algorithm,
            details,
            armor_key: armor_key.map(Zeroizing::new),
            asymmetric: None,
            disposed: false,
        }
    }

    fn guard(&self) -> Result<()> {
        if self.disposed {
            return Err(ChainError::ResourceDisposed("KeyMaterial"));
        }
        Ok(())
    }

    /// Returns a merged snapshot of details, algorithm descriptor and
    /// asymmetric metadata, as a JSON object.
    ///
    /// A big-integer public exponent is rendered as `"bigint:<decimal>"` to
    /// stay JSON-safe.
    pub fn get_info(&self) -> Result<serde_json::Value> {
        self.guard()?;
        let mut info = serde_json::Map::new();
        info.insert("label".to_string(), json!(self.details.label));
        info.insert("algorithm".to_string(), json!(self.algorithm));
        if let Some(user_id) = &self.details.user_id {
            info.insert("userId".to_string(), json!(user_id));
        }
        if let Some(meta) = &self.asymmetric {
            info.insert("keyType".to_string(), json!(meta.key_type));
            if let Some(bits) = meta.modulus_length {
                info.insert("modulusLength".to_string(), json!(bits));
            }
            if let Some(e) = &meta.public_exponent {
                info.insert("publicExponent".to_string(), json!(format!("bigint:{e}")));
            }
            if let Some(curve) = &meta.curve {
                info.insert("curve".to_string(), json!(curve));
            }
        }
        Ok(serde_json::Value::Object(info))
    }

    /// Returns a structural copy of the key's details.
    pub fn get_details(&self) -> Result<KeyDetails> {
        self.guard()?;
        Ok(self.details.clone())
    }

    /// Merges a partial update into the key's details.
    pub fn set_details(&mut self, update: KeyDetailsUpdate) -> Result<()> {
        self.guard()?;
        if let Some(label) = update.label {
            self.details.label = label;
        }
        if let Some(user_id) = update.user_id {
            self.details.user_id = Some(user_id);
        }
        Ok(())
    }

    /// Returns the algorithm descriptor.
    pub fn algorithm(&self) -> &KeyAlgorithm {
        &self.algorithm
    }

    /// Normalizes the stored bytes to the raw format.
    ///
    /// Decoding happens once; transitions are monotonic toward `Raw` and are
    /// never undone in place.
    fn read_key(&mut self) -> Result<()> {
        match self.format {
            KeyFormat::Raw => Ok(()),
            KeyFormat::Base64 => {
                let text = std::str::from_utf8(&self.buf)
                    .map_err(|e| ChainError::InvalidChunk(format!("key is not UTF-8: {e}")))?;
                let decoded = base64::engine::general_purpose::STANDARD
                    .decode(text.trim())
                    .map_err(|e| ChainError::InvalidChunk(format!("invalid base64 key: {e}")))?;
                self.buf = Zeroizing::new(decoded);
                self.format = KeyFormat::Raw;
                Ok(())
            }
            KeyFormat::Hex => {
                let text = std::str::from_utf8(&self.buf)
                    .map_err(|e| ChainError::InvalidChunk(format!("key is not UTF-8: {e}")))?;
                let decoded = hex::decode(text.trim())
                    .map_err(|e| ChainError::InvalidChunk(format!("invalid hex key: {e}")))?;
                self.buf = Zeroizing::new(decoded);
                self.format = KeyFormat::Raw;
                Ok(())
            }
            KeyFormat::Armored => {
                let wrap_key = self.armor_key.as_ref().map(|k| k.as_slice());
                let unwrapped = armor::dearmor(self.buf.as_slice(), wrap_key, None)?;
                self.buf = Zeroizing::new(unwrapped.to_vec());
                self.format = KeyFormat::Raw;
                Ok(())
            }
            KeyFormat::Pem => Err(ChainError::NotImplemented(
                "PEM key envelopes are not decodable yet".to_string(),
            )),
        }
    }

    /// Reads up to `n` bytes from the material, advancing an internal
    /// cursor. With `None`, the whole remainder is returned.
    pub fn read(&mut self, n: Option<usize>) -> Result<Vec<u8>> {
        self.guard()?;
        self.read_key()?;
        let remaining = self.buf.len().saturating_sub(self.cursor);
        let take = n.unwrap_or(remaining).min(remaining);
        let out = self
            .buf
            .get(self.cursor..self.cursor + take)
            .unwrap_or(&[])
            .to_vec();
        self.cursor += take;
        Ok(out)
    }

    /// Returns the master region.
    ///
    /// For secret material this is `[0, length)`; for asymmetric kinds the
    /// buffer is opaque and returned whole.
    pub fn master(&mut self) -> Result<Vec<u8>> {
        self.guard()?;
        self.read_key()?;
        match self.algorithm.kind {
            KeyKind::Secret => {
                let end = self.algorithm.length.min(self.buf.len());
                Ok(self.buf.get(..end).unwrap_or(&[]).to_vec())
            }
            KeyKind::Public | KeyKind::Private => Ok(self.buf.to_vec()),
        }
    }

    fn secret_region(&mut self, start: usize, len: usize) -> Result<Option<Vec<u8>>> {
        self.guard()?;
        self.read_key()?;
        if self.algorithm.kind != KeyKind::Secret || len == 0 {
            return Ok(None);
        }
        match self.buf.get(start..start + len) {
            Some(region) => Ok(Some(region.to_vec())),
            None => Ok(None),
        }
    }

    /// Returns the IV region, or `None` when the layout declares none or
    /// the material is too short.
    pub fn iv(&mut self) -> Result<Option<Vec<u8>>> {
        let start = self.algorithm.length;
        let len = self.algorithm.iv_length;
        self.secret_region(start, len)
    }

    /// Returns the auth-tag region, or `None` when the layout declares none
    /// or the material is too short.
    pub fn auth_tag(&mut self) -> Result<Option<Vec<u8>>> {
        let start = self.algorithm.length + self.algorithm.iv_length;
        let len = self.algorithm.auth_tag_length;
        self.secret_region(start, len)
    }

    /// Returns the bytes past the declared layout, or `None` for
    /// asymmetric kinds and for material shorter than its layout.
    pub fn left_buffer(&mut self) -> Result<Option<Vec<u8>>> {
        self.guard()?;
        self.read_key()?;
        if self.algorithm.kind != KeyKind::Secret {
            return Ok(None);
        }
        let start = self.algorithm.layout_end();
        Ok(self.buf.get(start..).map(<[u8]>::to_vec))
    }

    /// Splices a freshly produced auth tag into the tag region, rewriting
    /// the internal buffer. Valid for secret material only.
    pub fn collect_auth_tag(&mut self, tag: &[u8]) -> Result<()> {
        self.guard()?;
        if self.algorithm.kind != KeyKind::Secret {
            return Err(ChainError::UnsupportedOperation(
                "auth tags only apply to secret key material".to_string(),
            ));
        }
        if tag.len() != self.algorithm.auth_tag_length {
            return Err(ChainError::InvalidArgument(format!(
                "auth tag must be {} bytes, got {}",
                self.algorithm.auth_tag_length,
                tag.len()
            )));
        }
        self.read_key()?;
        let offset = self.algorithm.length + self.algorithm.iv_length;
        if self.buf.len() < offset {
            return Err(ChainError::InvalidChunk(
                "key material shorter than its declared layout".to_string(),
            ));
        }

        let mut rebuilt = Vec::with_capacity(self.buf.len().max(offset + tag.len()));
        rebuilt.extend_from_slice(self.buf.get(..offset).unwrap_or(&[]));
        rebuilt.extend_from_slice(tag);
        if let Some(rest) = self.buf.get(offset + tag.len()..) {
            rebuilt.extend_from_slice(rest);
        }
        self.buf = Zeroizing::new(rebuilt);
        Ok(())
    }

    /// Re-emits the material under the armor envelope, encrypted when this
    /// key carries a wrapping secret.
    pub fn armor(&mut self, encoding: Option<TextEncoding>) -> Result<bytes::Bytes> {
        self.guard()?;
        self.read_key()?;
        let wrap_key = self.armor_key.as_ref().map(|k| k.as_slice());
        armor::armor(self.armor_key.is_some(), &self.buf, wrap_key, encoding)
    }

    /// Returns the armor-wrapping secret, when the key carries one.
    pub fn armor_secret(&self) -> Result<Option<Vec<u8>>> {
        self.guard()?;
        Ok(self.armor_key.as_ref().map(|k| k.to_vec()))
    }

    /// Disposes the material, zeroizing the buffers. Idempotent.
    pub fn dispose(&mut self) {
        self.buf = Zeroizing::new(Vec::new());
        self.armor_key = None;
        self.cursor = 0;
        self.disposed = true;
    }

    /// Whether this key has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key bytes intentionally absent.
        f.debug_struct("KeyMaterial")
            .field("format", &self.format)
            .field("algorithm", &self.algorithm)
            .field("disposed", &self.disposed)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Factories
// ---------------------------------------------------------------------------

/// Generates symmetric key material for the given layout.
///
/// The buffer is sized `length + iv_length + auth_tag_length +
/// [`TRAILING_RESERVE_BYTES`]` and filled from the entropy source, along
/// with a fresh [`ARMOR_SECRET_BYTES`]-byte armor-wrapping secret. The
/// token is observed around every entropy acquisition.
pub async fn generate_symmetric_key(
    algorithm: KeyAlgorithm,
    entropy: &dyn EntropySource,
    token: &CancellationToken,
) -> Result<KeyMaterial> {
    if algorithm.kind != KeyKind::Secret {
        return Err(ChainError::InvalidArgument(
            "symmetric generation requires a secret algorithm descriptor".to_string(),
        ));
    }
    let final_length = algorithm.layout_end() + TRAILING_RESERVE_BYTES;
    let key_bytes = entropy.random_bytes(final_length, token).await?;
    let armor_secret = entropy.random_bytes(ARMOR_SECRET_BYTES, token).await?;

    Ok(KeyMaterial {
        buf: Zeroizing::new(key_bytes),
        cursor: 0,
        format: KeyFormat::Raw,
        algorithm,
        details: KeyDetails::default(),
        armor_key: Some(Zeroizing::new(armor_secret)),
        asymmetric: None,
        disposed: false,
    })
}

/// The asymmetric families the pair factory can generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsymmetricAlgorithm {
    /// RSA with a 2048- or 4096-bit modulus.
    Rsa,
    /// ECDSA over secp256k1.
    Ecdsa,
    /// Ed25519.
    Ed25519,
}

/// Options for asymmetric key generation.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsymmetricKeyOptions {
    /// Requested RSA modulus length in bits; coerced to 2048 or 4096.
    pub modulus_length: Option<usize>,
}

/// Coerces a requested RSA modulus to one of the two supported sizes.
pub(crate) fn coerce_rsa_modulus(requested: Option<usize>) -> usize {
    match requested {
        Some(bits) if bits >= 4096 => 4096,
        _ => 2048,
    }
}

fn key_pair(
    public_der: Vec<u8>,
    private_der: Vec<u8>,
    name: &str,
    meta: AsymmetricMetadata,
) -> (KeyMaterial, KeyMaterial) {
    let public = KeyMaterial {
        algorithm: KeyAlgorithm::asymmetric(KeyKind::Public, name, public_der.len()),
        buf: Zeroizing::new(public_der),
        cursor: 0,
        format: KeyFormat::Raw,
        details: KeyDetails::default(),
        armor_key: None,
        asymmetric: Some(meta.clone()),
        disposed: false,
    };
    let private = KeyMaterial {
        algorithm: KeyAlgorithm::asymmetric(KeyKind::Private, name, private_der.len()),
        buf: Zeroizing::new(private_der),
        cursor: 0,
        format: KeyFormat::Raw,
        details: KeyDetails::default(),
        armor_key: None,
        asymmetric: Some(meta),
        disposed: false,
    };
    (public, private)
}

/// Generates an asymmetric key pair, returned as `(public, private)`.
///
/// Public keys are DER SPKI except RSA, which is PKCS#1; private keys are
/// DER PKCS#8 except RSA (PKCS#1) and EC (SEC1).
pub fn generate_asymmetric_keypair(
    algorithm: AsymmetricAlgorithm,
    options: AsymmetricKeyOptions,
) -> Result<(KeyMaterial, KeyMaterial)> {
    match algorithm {
        AsymmetricAlgorithm::Rsa => {
            let bits = coerce_rsa_modulus(options.modulus_length);
            let private_key = rsa::RsaPrivateKey::new(&mut OsRng, bits)
                .map_err(|e| ChainError::Unknown(format!("RSA generation failed: {e}")))?;
            let public_der = private_key
                .to_public_key()
                .to_pkcs1_der()
                .map_err(|e| ChainError::Unknown(format!("RSA public export failed: {e}")))?
                .as_bytes()
                .to_vec();
            let private_der = private_key
                .to_pkcs1_der()
                .map_err(|e| ChainError::Unknown(format!("RSA private export failed: {e}")))?
                .as_bytes()
                .to_vec();
            let meta = AsymmetricMetadata {
                key_type: "rsa".to_string(),
                modulus_length: Some(bits),
                public_exponent: Some(private_key.e().to_string()),
                curve: None,
            };
            Ok(key_pair(public_der, private_der, "RSA", meta))
        }
        AsymmetricAlgorithm::Ecdsa => {
            use k256::pkcs8::EncodePublicKey as _;

            let secret = k256::SecretKey::random(&mut OsRng);
            let public_der = secret
                .public_key()
                .to_public_key_der()
                .map_err(|e| ChainError::Unknown(format!("EC public export failed: {e}")))?
                .as_bytes()
                .to_vec();
            let private_der = secret
                .to_sec1_der()
                .map_err(|e| ChainError::Unknown(format!("EC private export failed: {e}")))?
                .to_vec();
            let meta = AsymmetricMetadata {
                key_type: "ec".to_string(),
                modulus_length: None,
                public_exponent: None,
                curve: Some("secp256k1".to_string()),
            };
            Ok(key_pair(public_der, private_der, "ECDSA", meta))
        }
        AsymmetricAlgorithm::Ed25519 => {
            let signing_key = ed25519_dalek::SigningKey::generate(&mut OsRng);
            let public_der = signing_key
                .verifying_key()
                .to_public_key_der()
                .map_err(|e| ChainError::Unknown(format!("Ed25519 public export failed: {e}")))?
                .as_bytes()
                .to_vec();
            let private_der = signing_key
                .to_pkcs8_der()
                .map_err(|e| ChainError::Unknown(format!("Ed25519 private export failed: {e}")))?
                .as_bytes()
                .to_vec();
            let meta = AsymmetricMetadata {
                key_type: "ed25519".to_string(),
                modulus_length: None,
                public_exponent: None,
                curve: None,
            };
            Ok(key_pair(public_der, private_der, "Ed25519", meta))
        }
    }
}

#[cfg(test)]
mod tests;
