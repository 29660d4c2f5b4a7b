// Path: crates/crypto/src/sign/mod.rs
//! The algorithm-dispatching signer.
//!
//! [`sign`] accepts any [`ByteSource`], drains it into one contiguous
//! buffer, and dispatches on the algorithm name: HMAC with a SHA-2 variant,
//! ECDSA over secp256k1 (DER-encoded signatures), RSA PKCS#1 v1.5, or
//! Ed25519 (IEEE P1363 `R ‖ S` when requested raw, DER otherwise). The
//! matching [`verify`] walks the same dispatch table over public material.
//!
//! Private keys are accepted in the encodings their ecosystem commonly
//! ships: raw seeds/scalars, PKCS#8 or SEC1/PKCS#1 DER, and PEM.

use ed25519_dalek::pkcs8::{DecodePrivateKey as _, DecodePublicKey as _};
use ed25519_dalek::{Signer as _, Verifier as _};
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::pkcs8::DecodePublicKey as _;
use rsa::pkcs1::{DecodeRsaPrivateKey as _, DecodeRsaPublicKey as _};
use rsa::pkcs8::DecodePrivateKey as _;
use rsa::Pkcs1v15Sign;
use sha2::{Digest, Sha256, Sha384, Sha512};

use hychain_api::source::{consume_buffer, BufferSource, ByteSource};
use hychain_api::token::{ensure_active, CancellationToken};
use hychain_types::error::ChainError;
use hychain_types::hash::HashEntity;
use hychain_types::Result;

use crate::hash::{hash_data, HashAlgorithm};

/// The signature algorithms the dispatcher understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// HMAC with the named SHA-2 variant.
    Hmac(HashAlgorithm),
    /// ECDSA over secp256k1, message digested with the named SHA-2 variant,
    /// DER-encoded output.
    Ecdsa(HashAlgorithm),
    /// RSA PKCS#1 v1.5, message digested with the named SHA-2 variant.
    Rsa(HashAlgorithm),
    /// Ed25519 over the raw message.
    Ed25519,
}

impl SignatureAlgorithm {
    /// Parses an algorithm from its wire name, e.g. `"ECDSA-SHA512"`.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "HMAC-SHA256" => Ok(Self::Hmac(HashAlgorithm::Sha256)),
            "HMAC-SHA384" => Ok(Self::Hmac(HashAlgorithm::Sha384)),
            "HMAC-SHA512" => Ok(Self::Hmac(HashAlgorithm::Sha512)),
            "ECDSA-SHA256" => Ok(Self::Ecdsa(HashAlgorithm::Sha256)),
            "ECDSA-SHA384" => Ok(Self::Ecdsa(HashAlgorithm::Sha384)),
            "ECDSA-SHA512" => Ok(Self::Ecdsa(HashAlgorithm::Sha512)),
            "RSA-SHA256" => Ok(Self::Rsa(HashAlgorithm::Sha256)),
            "RSA-SHA384" => Ok(Self::Rsa(HashAlgorithm::Sha384)),
            "RSA-SHA512" => Ok(Self::Rsa(HashAlgorithm::Sha512)),
            "Ed25519" => Ok(Self::Ed25519),
            other => Err(ChainError::InvalidType(format!(
                "unknown signature algorithm {other}"
            ))),
        }
    }

    /// Returns the wire name of the algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hmac(HashAlgorithm::Sha256) => "HMAC-SHA256",
            Self::Hmac(HashAlgorithm::Sha384) => "HMAC-SHA384",
            Self::Hmac(HashAlgorithm::Sha512) => "HMAC-SHA512",
            Self::Ecdsa(HashAlgorithm::Sha256) => "ECDSA-SHA256",
            Self::Ecdsa(HashAlgorithm::Sha384) => "ECDSA-SHA384",
            Self::Ecdsa(HashAlgorithm::Sha512) => "ECDSA-SHA512",
            Self::Rsa(HashAlgorithm::Sha256) => "RSA-SHA256",
            Self::Rsa(HashAlgorithm::Sha384) => "RSA-SHA384",
            Self::Rsa(HashAlgorithm::Sha512) => "RSA-SHA512",
            Self::Ed25519 => "Ed25519",
        }
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Signs everything a source yields.
///
/// The token is observed after the source drain and again after the
/// signature computation; an in-flight computation itself is not
/// interruptible.
pub async fn sign<S>(
    algorithm: SignatureAlgorithm,
    source: &mut S,
    key: &[u8],
    ed25519_raw: bool,
    token: &CancellationToken,
) -> Result<HashEntity>
where
    S: ByteSource + ?Sized,
{
    let message = consume_buffer(source, token).await?;
    let signature = match algorithm {
        SignatureAlgorithm::Hmac(variant) => {
            hash_data(&message, variant, Some(key))?.buffer()?.to_vec()
        }
        SignatureAlgorithm::Ecdsa(variant) => sign_ecdsa(variant, &message, key)?,
        SignatureAlgorithm::Rsa(variant) => sign_rsa(variant, &message, key)?,
        SignatureAlgorithm::Ed25519 => sign_ed25519(&message, key, ed25519_raw)?,
    };
    ensure_active(token)?;
    Ok(HashEntity::new(signature))
}

/// Signs a single in-memory buffer.
pub async fn sign_bytes(
    algorithm: SignatureAlgorithm,
    message: &[u8],
    key: &[u8],
    ed25519_raw: bool,
    token: &CancellationToken,
) -> Result<HashEntity> {
    let mut source = BufferSource::from(message.to_vec());
    sign(algorithm, &mut source, key, ed25519_raw, token).await
}

/// Verifies a signature over everything a source yields.
///
/// Returns `Ok(false)` on a well-formed but non-matching signature; errors
/// are reserved for unparseable keys and malformed signature encodings.
pub async fn verify<S>(
    algorithm: SignatureAlgorithm,
    source: &mut S,
    key: &[u8],
    signature: &[u8],
    token: &CancellationToken,
) -> Result<bool>
where
    S: ByteSource + ?Sized,
{
    let message = consume_buffer(source, token).await?;
    let ok = match algorithm {
        SignatureAlgorithm::Hmac(variant) => {
            let expected = hash_data(&message, variant, Some(key))?;
            expected.buffer()?.as_ref() == signature
        }
        SignatureAlgorithm::Ecdsa(variant) => {
            let verifying_key = parse_ecdsa_public_key(key)?;
            let sig = k256::ecdsa::Signature::from_der(signature)
                .map_err(|e| ChainError::InvalidType(format!("malformed ECDSA signature: {e}")))?;
            let digest = digest_message(variant, &message);
            verifying_key.verify_prehash(&digest, &sig).is_ok()
        }
        SignatureAlgorithm::Rsa(variant) => {
            let public_key = parse_rsa_public_key(key)?;
            let digest = digest_message(variant, &message);
            public_key
                .verify(pkcs1v15_padding(variant), &digest, signature)
                .is_ok()
        }
        SignatureAlgorithm::Ed25519 => {
            let verifying_key = parse_ed25519_public_key(key)?;
            let raw = normalize_ed25519_signature(signature)?;
            let sig = ed25519_dalek::Signature::from_bytes(&raw);
            verifying_key.verify(&message, &sig).is_ok()
        }
    };
    ensure_active(token)?;
    Ok(ok)
}

fn digest_message(variant: HashAlgorithm, message: &[u8]) -> Vec<u8> {
    match variant {
        HashAlgorithm::Sha256 => Sha256::digest(message).to_vec(),
        HashAlgorithm::Sha384 => Sha384::digest(message).to_vec(),
        HashAlgorithm::Sha512 => Sha512::digest(message).to_vec(),
    }
}

fn pkcs1v15_padding(variant: HashAlgorithm) -> Pkcs1v15Sign {
    match variant {
        HashAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
        HashAlgorithm::Sha384 => Pkcs1v15Sign::new::<Sha384>(),
        HashAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
    }
}

fn sign_ecdsa(variant: HashAlgorithm, message: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    let signing_key = parse_ecdsa_signing_key(key)?;
    let digest = digest_message(variant, message);
    let signature: k256::ecdsa::Signature = signing_key
        .sign_prehash(&digest)
        .map_err(|e| ChainError::Unknown(format!("ECDSA signing failed: {e}")))?;
    Ok(signature.to_der().as_bytes().to_vec())
}

fn sign_rsa(variant: HashAlgorithm, message: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    let private_key = parse_rsa_private_key(key)?;
    let digest = digest_message(variant, message);
    private_key
        .sign(pkcs1v15_padding(variant), &digest)
        .map_err(|e| ChainError::Unknown(format!("RSA signing failed: {e}")))
}

fn sign_ed25519(message: &[u8], key: &[u8], raw: bool) -> Result<Vec<u8>> {
    let signing_key = parse_ed25519_signing_key(key)?;
    let signature = signing_key.sign(message);
    let bytes = signature.to_bytes();
    if raw {
        // IEEE P1363: the fixed-width R ‖ S concatenation.
        Ok(bytes.to_vec())
    } else {
        let (r, s) = bytes.split_at(32);
        Ok(der_ecdsa_sig(r, s))
    }
}

/// Derives the 32-byte Ed25519 verifying key from any accepted private-key
/// encoding.
pub fn ed25519_public_key(key: &[u8]) -> Result<Vec<u8>> {
    let signing_key = parse_ed25519_signing_key(key)?;
    Ok(signing_key.verifying_key().to_bytes().to_vec())
}

/// Derives the compressed SEC1 verifying key from any accepted secp256k1
/// private-key encoding.
pub fn ecdsa_public_key(key: &[u8]) -> Result<Vec<u8>> {
    let signing_key = parse_ecdsa_signing_key(key)?;
    Ok(signing_key
        .verifying_key()
        .to_encoded_point(true)
        .as_bytes()
        .to_vec())
}

// ---------------------------------------------------------------------------
// Key parsing
// ---------------------------------------------------------------------------

fn pem_str(key: &[u8]) -> Option<&str> {
    std::str::from_utf8(key)
        .ok()
        .filter(|s| s.contains("-----BEGIN"))
}

fn parse_ecdsa_signing_key(key: &[u8]) -> Result<k256::ecdsa::SigningKey> {
    if key.len() == 32 {
        if let Ok(parsed) = k256::ecdsa::SigningKey::from_slice(key) {
            return Ok(parsed);
        }
    }
    if let Some(pem) = pem_str(key) {
        if let Ok(secret) = k256::SecretKey::from_pkcs8_pem(pem) {
            return Ok(secret.into());
        }
    } else {
        if let Ok(secret) = k256::SecretKey::from_pkcs8_der(key) {
            return Ok(secret.into());
        }
        if let Ok(secret) = k256::SecretKey::from_sec1_der(key) {
            return Ok(secret.into());
        }
    }
    Err(ChainError::InvalidType(
        "key is not a usable secp256k1 signing key".to_string(),
    ))
}

fn parse_ecdsa_public_key(key: &[u8]) -> Result<k256::ecdsa::VerifyingKey> {
    if matches!(key.len(), 33 | 65) {
        if let Ok(parsed) = k256::ecdsa::VerifyingKey::from_sec1_bytes(key) {
            return Ok(parsed);
        }
    }
    if let Some(pem) = pem_str(key) {
        if let Ok(parsed) = k256::PublicKey::from_public_key_pem(pem) {
            return Ok(parsed.into());
        }
    } else if let Ok(parsed) = k256::PublicKey::from_public_key_der(key) {
        return Ok(parsed.into());
    }
    Err(ChainError::InvalidType(
        "key is not a usable secp256k1 verifying key".to_string(),
    ))
}

fn parse_rsa_private_key(key: &[u8]) -> Result<rsa::RsaPrivateKey> {
    if let Some(pem) = pem_str(key) {
        if let Ok(parsed) = rsa::RsaPrivateKey::from_pkcs8_pem(pem) {
            return Ok(parsed);
        }
        if let Ok(parsed) = rsa::RsaPrivateKey::from_pkcs1_pem(pem) {
            return Ok(parsed);
        }
    } else {
        if let Ok(parsed) = rsa::RsaPrivateKey::from_pkcs8_der(key) {
            return Ok(parsed);
        }
        if let Ok(parsed) = rsa::RsaPrivateKey::from_pkcs1_der(key) {
            return Ok(parsed);
        }
    }
    Err(ChainError::InvalidType(
        "key is not a usable RSA private key".to_string(),
    ))
}

fn parse_rsa_public_key(key: &[u8]) -> Result<rsa::RsaPublicKey> {
    if let Some(pem) = pem_str(key) {
        if let Ok(parsed) = rsa::RsaPublicKey::from_public_key_pem(pem) {
            return Ok(parsed);
        }
        if let Ok(parsed) = rsa::RsaPublicKey::from_pkcs1_pem(pem) {
            return Ok(parsed);
        }
    } else {
        if let Ok(parsed) = rsa::RsaPublicKey::from_public_key_der(key) {
            return Ok(parsed);
        }
        if let Ok(parsed) = rsa::RsaPublicKey::from_pkcs1_der(key) {
            return Ok(parsed);
        }
    }
    Err(ChainError::InvalidType(
        "key is not a usable RSA public key".to_string(),
    ))
}

fn parse_ed25519_signing_key(key: &[u8]) -> Result<ed25519_dalek::SigningKey> {
    if let Ok(seed) = <&[u8; 32]>::try_from(key) {
        return Ok(ed25519_dalek::SigningKey::from_bytes(seed));
    }
    if let Ok(pair) = <&[u8; 64]>::try_from(key) {
        if let Ok(parsed) = ed25519_dalek::SigningKey::from_keypair_bytes(pair) {
            return Ok(parsed);
        }
    }
    if let Some(pem) = pem_str(key) {
        if let Ok(parsed) = ed25519_dalek::SigningKey::from_pkcs8_pem(pem) {
            return Ok(parsed);
        }
    } else if let Ok(parsed) = ed25519_dalek::SigningKey::from_pkcs8_der(key) {
        return Ok(parsed);
    }
    Err(ChainError::InvalidType(
        "key is not a usable Ed25519 signing key".to_string(),
    ))
}

fn parse_ed25519_public_key(key: &[u8]) -> Result<ed25519_dalek::VerifyingKey> {
    if let Ok(bytes) = <&[u8; 32]>::try_from(key) {
        if let Ok(parsed) = ed25519_dalek::VerifyingKey::from_bytes(bytes) {
            return Ok(parsed);
        }
    }
    if let Some(pem) = pem_str(key) {
        if let Ok(parsed) = ed25519_dalek::VerifyingKey::from_public_key_pem(pem) {
            return Ok(parsed);
        }
    } else if let Ok(parsed) = ed25519_dalek::VerifyingKey::from_public_key_der(key) {
        return Ok(parsed);
    }
    Err(ChainError::InvalidType(
        "key is not a usable Ed25519 verifying key".to_string(),
    ))
}

// ---------------------------------------------------------------------------
// DER signature framing
// ---------------------------------------------------------------------------

fn der_integer(out: &mut Vec<u8>, bytes: &[u8]) {
    let mut value: Vec<u8> = bytes.iter().copied().skip_while(|b| *b == 0).collect();
    if value.is_empty() {
        value.push(0);
    }
    let needs_pad = value.first().map(|b| b & 0x80 != 0).unwrap_or(false);
    out.push(0x02);
    out.push((value.len() + usize::from(needs_pad)) as u8);
    if needs_pad {
        out.push(0x00);
    }
    out.extend_from_slice(&value);
}

/// Encodes `(r, s)` as a DER `ECDSA-Sig-Value` sequence. Both halves are at
/// most 32 bytes, so single-byte DER lengths always suffice.
fn der_ecdsa_sig(r: &[u8], s: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(72);
    der_integer(&mut body, r);
    der_integer(&mut body, s);
    let mut out = Vec::with_capacity(body.len() + 2);
    out.push(0x30);
    out.push(body.len() as u8);
    out.extend_from_slice(&body);
    out
}

/// Accepts a 64-byte P1363 signature as-is, or unwraps a DER sequence back
/// into the fixed-width form.
fn normalize_ed25519_signature(signature: &[u8]) -> Result<[u8; 64]> {
    if let Ok(raw) = <&[u8; 64]>::try_from(signature) {
        return Ok(*raw);
    }
    let malformed = || ChainError::InvalidType("malformed Ed25519 signature".to_string());

    let mut reader = hychain_types::codec::ByteReader::new(signature.to_vec());
    if reader.read_u8().map_err(|_| malformed())? != 0x30 {
        return Err(malformed());
    }
    let _total = reader.read_u8().map_err(|_| malformed())?;
    let mut out = [0u8; 64];
    for half in 0..2 {
        if reader.read_u8().map_err(|_| malformed())? != 0x02 {
            return Err(malformed());
        }
        let len = reader.read_u8().map_err(|_| malformed())? as usize;
        let bytes = reader.read(Some(len)).map_err(|_| malformed())?;
        let trimmed: Vec<u8> = bytes.iter().copied().skip_while(|b| *b == 0).collect();
        if trimmed.len() > 32 {
            return Err(malformed());
        }
        let start = half * 32 + (32 - trimmed.len());
        out.get_mut(start..half * 32 + 32)
            .ok_or_else(malformed)?
            .copy_from_slice(&trimmed);
    }
    Ok(out)
}

#[cfg(test)]
mod tests;
