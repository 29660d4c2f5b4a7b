// Path: crates/crypto/src/armor/mod.rs
//! The at-rest armor envelope for key material.
//!
//! Format:
//! [ Magic: "HY CHAIN ARMORED KEY" (20) ]
//! [ Flag: u8 (1) ]
//! [ Body: N ]
//!
//! Flag `0` marks a plaintext body. Flag `1` marks a body encrypted with
//! AES-128-CBC under a 32-byte wrapping key split as
//! `[0,16) = master ‖ [16,32) = IV`, PKCS#7 padded. Any other flag value is
//! rejected on decode before the body is touched.

use aes::cipher::block_padding::Pkcs7;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::Engine;
use bytes::Bytes;

use hychain_types::error::ChainError;
use hychain_types::Result;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// The fixed 20-byte magic header every armored envelope starts with.
pub const MAGIC: &[u8; 20] = b"HY CHAIN ARMORED KEY";

/// Flag byte marking a plaintext body.
pub const FLAG_PLAIN: u8 = 0;
/// Flag byte marking an AES-128-CBC encrypted body.
pub const FLAG_ENCRYPTED: u8 = 1;

/// The number of wrapping-key bytes an encrypted envelope consumes.
pub const WRAP_KEY_BYTES: usize = 32;

/// Text encodings an envelope can be emitted in or decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// Standard base64 with padding.
    Base64,
    /// Lowercase hex.
    Hex,
}

impl TextEncoding {
    fn encode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Base64 => base64::engine::general_purpose::STANDARD.encode(bytes),
            Self::Hex => hex::encode(bytes),
        }
    }

    fn decode(&self, text: &str) -> Result<Vec<u8>> {
        match self {
            Self::Base64 => base64::engine::general_purpose::STANDARD
                .decode(text)
                .map_err(|e| ChainError::InvalidChunk(format!("invalid base64 input: {e}"))),
            Self::Hex => hex::decode(text)
                .map_err(|e| ChainError::InvalidChunk(format!("invalid hex input: {e}"))),
        }
    }
}

/// Splits a wrapping key into its master and IV halves.
///
/// Fails with `ERR_CRYPTO_KEY_SHORT` when fewer than [`WRAP_KEY_BYTES`]
/// bytes are supplied.
fn parse_key(key: Option<&[u8]>) -> Result<(&[u8], &[u8])> {
    let key = key.unwrap_or(&[]);
    if key.len() < WRAP_KEY_BYTES {
        return Err(ChainError::CryptoKeyShort {
            expected: WRAP_KEY_BYTES,
            got: key.len(),
        });
    }
    let master = key.get(..16).ok_or(ChainError::EndOfStream)?;
    let iv = key.get(16..32).ok_or(ChainError::EndOfStream)?;
    Ok((master, iv))
}

/// Wraps `source` in an armor envelope.
///
/// With `encrypted` set, the body is AES-128-CBC encrypted under `key`.
/// An output encoding converts the final envelope bytes to their text form
/// (returned as ASCII bytes).
pub fn armor(
    encrypted: bool,
    source: &[u8],
    key: Option<&[u8]>,
    output_encoding: Option<TextEncoding>,
) -> Result<Bytes> {
    let mut out = Vec::with_capacity(MAGIC.len() + 1 + source.len() + 16);
    out.extend_from_slice(MAGIC);
    if encrypted {
        let (master, iv) = parse_key(key)?;
        let cipher = Aes128CbcEnc::new_from_slices(master, iv)
            .map_err(|e| ChainError::Unknown(format!("cipher init: {e}")))?;
        out.push(FLAG_ENCRYPTED);
        out.extend_from_slice(&cipher.encrypt_padded_vec_mut::<Pkcs7>(source));
    } else {
        out.push(FLAG_PLAIN);
        out.extend_from_slice(source);
    }

    match output_encoding {
        Some(encoding) => Ok(Bytes::from(encoding.encode(&out).into_bytes())),
        None => Ok(Bytes::from(out)),
    }
}

/// Input accepted by [`dearmor`]: raw envelope bytes or a text rendering.
#[derive(Debug, Clone, Copy)]
pub enum ArmorInput<'a> {
    /// Raw envelope bytes.
    Bytes(&'a [u8]),
    /// A text rendering of the envelope.
    Text(&'a str),
}

impl<'a> From<&'a [u8]> for ArmorInput<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a> From<&'a str> for ArmorInput<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(text)
    }
}

fn looks_like_base64(text: &str) -> bool {
    !text.is_empty()
        && text.len() % 4 == 0
        && text
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=')
}

/// Unwraps an armor envelope.
///
/// String inputs are decoded with the explicit encoding when one is given;
/// otherwise a base64-shaped string is decoded as base64 and anything else
/// is taken as raw bytes. The magic header is verified before the flag is
/// dispatched.
pub fn dearmor<'a>(
    input: impl Into<ArmorInput<'a>>,
    key: Option<&[u8]>,
    input_encoding: Option<TextEncoding>,
) -> Result<Bytes> {
    let owned;
    let bytes: &[u8] = match input.into() {
        ArmorInput::Bytes(bytes) => bytes,
        ArmorInput::Text(text) => {
            if let Some(encoding) = input_encoding {
                owned = encoding.decode(text)?;
                &owned
            } else if looks_like_base64(text) {
                owned = TextEncoding::Base64.decode(text)?;
                &owned
            } else {
                text.as_bytes()
            }
        }
    };

    let magic = bytes.get(..MAGIC.len());
    if magic != Some(MAGIC.as_slice()) {
        return Err(ChainError::MagicNumberMismatch);
    }
    let flag = bytes
        .get(MAGIC.len())
        .copied()
        .ok_or(ChainError::EndOfStream)?;
    let body = bytes.get(MAGIC.len() + 1..).unwrap_or(&[]);

    match flag {
        FLAG_PLAIN => Ok(Bytes::from(body.to_vec())),
        FLAG_ENCRYPTED => {
            let (master, iv) = parse_key(key)?;
            let cipher = Aes128CbcDec::new_from_slices(master, iv)
                .map_err(|e| ChainError::Unknown(format!("cipher init: {e}")))?;
            let plain = cipher
                .decrypt_padded_vec_mut::<Pkcs7>(body)
                .map_err(|_| {
                    ChainError::InvalidChunk("armored body failed to decrypt".to_string())
                })?;
            Ok(Bytes::from(plain))
        }
        other => Err(ChainError::InvalidBitflag(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap_key() -> Vec<u8> {
        let mut key = vec![0x01; 16];
        key.extend_from_slice(&[0x02; 16]);
        key
    }

    #[test]
    fn test_plaintext_envelope_layout() {
        let src = b"Hello, HyChain!";
        let armored = armor(false, src, None, None).unwrap();

        assert_eq!(&armored[..20], MAGIC);
        assert_eq!(armored[20], FLAG_PLAIN);
        assert_eq!(&armored[21..], src);

        let back = dearmor(armored.as_ref(), None, None).unwrap();
        assert_eq!(back.as_ref(), src);
    }

    #[test]
    fn test_encrypted_roundtrip() {
        let src = b"Hello, HyChain!";
        let key = wrap_key();

        let armored = armor(true, src, Some(&key), None).unwrap();
        assert_eq!(&armored[..20], MAGIC);
        assert_eq!(armored[20], FLAG_ENCRYPTED);
        // CBC output is block-aligned and never equals the plaintext.
        assert_ne!(&armored[21..], src);
        assert_eq!((armored.len() - 21) % 16, 0);

        let back = dearmor(armored.as_ref(), Some(&key), None).unwrap();
        assert_eq!(back.as_ref(), src);
    }

    #[test]
    fn test_short_key_is_rejected() {
        let err = armor(true, b"src", Some(b"too-short-key"), None).unwrap_err();
        assert!(matches!(
            err,
            ChainError::CryptoKeyShort {
                expected: 32,
                got: 13
            }
        ));
    }

    #[test]
    fn test_unknown_flag_is_invalid_bitflag() {
        let mut bytes = MAGIC.to_vec();
        bytes.push(99);
        bytes.extend_from_slice(b"body");
        let err = dearmor(bytes.as_slice(), None, None).unwrap_err();
        assert!(matches!(err, ChainError::InvalidBitflag(99)));
    }

    #[test]
    fn test_bad_magic_is_mismatch() {
        let err = dearmor(&b"INVALID_DATA"[..], None, None).unwrap_err();
        assert!(matches!(err, ChainError::MagicNumberMismatch));
    }

    #[test]
    fn test_base64_text_roundtrip() {
        let src = b"key material";
        let key = wrap_key();
        let armored = armor(true, src, Some(&key), Some(TextEncoding::Base64)).unwrap();
        let text = std::str::from_utf8(&armored).unwrap().to_string();

        // Auto-detected base64.
        let back = dearmor(text.as_str(), Some(&key), None).unwrap();
        assert_eq!(back.as_ref(), src);

        // Explicit encoding.
        let back = dearmor(text.as_str(), Some(&key), Some(TextEncoding::Base64)).unwrap();
        assert_eq!(back.as_ref(), src);
    }

    #[test]
    fn test_hex_text_roundtrip() {
        let src = b"key material";
        let armored = armor(false, src, None, Some(TextEncoding::Hex)).unwrap();
        let text = std::str::from_utf8(&armored).unwrap().to_string();
        let back = dearmor(text.as_str(), None, Some(TextEncoding::Hex)).unwrap();
        assert_eq!(back.as_ref(), src);
    }

    #[test]
    fn test_wrong_key_fails_decrypt() {
        let key = wrap_key();
        let armored = armor(true, b"secret", Some(&key), None).unwrap();

        let mut wrong = key.clone();
        wrong[0] ^= 0xff;
        // Either the padding check trips or the plaintext comes back garbled.
        match dearmor(armored.as_ref(), Some(&wrong), None) {
            Err(e) => assert!(matches!(e, ChainError::InvalidChunk(_))),
            Ok(out) => assert_ne!(out.as_ref(), b"secret"),
        }
    }
}
