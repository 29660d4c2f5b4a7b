// Path: crates/crypto/src/sign/tests/mod.rs
use super::*;
use k256::elliptic_curve::sec1::ToEncodedPoint;

fn token() -> CancellationToken {
    CancellationToken::new()
}

#[tokio::test]
async fn test_hmac_sha256_length_and_determinism() {
    let key = [0x0b; 32];
    let first = sign_bytes(
        SignatureAlgorithm::Hmac(HashAlgorithm::Sha256),
        b"Test content",
        &key,
        false,
        &token(),
    )
    .await
    .unwrap();
    assert_eq!(first.byte_length().unwrap(), 32);

    let second = sign_bytes(
        SignatureAlgorithm::Hmac(HashAlgorithm::Sha256),
        b"Test content",
        &key,
        false,
        &token(),
    )
    .await
    .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_hmac_matches_keyed_hash() {
    let key = [0x42; 48];
    let via_sign = sign_bytes(
        SignatureAlgorithm::Hmac(HashAlgorithm::Sha512),
        b"payload",
        &key,
        false,
        &token(),
    )
    .await
    .unwrap();
    let via_hash = hash_data(b"payload", HashAlgorithm::Sha512, Some(&key)).unwrap();
    assert_eq!(via_sign, via_hash);
}

#[tokio::test]
async fn test_precancelled_token_fails_before_output() {
    let cancelled = CancellationToken::new();
    cancelled.cancel();
    let err = sign_bytes(
        SignatureAlgorithm::Hmac(HashAlgorithm::Sha256),
        b"Test content",
        &[0u8; 32],
        false,
        &cancelled,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ChainError::TokenCancelled));
}

#[tokio::test]
async fn test_ed25519_p1363_roundtrip() {
    let seed = [7u8; 32];
    let signature = sign_bytes(SignatureAlgorithm::Ed25519, b"message", &seed, true, &token())
        .await
        .unwrap();
    assert_eq!(signature.byte_length().unwrap(), 64);

    let public = ed25519_dalek::SigningKey::from_bytes(&seed)
        .verifying_key()
        .to_bytes();
    let mut source = BufferSource::from(&b"message"[..]);
    let ok = verify(
        SignatureAlgorithm::Ed25519,
        &mut source,
        &public,
        &signature.buffer().unwrap(),
        &token(),
    )
    .await
    .unwrap();
    assert!(ok);
}

#[tokio::test]
async fn test_ed25519_der_encoding_verifies() {
    let seed = [9u8; 32];
    let der_sig = sign_bytes(SignatureAlgorithm::Ed25519, b"message", &seed, false, &token())
        .await
        .unwrap();
    let der = der_sig.buffer().unwrap();
    // DER sequence header, then two integers.
    assert_eq!(der[0], 0x30);
    assert_ne!(der.len(), 64);

    let public = ed25519_dalek::SigningKey::from_bytes(&seed)
        .verifying_key()
        .to_bytes();
    let mut source = BufferSource::from(&b"message"[..]);
    let ok = verify(
        SignatureAlgorithm::Ed25519,
        &mut source,
        &public,
        &der,
        &token(),
    )
    .await
    .unwrap();
    assert!(ok);
}

#[tokio::test]
async fn test_ecdsa_sign_and_verify_with_raw_scalar() {
    let key = [0x42u8; 32];
    let signature = sign_bytes(
        SignatureAlgorithm::Ecdsa(HashAlgorithm::Sha512),
        b"canonical block bytes",
        &key,
        false,
        &token(),
    )
    .await
    .unwrap();

    let signing_key = k256::ecdsa::SigningKey::from_slice(&key).unwrap();
    let public = signing_key
        .verifying_key()
        .to_encoded_point(true)
        .as_bytes()
        .to_vec();

    let mut source = BufferSource::from(&b"canonical block bytes"[..]);
    let ok = verify(
        SignatureAlgorithm::Ecdsa(HashAlgorithm::Sha512),
        &mut source,
        &public,
        &signature.buffer().unwrap(),
        &token(),
    )
    .await
    .unwrap();
    assert!(ok);

    // A tampered message must not verify.
    let mut tampered = BufferSource::from(&b"canonical block bytez"[..]);
    let ok = verify(
        SignatureAlgorithm::Ecdsa(HashAlgorithm::Sha512),
        &mut tampered,
        &public,
        &signature.buffer().unwrap(),
        &token(),
    )
    .await
    .unwrap();
    assert!(!ok);
}

#[tokio::test]
async fn test_rsa_sign_and_verify() {
    use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey};

    // A small modulus keeps the test fast; the dispatch path is identical.
    let mut rng = rand::thread_rng();
    let private_key = rsa::RsaPrivateKey::new(&mut rng, 512).unwrap();
    let private_der = private_key.to_pkcs1_der().unwrap();
    let public_der = private_key.to_public_key().to_pkcs1_der().unwrap();

    let signature = sign_bytes(
        SignatureAlgorithm::Rsa(HashAlgorithm::Sha256),
        b"message",
        private_der.as_bytes(),
        false,
        &token(),
    )
    .await
    .unwrap();

    let mut source = BufferSource::from(&b"message"[..]);
    let ok = verify(
        SignatureAlgorithm::Rsa(HashAlgorithm::Sha256),
        &mut source,
        public_der.as_bytes(),
        &signature.buffer().unwrap(),
        &token(),
    )
    .await
    .unwrap();
    assert!(ok);
}

#[tokio::test]
async fn test_unknown_algorithm_name_is_invalid_type() {
    assert!(matches!(
        SignatureAlgorithm::parse("DSA-SHA1"),
        Err(ChainError::InvalidType(_))
    ));
    assert_eq!(
        SignatureAlgorithm::parse("ECDSA-SHA512").unwrap(),
        SignatureAlgorithm::Ecdsa(HashAlgorithm::Sha512)
    );
}

#[test]
fn test_der_integer_padding() {
    // High-bit-set values get a leading zero byte.
    let sig = der_ecdsa_sig(&[0x80; 32], &[0x01; 32]);
    assert_eq!(sig[0], 0x30);
    // r: 02 21 00 80…, s: 02 20 01…
    assert_eq!(&sig[2..5], &[0x02, 0x21, 0x00]);

    let back = normalize_ed25519_signature(&sig).unwrap();
    assert_eq!(&back[..32], &[0x80; 32]);
    assert_eq!(&back[32..], &[0x01; 32]);
}
