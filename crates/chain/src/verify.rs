// Path: crates/chain/src/verify.rs
//! Chain-level verification.
//!
//! Re-derives what the pipeline committed to: the Merkle root over the
//! transaction, the content signature over the serialized payload, the
//! chaining signature over the canonical block form, and the
//! `previous_hash` linkage across a stored sequence.

use hychain_api::source::BufferSource;
use hychain_api::token::CancellationToken;
use hychain_crypto::hash::HashAlgorithm;
use hychain_crypto::keys::KeyMaterial;
use hychain_crypto::merkle;
use hychain_crypto::sign::{self, SignatureAlgorithm};
use hychain_types::app::{genesis_previous_hash, Block};
use hychain_types::codec::{self, ToCodecValue};
use hychain_types::Result;

/// Verifies blocks against the public halves of a chain's signing key.
pub struct ChainVerifier {
    content_key: Vec<u8>,
    block_key: Vec<u8>,
}

impl ChainVerifier {
    /// Builds a verifier from explicit public keys: the Ed25519 verifying
    /// key for content signatures and the secp256k1 verifying key for
    /// chaining signatures.
    pub fn new(content_key: Vec<u8>, block_key: Vec<u8>) -> Self {
        Self {
            content_key,
            block_key,
        }
    }

    /// Derives both public halves from the private signing key the pipeline
    /// was given.
    pub fn from_signing_key(sign_key: &mut KeyMaterial) -> Result<Self> {
        let key_bytes = sign_key.master()?;
        Ok(Self {
            content_key: sign::ed25519_public_key(&key_bytes)?,
            block_key: sign::ecdsa_public_key(&key_bytes)?,
        })
    }

    /// Checks a single block: Merkle root, content length, content
    /// signature and chaining signature. Returns `false` on the first
    /// mismatch.
    pub async fn verify_block<P>(&self, block: &Block<P>, token: &CancellationToken) -> Result<bool>
    where
        P: ToCodecValue + Clone + Send + Sync,
    {
        let expected_root = merkle::create_root(&block.transaction.to_codec_value())?;
        if expected_root != block.headers.merkle_root {
            return Ok(false);
        }

        let payload_bytes = codec::serialize(&block.transaction.payload.to_codec_value())?;
        if payload_bytes.len() != block.headers.content_length as usize {
            return Ok(false);
        }

        let mut payload_source = BufferSource::from(payload_bytes.to_vec());
        let content_ok = sign::verify(
            SignatureAlgorithm::Ed25519,
            &mut payload_source,
            &self.content_key,
            &block.content_signature.buffer()?,
            token,
        )
        .await?;
        if !content_ok {
            return Ok(false);
        }

        let canonical = block.canonical_bytes()?;
        let mut canonical_source = BufferSource::from(canonical.to_vec());
        sign::verify(
            SignatureAlgorithm::Ecdsa(HashAlgorithm::Sha512),
            &mut canonical_source,
            &self.block_key,
            &block.block_signature.buffer()?,
            token,
        )
        .await
    }

    /// Checks an ordered sequence of blocks: contiguous sequence numbers
    /// from zero, `previous_hash` linkage, and every block's signatures.
    pub async fn verify_chain<P>(
        &self,
        blocks: &[Block<P>],
        token: &CancellationToken,
    ) -> Result<bool>
    where
        P: ToCodecValue + Clone + Send + Sync,
    {
        for (index, block) in blocks.iter().enumerate() {
            if block.sequence as usize != index {
                return Ok(false);
            }
            let linked = match index.checked_sub(1).and_then(|prev| blocks.get(prev)) {
                None => block.previous_hash == genesis_previous_hash(),
                Some(previous) => block.previous_hash == previous.block_signature,
            };
            if !linked {
                return Ok(false);
            }
            if !self.verify_block(block, token).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
