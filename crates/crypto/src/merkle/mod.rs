// Path: crates/crypto/src/merkle/mod.rs
//! The Merkle digest engine.
//!
//! Roots are built by pairwise SHA-384 hashing: adjacent leaves are
//! concatenated and hashed, an odd element is paired with itself, and the
//! fold repeats until one digest remains. A non-empty input always goes
//! through at least one pairing round, so a single leaf hashes to
//! `H(leaf ‖ leaf)` rather than passing through unchanged.
//!
//! Proof verification folds siblings on the right of the running hash.
//! Proofs carry no side bits; paths that would require a left-side sibling
//! are outside what [`verify_proof`] can confirm.

use std::collections::HashMap;

use bytes::Bytes;

use hychain_types::codec::{self, Value};
use hychain_types::error::ChainError;
use hychain_types::hash::HashEntity;
use hychain_types::{Result, PAYLOAD_CHUNK_BYTES};

use crate::hash::hash_data_default;

fn pair_digest(left: &[u8], right: &[u8]) -> Result<Bytes> {
    let mut joined = Vec::with_capacity(left.len() + right.len());
    joined.extend_from_slice(left);
    joined.extend_from_slice(right);
    hash_data_default(&joined)?.buffer()
}

/// Folds one level: hashes adjacent pairs, duplicating a trailing odd
/// element. The result at index `i/2` covers the inputs at `i` and `i+1`.
fn fold_level(level: &[Bytes]) -> Result<Vec<Bytes>> {
    let mut next = Vec::with_capacity(level.len().div_ceil(2));
    for pair in level.chunks(2) {
        let left = pair.first().ok_or(ChainError::EndOfStream)?;
        let right = pair.get(1).unwrap_or(left);
        next.push(pair_digest(left, right)?);
    }
    Ok(next)
}

/// Computes the root over an ordered list of leaf digests.
///
/// An empty input yields the digest of the empty byte sequence.
pub fn compute_root(leaves: &[HashEntity]) -> Result<HashEntity> {
    if leaves.is_empty() {
        return hash_data_default(b"");
    }
    let mut level: Vec<Bytes> = leaves
        .iter()
        .map(HashEntity::buffer)
        .collect::<Result<_>>()?;
    loop {
        level = fold_level(&level)?;
        if level.len() == 1 {
            break;
        }
    }
    level
        .into_iter()
        .next()
        .map(HashEntity::new)
        .ok_or(ChainError::EndOfStream)
}

/// Serializes a payload under the canonical codec, chunks the byte stream
/// into [`PAYLOAD_CHUNK_BYTES`] segments, and computes the root over the
/// chunk digests. An empty byte stream contributes one empty chunk.
pub fn create_root(payload: &Value) -> Result<HashEntity> {
    let serialized = codec::serialize(payload)?;
    let leaves = chunk_digests(&serialized)?;
    compute_root(&leaves)
}

fn chunk_digests(bytes: &[u8]) -> Result<Vec<HashEntity>> {
    if bytes.is_empty() {
        return Ok(vec![hash_data_default(b"")?]);
    }
    bytes
        .chunks(PAYLOAD_CHUNK_BYTES)
        .map(hash_data_default)
        .collect()
}

/// Builds the sibling path that links `target` to the root of `leaves`.
///
/// Fails with `ERR_MISSING_OBJECT` when the target digest is not among the
/// leaves. When a position has no right sibling, the element itself is
/// recorded, mirroring the duplication rule of [`compute_root`].
pub fn generate_proof(leaves: &[HashEntity], target: &HashEntity) -> Result<Vec<HashEntity>> {
    let mut index_of: HashMap<Vec<u8>, usize> = HashMap::with_capacity(leaves.len());
    for (i, leaf) in leaves.iter().enumerate() {
        index_of.entry(leaf.buffer()?.to_vec()).or_insert(i);
    }

    let mut position = *index_of
        .get(target.buffer()?.as_ref())
        .ok_or_else(|| ChainError::MissingObject("target digest is not a leaf".to_string()))?;

    let mut level: Vec<Bytes> = leaves
        .iter()
        .map(HashEntity::buffer)
        .collect::<Result<_>>()?;
    let mut proof = Vec::new();

    while !level.is_empty() {
        let sibling_index = position ^ 1;
        let sibling = level
            .get(sibling_index)
            .or_else(|| level.get(position))
            .ok_or(ChainError::EndOfStream)?;
        proof.push(HashEntity::new(sibling.clone()));

        level = fold_level(&level)?;
        if level.len() == 1 {
            break;
        }
        position /= 2;
    }

    Ok(proof)
}

/// Folds `hash ← H(hash ‖ sibling)` across the proof and compares the
/// result to the declared root, byte for byte. A mismatch returns `false`;
/// only disposed inputs error.
pub fn verify_proof(
    target: &HashEntity,
    proof: &[HashEntity],
    root: &HashEntity,
) -> Result<bool> {
    let mut hash = target.buffer()?;
    for sibling in proof {
        hash = pair_digest(&hash, &sibling.buffer()?)?;
    }
    Ok(hash == root.buffer()?)
}

#[cfg(test)]
mod tests;
