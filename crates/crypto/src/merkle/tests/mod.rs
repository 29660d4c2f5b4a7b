// Path: crates/crypto/src/merkle/tests/mod.rs
use super::*;
use crate::hash::{hash_data, HashAlgorithm};

fn leaf(data: &[u8]) -> HashEntity {
    hash_data_default(data).unwrap()
}

fn leaves(n: usize) -> Vec<HashEntity> {
    (0..n).map(|i| leaf(format!("leaf-{i}").as_bytes())).collect()
}

#[test]
fn test_empty_input_hashes_empty_sequence() {
    let root = compute_root(&[]).unwrap();
    assert_eq!(root, hash_data(b"", HashAlgorithm::Sha384, None).unwrap());
}

#[test]
fn test_single_leaf_pairs_with_itself() {
    let h = leaf(b"a");
    let root = compute_root(std::slice::from_ref(&h)).unwrap();

    let mut joined = h.buffer().unwrap().to_vec();
    joined.extend_from_slice(&h.buffer().unwrap());
    let expected = hash_data(&joined, HashAlgorithm::Sha384, None).unwrap();
    assert_eq!(root, expected);
}

#[test]
fn test_two_leaves() {
    let l = leaves(2);
    let root = compute_root(&l).unwrap();

    let mut joined = l[0].buffer().unwrap().to_vec();
    joined.extend_from_slice(&l[1].buffer().unwrap());
    assert_eq!(root, hash_data_default(&joined).unwrap());
}

#[test]
fn test_root_is_deterministic() {
    for n in [1, 2, 3, 5, 8, 33] {
        let l = leaves(n);
        assert_eq!(
            compute_root(&l).unwrap(),
            compute_root(&l).unwrap(),
            "root for {n} leaves"
        );
    }
}

#[test]
fn test_order_matters() {
    let l = leaves(4);
    let mut reversed = l.clone();
    reversed.reverse();
    assert_ne!(compute_root(&l).unwrap(), compute_root(&reversed).unwrap());
}

#[test]
fn test_proof_soundness_for_leftmost_path() {
    for n in [1, 2, 4, 7, 16] {
        let l = leaves(n);
        let root = compute_root(&l).unwrap();
        let proof = generate_proof(&l, &l[0]).unwrap();
        assert!(
            verify_proof(&l[0], &proof, &root).unwrap(),
            "proof for {n} leaves"
        );
    }
}

#[test]
fn test_tampered_proof_fails() {
    let l = leaves(8);
    let root = compute_root(&l).unwrap();
    let proof = generate_proof(&l, &l[0]).unwrap();

    let mut tampered: Vec<HashEntity> = proof.clone();
    let mut bytes = tampered[1].buffer().unwrap().to_vec();
    bytes[0] ^= 0xff;
    tampered[1] = HashEntity::new(bytes);

    assert!(!verify_proof(&l[0], &tampered, &root).unwrap());
}

#[test]
fn test_wrong_root_fails() {
    let l = leaves(4);
    let proof = generate_proof(&l, &l[0]).unwrap();
    let wrong_root = leaf(b"unrelated");
    assert!(!verify_proof(&l[0], &proof, &wrong_root).unwrap());
}

#[test]
fn test_missing_target_is_missing_object() {
    let l = leaves(4);
    let absent = leaf(b"absent");
    assert!(matches!(
        generate_proof(&l, &absent),
        Err(ChainError::MissingObject(_))
    ));
}

#[test]
fn test_right_fold_limitation_is_observable() {
    // The verifier folds siblings on the right only; a target whose first
    // sibling lies on its left does not verify. Proofs for such paths need
    // side bits, which this format does not carry.
    let l = leaves(2);
    let root = compute_root(&l).unwrap();
    let proof = generate_proof(&l, &l[1]).unwrap();
    assert!(!verify_proof(&l[1], &proof, &root).unwrap());
}

#[test]
fn test_create_root_over_small_payload() {
    use hychain_types::codec::Value;

    // A 3-byte serialized payload fits one chunk; the root is the chunk
    // digest paired with itself.
    let root = create_root(&Value::String("x".into())).unwrap();

    let serialized = codec::serialize(&Value::String("x".into())).unwrap();
    assert_eq!(serialized.len(), 3);
    let chunk_digest = hash_data_default(&serialized).unwrap();
    let mut joined = chunk_digest.buffer().unwrap().to_vec();
    joined.extend_from_slice(&chunk_digest.buffer().unwrap());
    assert_eq!(root, hash_data_default(&joined).unwrap());
}

#[test]
fn test_create_root_chunks_large_payloads() {
    use hychain_types::codec::Value;

    // 3000 payload bytes serialize past two chunk boundaries; the root must
    // differ from the single-chunk digest of the same prefix.
    let big = "a".repeat(3000);
    let root = create_root(&Value::String(big.clone())).unwrap();
    let small_root = create_root(&Value::String(big[..1000].to_string())).unwrap();
    assert_ne!(root, small_root);

    // Deterministic across calls.
    assert_eq!(root, create_root(&Value::String(big)).unwrap());
}
