// Path: crates/chain/src/pipeline.rs
//! The block assembly pipeline.
//!
//! Assembly is strictly sequential from the caller's perspective: token
//! check, timestamp capture, key extraction, Merkle root, payload
//! serialization, content signature (Ed25519, P1363), record assembly,
//! canonical serialization, chaining signature (ECDSA-SHA512, DER), final
//! token check, commit. The store handle is consumed by the pipeline and
//! disposed once the write session ends, on success and failure alike.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use hychain_api::store::BlockStore;
use hychain_api::token::{ensure_active, CancellationToken};
use hychain_crypto::hash::HashAlgorithm;
use hychain_crypto::keys::KeyMaterial;
use hychain_crypto::merkle;
use hychain_crypto::sign::{sign_bytes, SignatureAlgorithm};
use hychain_types::app::{
    format_utc_timestamp, genesis_previous_hash, Block, BlockHeaders, Transaction, BLOCK_VERSION,
};
use hychain_types::codec::{self, ToCodecValue};
use hychain_types::error::ChainError;
use hychain_types::hash::HashEntity;
use hychain_types::id::{long_id, public_block_id};
use hychain_types::Result;

/// Free-form scalar annotations attached to a block at assembly time.
pub type BlockMetadata = BTreeMap<String, serde_json::Value>;

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Assembles and commits the genesis block of a chain.
pub async fn create_genesis_block<P>(
    transaction: Transaction<P>,
    sign_key: &mut KeyMaterial,
    store: Box<dyn BlockStore<P>>,
    metadata: Option<BlockMetadata>,
    token: &CancellationToken,
) -> Result<Block<P>>
where
    P: ToCodecValue + Clone + Send + Sync,
{
    seal_block(transaction, sign_key, store, metadata, None, token).await
}

/// Assembles and commits the successor of `previous`.
///
/// The new block takes `previous.sequence + 1` and links back through the
/// predecessor's chaining signature; the all-zeroes marker is reserved for
/// genesis.
pub async fn append_block<P>(
    previous: &Block<P>,
    transaction: Transaction<P>,
    sign_key: &mut KeyMaterial,
    store: Box<dyn BlockStore<P>>,
    metadata: Option<BlockMetadata>,
    token: &CancellationToken,
) -> Result<Block<P>>
where
    P: ToCodecValue + Clone + Send + Sync,
{
    seal_block(transaction, sign_key, store, metadata, Some(previous), token).await
}

async fn seal_block<P>(
    transaction: Transaction<P>,
    sign_key: &mut KeyMaterial,
    store: Box<dyn BlockStore<P>>,
    metadata: Option<BlockMetadata>,
    previous: Option<&Block<P>>,
    token: &CancellationToken,
) -> Result<Block<P>>
where
    P: ToCodecValue + Clone + Send + Sync,
{
    let result = assemble_and_commit(transaction, sign_key, &*store, metadata, previous, token)
        .await;
    // The write session owns its handle; release it on every exit path.
    store.dispose();
    result
}

async fn assemble_and_commit<P>(
    transaction: Transaction<P>,
    sign_key: &mut KeyMaterial,
    store: &dyn BlockStore<P>,
    metadata: Option<BlockMetadata>,
    previous: Option<&Block<P>>,
    token: &CancellationToken,
) -> Result<Block<P>>
where
    P: ToCodecValue + Clone + Send + Sync,
{
    ensure_active(token)?;
    let ts = now_millis();
    let key_bytes = sign_key.master()?;

    let merkle_root = merkle::create_root(&transaction.to_codec_value())?;

    let payload_bytes = codec::serialize(&transaction.payload.to_codec_value())?;
    let content_length = u32::try_from(payload_bytes.len()).map_err(|_| {
        ChainError::InvalidArgument("serialized payload exceeds u32 length".to_string())
    })?;
    let headers = BlockHeaders {
        ts,
        timestamp: format_utc_timestamp(ts),
        content_length,
        merkle_root,
        version: BLOCK_VERSION,
        nonce: 0,
    };

    let content_signature = sign_bytes(
        SignatureAlgorithm::Ed25519,
        &payload_bytes,
        &key_bytes,
        true,
        token,
    )
    .await?;

    let (sequence, previous_hash) = match previous {
        None => (0, genesis_previous_hash()),
        Some(prev) => (prev.sequence + 1, prev.block_signature.clone()),
    };

    let mut block = Block {
        id: long_id(),
        public_block_id: public_block_id(),
        previous_hash,
        sequence,
        transaction,
        headers,
        metadata: metadata.unwrap_or_default(),
        content_signature,
        block_signature: HashEntity::new(Vec::new()),
    };

    let canonical = block.canonical_bytes()?;
    block.block_signature = sign_bytes(
        SignatureAlgorithm::Ecdsa(HashAlgorithm::Sha512),
        &canonical,
        &key_bytes,
        false,
        token,
    )
    .await?;

    ensure_active(token)?;

    debug!(sequence, id = %block.id, "committing assembled block");
    if !store.put_block(block.clone()).await? {
        return Err(ChainError::Unknown(
            "chain storage rejected the block write".to_string(),
        ));
    }
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use hychain_api::store::DisposeCallback;
    use hychain_crypto::keys::{KeyAlgorithm, KeyDetails, KeyFormat, KeyKind};
    use hychain_storage::MemoryStore;

    /// A fixed 32-byte secret that is simultaneously a valid Ed25519 seed
    /// and a valid secp256k1 scalar.
    const SIGN_KEY: [u8; 32] = [0x42; 32];

    fn signing_key() -> KeyMaterial {
        KeyMaterial::from_encoded(
            SIGN_KEY.to_vec(),
            KeyFormat::Raw,
            KeyAlgorithm::asymmetric(KeyKind::Private, "Ed25519", 32),
            KeyDetails::default(),
            None,
        )
    }

    fn token() -> CancellationToken {
        CancellationToken::new()
    }

    #[tokio::test]
    async fn test_genesis_block_shape() {
        let mut key = signing_key();
        let tx = Transaction::new("x".to_string(), 0);
        let block = create_genesis_block(tx, &mut key, Box::new(MemoryStore::new()), None, &token())
            .await
            .unwrap();

        assert_eq!(block.sequence, 0);
        assert_eq!(
            block.previous_hash.buffer().unwrap().as_ref(),
            "0".repeat(64).as_bytes()
        );
        // String tag ‖ varint length ‖ payload byte.
        assert_eq!(block.headers.content_length, 3);
        assert_eq!(block.headers.version, BLOCK_VERSION);
        assert_eq!(block.headers.nonce, 0);
        assert!(block.headers.ts > 0);
        assert_eq!(block.content_signature.byte_length().unwrap(), 64);
        assert!(block.block_signature.byte_length().unwrap() > 0);
        assert_eq!(block.public_block_id.len(), 32);
        assert_eq!(block.id.len(), 32);
        assert_eq!(
            block.headers.merkle_root.byte_length().unwrap(),
            HashAlgorithm::Sha384.digest_size()
        );
    }

    #[tokio::test]
    async fn test_pipeline_disposes_its_store_handle() {
        let store = MemoryStore::new();
        let disposed = Arc::new(AtomicBool::new(false));
        let flag = disposed.clone();
        store
            .on_dispose(Box::new(move || {
                flag.store(true, Ordering::SeqCst);
            }) as DisposeCallback)
            .unwrap();

        let mut key = signing_key();
        create_genesis_block(
            Transaction::new("x".to_string(), 0),
            &mut key,
            Box::new(store),
            None,
            &token(),
        )
        .await
        .unwrap();
        assert!(disposed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_append_links_through_block_signature() {
        let mut key = signing_key();
        let genesis = create_genesis_block(
            Transaction::new("first".to_string(), 0),
            &mut key,
            Box::new(MemoryStore::new()),
            None,
            &token(),
        )
        .await
        .unwrap();

        let next = append_block(
            &genesis,
            Transaction::new("second".to_string(), 1),
            &mut key,
            Box::new(MemoryStore::new()),
            None,
            &token(),
        )
        .await
        .unwrap();

        assert_eq!(next.sequence, 1);
        assert_eq!(next.previous_hash, genesis.block_signature);
        assert_ne!(next.id, genesis.id);
        assert_ne!(next.public_block_id, genesis.public_block_id);
    }

    #[tokio::test]
    async fn test_metadata_travels_with_the_block() {
        let mut key = signing_key();
        let mut metadata = BlockMetadata::new();
        metadata.insert("origin".to_string(), serde_json::json!("unit-test"));

        let block = create_genesis_block(
            Transaction::new("x".to_string(), 0),
            &mut key,
            Box::new(MemoryStore::new()),
            Some(metadata),
            &token(),
        )
        .await
        .unwrap();
        assert_eq!(block.metadata["origin"], "unit-test");
    }

    #[tokio::test]
    async fn test_cancelled_token_aborts_before_commit() {
        let cancelled = CancellationToken::new();
        cancelled.cancel();
        let mut key = signing_key();
        let err = create_genesis_block(
            Transaction::new("x".to_string(), 0),
            &mut key,
            Box::new(MemoryStore::<String>::new()),
            None,
            &cancelled,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ChainError::TokenCancelled));
    }

    /// A store that rejects every write, for exercising the pipeline's
    /// boundary conversion of `false` into an error.
    struct RejectingStore;

    #[async_trait]
    impl BlockStore<String> for RejectingStore {
        async fn put_block(&self, _block: Block<String>) -> Result<bool> {
            Ok(false)
        }
        fn get_block(&self, _id: &str) -> Result<Option<Block<String>>> {
            Ok(None)
        }
        fn has_block(&self, _id: &str) -> Result<bool> {
            Ok(false)
        }
        fn get_block_by_sequence(&self, _sequence: u32) -> Result<Option<Block<String>>> {
            Ok(None)
        }
        fn get_latest_block(&self) -> Result<Option<Block<String>>> {
            Ok(None)
        }
        fn get_all_blocks(&self) -> Result<Vec<Block<String>>> {
            Ok(Vec::new())
        }
        fn on_dispose(&self, _callback: DisposeCallback) -> Result<()> {
            Ok(())
        }
        fn dispose(&self) {}
        fn is_disposed(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_rejected_write_becomes_an_error() {
        let mut key = signing_key();
        let err = create_genesis_block(
            Transaction::new("x".to_string(), 0),
            &mut key,
            Box::new(RejectingStore),
            None,
            &token(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ChainError::Unknown(_)));
    }
}
