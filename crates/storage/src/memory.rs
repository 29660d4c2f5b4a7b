// Path: crates/storage/src/memory.rs
//! The in-memory block store.

use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::{debug, warn};

use hychain_api::store::{BlockStore, DisposeCallback};
use hychain_types::app::Block;
use hychain_types::error::ChainError;
use hychain_types::Result;

struct Inner<P> {
    by_id: HashMap<String, Block<P>>,
    by_sequence: BTreeMap<u32, Block<P>>,
    dispose_callbacks: Vec<DisposeCallback>,
}

/// A dual-indexed, in-memory [`BlockStore`].
///
/// All mutation happens under one lock, which keeps the id and sequence
/// indexes in lock-step: a successful insert lands in both, a rejected one
/// in neither.
pub struct MemoryStore<P> {
    inner: Mutex<Inner<P>>,
    disposed: AtomicBool,
}

impl<P> Default for MemoryStore<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> MemoryStore<P> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                by_id: HashMap::new(),
                by_sequence: BTreeMap::new(),
                dispose_callbacks: Vec::new(),
            }),
            disposed: AtomicBool::new(false),
        }
    }

    fn guard(&self) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(ChainError::ResourceDisposed("MemoryStore"));
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Inner<P>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Structural validation: every identity and signature field must be
    /// present and non-empty before a block is admitted.
    fn validate_block(block: &Block<P>) -> bool {
        if block.id.is_empty() || block.public_block_id.is_empty() {
            return false;
        }
        let non_empty = |entity: &hychain_types::hash::HashEntity| {
            entity.byte_length().map(|len| len > 0).unwrap_or(false)
        };
        non_empty(&block.previous_hash)
            && non_empty(&block.content_signature)
            && non_empty(&block.block_signature)
            && non_empty(&block.headers.merkle_root)
    }
}

#[async_trait]
impl<P> BlockStore<P> for MemoryStore<P>
where
    P: Clone + Send + Sync,
{
    async fn put_block(&self, block: Block<P>) -> Result<bool> {
        self.guard()?;
        if !Self::validate_block(&block) {
            debug!(id = %block.id, "rejecting structurally invalid block");
            return Ok(false);
        }

        let mut inner = self.lock();
        if inner.by_id.contains_key(&block.id) || inner.by_sequence.contains_key(&block.sequence)
        {
            debug!(id = %block.id, sequence = block.sequence, "rejecting duplicate block");
            return Ok(false);
        }

        debug!(id = %block.id, sequence = block.sequence, "committing block");
        inner.by_sequence.insert(block.sequence, block.clone());
        inner.by_id.insert(block.id.clone(), block);
        Ok(true)
    }

    fn get_block(&self, id: &str) -> Result<Option<Block<P>>> {
        self.guard()?;
        Ok(self.lock().by_id.get(id).cloned())
    }

    fn has_block(&self, id: &str) -> Result<bool> {
        self.guard()?;
        Ok(self.lock().by_id.contains_key(id))
    }

    fn get_block_by_sequence(&self, sequence: u32) -> Result<Option<Block<P>>> {
        self.guard()?;
        Ok(self.lock().by_sequence.get(&sequence).cloned())
    }

    fn get_latest_block(&self) -> Result<Option<Block<P>>> {
        self.guard()?;
        Ok(self
            .lock()
            .by_sequence
            .last_key_value()
            .map(|(_, block)| block.clone()))
    }

    fn get_all_blocks(&self) -> Result<Vec<Block<P>>> {
        self.guard()?;
        Ok(self.lock().by_sequence.values().cloned().collect())
    }

    fn on_dispose(&self, callback: DisposeCallback) -> Result<()> {
        self.guard()?;
        self.lock().dispose_callbacks.push(callback);
        Ok(())
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut inner = self.lock();
        let callbacks = std::mem::take(&mut inner.dispose_callbacks);
        inner.by_id.clear();
        inner.by_sequence.clear();
        drop(inner);

        debug!(callbacks = callbacks.len(), "disposing in-memory store");
        for callback in callbacks {
            // Callbacks are best-effort; a panicking one is swallowed.
            if catch_unwind(AssertUnwindSafe(callback)).is_err() {
                warn!("dispose callback panicked; continuing");
            }
        }
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}
