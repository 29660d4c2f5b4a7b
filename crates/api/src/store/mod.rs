// Path: crates/api/src/store/mod.rs
//! API for a dual-indexed block store.

use async_trait::async_trait;

use hychain_types::app::Block;
use hychain_types::Result;

/// A callback registered to run when a store handle is disposed.
pub type DisposeCallback = Box<dyn FnOnce() + Send + 'static>;

/// The primary trait defining the API for a block store.
///
/// A store keeps two indexes over the same block set, by opaque id and by
/// monotonic sequence, and must keep them in lock-step: a successful
/// [`BlockStore::put_block`] lands the entry in both or in neither.
///
/// Every operation fails with `ERR_RESOURCE_DISPOSED` once the handle has
/// been disposed.
#[async_trait]
pub trait BlockStore<P>: Send + Sync {
    /// Inserts a block.
    ///
    /// Returns `true` when newly inserted, `false` when the block's id is
    /// already present or the block fails structural validation. Rejection
    /// is an explicit signal, not an error.
    ///
    /// This is async to allow backpressure from persistent backends.
    async fn put_block(&self, block: Block<P>) -> Result<bool>;

    /// Retrieves a block by its storage id.
    fn get_block(&self, id: &str) -> Result<Option<Block<P>>>;

    /// Whether a block with the given storage id exists.
    fn has_block(&self, id: &str) -> Result<bool>;

    /// Retrieves a block by its sequence number.
    fn get_block_by_sequence(&self, sequence: u32) -> Result<Option<Block<P>>>;

    /// Retrieves the block with the highest sequence number.
    fn get_latest_block(&self) -> Result<Option<Block<P>>>;

    /// Returns every block, ordered by ascending sequence.
    fn get_all_blocks(&self) -> Result<Vec<Block<P>>>;

    /// Registers a callback to run on disposal. Callbacks are best-effort:
    /// a panicking callback is swallowed and the remaining ones still run.
    fn on_dispose(&self, callback: DisposeCallback) -> Result<()>;

    /// Disposes the handle, running registered callbacks. Idempotent.
    fn dispose(&self);

    /// Whether this handle has been disposed.
    fn is_disposed(&self) -> bool;
}
