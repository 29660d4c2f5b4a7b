// Path: crates/api/src/token.rs
//! Cancellation-token plumbing.
//!
//! The library only consumes the token contract: an observable boolean plus
//! a notification. `tokio_util`'s token satisfies both; the helper below is
//! the single checkpoint every cancellable operation calls before and after
//! its suspension points.

use hychain_types::error::ChainError;
use hychain_types::Result;

pub use tokio_util::sync::CancellationToken;

/// Fails with `ERR_TOKEN_CANCELLED` when the token has been triggered.
pub fn ensure_active(token: &CancellationToken) -> Result<()> {
    if token.is_cancelled() {
        return Err(ChainError::TokenCancelled);
    }
    Ok(())
}
