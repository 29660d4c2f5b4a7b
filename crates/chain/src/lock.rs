// Path: crates/chain/src/lock.rs
//! The named-lock registry.
//!
//! A registry maps string keys to async mutexes so callers can serialize
//! work per chain (the single-writer invariant) without inventing their own
//! table. The registry is an explicit object: construct it, share it,
//! tear it down. There is no implicit process-wide instance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

/// A registry of named async locks.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: DashMap<String, Arc<Mutex<()>>>,
    debug: AtomicBool,
}

impl LockRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables lock tracing.
    pub fn set_debug(&self, enabled: bool) {
        self.debug.store(enabled, Ordering::Release);
    }

    /// Acquires the lock registered under `name`, creating it on first use.
    /// The returned guard releases the lock on drop.
    pub async fn acquire(&self, name: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        if self.debug.load(Ordering::Acquire) {
            trace!(name, "acquiring named lock");
        }
        let guard = lock.lock_owned().await;
        if self.debug.load(Ordering::Acquire) {
            trace!(name, "acquired named lock");
        }
        guard
    }

    /// The number of names the registry currently tracks.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Whether the registry tracks no names.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Drops every registered lock. Outstanding guards keep their mutexes
    /// alive; new acquisitions start fresh.
    pub fn clear(&self) {
        self.locks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_name_is_exclusive() {
        let registry = Arc::new(LockRegistry::new());
        let guard = registry.acquire("chain-a").await;

        let contender = {
            let registry = registry.clone();
            tokio::spawn(async move {
                let _guard = registry.acquire("chain-a").await;
            })
        };

        // The second acquisition cannot complete while the guard is held.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_distinct_names_do_not_contend() {
        let registry = LockRegistry::new();
        let _a = registry.acquire("chain-a").await;
        // Acquiring a different name completes immediately.
        let _b = registry.acquire("chain-b").await;
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_resets_registry() {
        let registry = LockRegistry::new();
        registry.set_debug(true);
        let guard = registry.acquire("chain-a").await;
        drop(guard);
        registry.clear();
        assert!(registry.is_empty());
        let _again = registry.acquire("chain-a").await;
        assert_eq!(registry.len(), 1);
    }
}
