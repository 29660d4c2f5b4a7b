// Path: crates/crypto/src/entropy.rs
//! The default, OS-backed entropy source.

use async_trait::async_trait;
use rand::rngs::OsRng;
use rand::RngCore;

use hychain_api::entropy::EntropySource;
use hychain_api::token::{ensure_active, CancellationToken};
use hychain_types::Result;

/// An [`EntropySource`] backed by the operating system RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

#[async_trait]
impl EntropySource for OsEntropy {
    async fn random_bytes(&self, n: usize, token: &CancellationToken) -> Result<Vec<u8>> {
        ensure_active(token)?;
        let mut out = vec![0u8; n];
        OsRng.fill_bytes(&mut out);
        ensure_active(token)?;
        Ok(out)
    }
}
