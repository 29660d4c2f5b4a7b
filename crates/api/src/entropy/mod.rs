// Path: crates/api/src/entropy/mod.rs
//! The ambient entropy-provider contract.

use async_trait::async_trait;

use hychain_types::Result;

use crate::token::CancellationToken;

/// A provider of uniformly random bytes.
///
/// The library consumes only this contract: produce `n` random bytes,
/// observing the token before and after the acquisition. Key generation and
/// id salting go through it so deployments can route entropy to a DRBG or
/// an HSM.
#[async_trait]
pub trait EntropySource: Send + Sync {
    /// Produces `n` uniformly random bytes.
    async fn random_bytes(&self, n: usize, token: &CancellationToken) -> Result<Vec<u8>>;
}
