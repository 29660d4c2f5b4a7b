// Path: crates/api/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # HyChain API
//!
//! Cross-crate traits and contracts: the block-store interface, the
//! polymorphic byte-source abstraction consumed by the signer, the entropy
//! provider contract and the cancellation checkpoint helper. Implementation
//! crates depend on this one instead of on each other.

/// The entropy-provider contract.
pub mod entropy;
/// Polymorphic readable byte sources and the drain helper.
pub mod source;
/// The block-store interface.
pub mod store;
/// Cancellation-token plumbing.
pub mod token;
