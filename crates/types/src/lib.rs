// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # HyChain Types
//!
//! This crate is the foundational library for HyChain, containing all core
//! data structures, the canonical wire codec and the error taxonomy.
//!
//! ## Architectural Role
//!
//! As the base crate, `hychain-types` has minimal dependencies and is itself
//! a dependency for every other crate in the workspace. This structure
//! prevents circular dependencies and provides a stable, canonical definition
//! for shared types like `Block`, `Transaction`, `HashEntity` and the
//! `ChainError` taxonomy.

/// The fixed chunk size, in bytes, used when splitting a serialized payload
/// into Merkle leaves.
pub const PAYLOAD_CHUNK_BYTES: usize = 1024;

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::ChainError> = std::result::Result<T, E>;

/// Core application-level data structures like `Block` and `Transaction`.
pub mod app;
/// The canonical, deterministic tag-length-value codec and its value model.
pub mod codec;
/// A unified set of all error types used across the workspace.
pub mod error;
/// The immutable digest/signature container shared by blocks and proofs.
pub mod hash;
/// Time-prefixed, collision-resistant identifier generators.
pub mod id;
