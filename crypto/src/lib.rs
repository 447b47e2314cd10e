//! Hashing primitives for the lattice node.
//!
//! - **Blake2b-256** for block hashes
//! - **Blake2b-64** for proof-of-work values (`work || root`)

pub mod hash;

pub use hash::{blake2b_256, blake2b_256_multi, blake2b_64_multi};
