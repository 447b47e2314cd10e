//! Fundamental types for the lattice node.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! accounts, hashes, roots, blocks and their sidebands, votes, timestamps and network ids.

pub mod block;
pub mod error;
pub mod hash;
pub mod network;
pub mod root;
pub mod time;
pub mod vote;

pub use block::{Block, BlockDetails, BlockKind, BlockSideband, Epoch};
pub use error::TypesError;
pub use hash::{Account, BlockHash, Link, Root};
pub use network::NetworkId;
pub use root::QualifiedRoot;
pub use time::Timestamp;
pub use vote::Vote;
