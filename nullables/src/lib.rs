//! Nullable infrastructure.
//!
//! Infrastructure the node talks to (clock, storage) is abstracted behind
//! traits. This crate provides implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! The in-memory store also backs the development daemon.

pub mod clock;
pub mod store;

pub use clock::NullClock;
pub use store::NullStore;
