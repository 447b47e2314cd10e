//! Anti-spam proof-of-work.
//!
//! A block's work value is a 64-bit hash of `work || root`. The ledger
//! requires it to clear an epoch- and kind-dependent threshold; the consensus
//! engine turns the margin above the threshold into a *multiplier* and uses it
//! to prioritise elections.

pub mod difficulty;
pub mod error;
pub mod generator;
pub mod thresholds;

pub use difficulty::{from_multiplier, to_multiplier, Difficulty, DifficultyV1, StubDifficulty};
pub use error::WorkError;
pub use generator::WorkGenerator;
pub use thresholds::WorkThresholds;
