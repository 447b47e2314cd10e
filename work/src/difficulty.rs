//! Difficulty values and multipliers.
//!
//! Difficulty is a `u64` where higher means more work. A multiplier expresses
//! a difficulty relative to a base threshold: `1.0` is exactly the base,
//! `2.0` took twice the expected effort. Both directions work on the
//! "inverse gap" `2^64 - difficulty`.

use lattice_crypto::blake2b_64_multi;
use lattice_types::Root;

/// Multiplier of `difficulty` relative to `base`.
pub fn to_multiplier(difficulty: u64, base: u64) -> f64 {
    base.wrapping_neg() as f64 / difficulty.wrapping_neg() as f64
}

/// Inverse of [`to_multiplier`].
///
/// Saturates to `u64::MAX` when the multiplier is so large that the inverse
/// gap rounds to zero, and to `0` when it underflows the `u64` range.
pub fn from_multiplier(multiplier: f64, base: u64) -> u64 {
    let reverse = (base.wrapping_neg() as f64 / multiplier) as u128;
    if reverse > u64::MAX as u128 {
        0
    } else if reverse != 0 || base == 0 || multiplier < 1.0 {
        (reverse as u64).wrapping_neg()
    } else {
        u64::MAX
    }
}

/// Computes the difficulty a work value achieves for a root.
pub trait Difficulty: Send + Sync + std::fmt::Debug {
    fn get_difficulty(&self, root: &Root, work: u64) -> u64;
}

/// Blake2b-64 over `work_le || root`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DifficultyV1;

impl Difficulty for DifficultyV1 {
    fn get_difficulty(&self, root: &Root, work: u64) -> u64 {
        blake2b_64_multi(&[&work.to_le_bytes(), root.as_bytes()])
    }
}

/// Treats the work value itself as the difficulty.
///
/// Lets tests pick an exact multiplier for a block without searching for work.
#[derive(Clone, Copy, Debug, Default)]
pub struct StubDifficulty;

impl Difficulty for StubDifficulty {
    fn get_difficulty(&self, _root: &Root, work: u64) -> u64 {
        work
    }
}
