//! Epoch- and kind-aware proof-of-work thresholds.
//!
//! Three thresholds exist per network:
//! - `epoch_1`: every block of an epoch 0 or epoch 1 account
//! - `epoch_2`: sends and changes of epoch 2 accounts (the highest)
//! - `epoch_2_receive`: receives and epoch upgrades of epoch 2 accounts
//!
//! Multipliers measured against different thresholds are not comparable
//! until normalized onto `epoch_2`.

use std::sync::Arc;

use lattice_types::{Block, BlockDetails, Epoch, NetworkId, Root};

use crate::difficulty::{to_multiplier, Difficulty, DifficultyV1, StubDifficulty};
use crate::WorkError;

#[derive(Clone, Debug)]
pub struct WorkThresholds {
    pub epoch_1: u64,
    pub epoch_2: u64,
    pub epoch_2_receive: u64,
    /// Highest of the three.
    pub base: u64,
    /// Lowest of the three; anything below it is rejected outright.
    pub entry: u64,
    pub difficulty: Arc<dyn Difficulty>,
}

impl WorkThresholds {
    pub fn new(epoch_1: u64, epoch_2: u64, epoch_2_receive: u64) -> Self {
        Self::with_difficulty(Arc::new(DifficultyV1), epoch_1, epoch_2, epoch_2_receive)
    }

    pub fn with_difficulty(
        difficulty: Arc<dyn Difficulty>,
        epoch_1: u64,
        epoch_2: u64,
        epoch_2_receive: u64,
    ) -> Self {
        Self {
            epoch_1,
            epoch_2,
            epoch_2_receive,
            base: epoch_1.max(epoch_2).max(epoch_2_receive),
            entry: epoch_1.min(epoch_2).min(epoch_2_receive),
            difficulty,
        }
    }

    pub fn publish_full() -> Self {
        Self::new(0xffffffc000000000, 0xfffffff800000000, 0xfffffe0000000000)
    }

    pub fn publish_beta() -> Self {
        Self::new(0xfffff00000000000, 0xfffff00000000000, 0xffffe00000000000)
    }

    pub fn publish_dev() -> Self {
        Self::new(0xfe00000000000000, 0xffc0000000000000, 0xf000000000000000)
    }

    /// Dev thresholds where a block's work value is its difficulty.
    pub fn new_stub() -> Self {
        Self::with_difficulty(
            Arc::new(StubDifficulty),
            0xfe00000000000000,
            0xffc0000000000000,
            0xf000000000000000,
        )
    }

    pub fn for_network(network: NetworkId) -> Self {
        match network {
            NetworkId::Live => Self::publish_full(),
            NetworkId::Test => Self::publish_beta(),
            NetworkId::Dev => Self::publish_dev(),
        }
    }

    /// Threshold a block with these details has to clear.
    pub fn threshold(&self, details: &BlockDetails) -> u64 {
        match details.epoch {
            Epoch::Epoch2 if details.is_receive || details.is_epoch => self.epoch_2_receive,
            Epoch::Epoch2 => self.epoch_2,
            Epoch::Epoch0 | Epoch::Epoch1 => self.epoch_1,
        }
    }

    pub fn difficulty(&self, root: &Root, work: u64) -> u64 {
        self.difficulty.get_difficulty(root, work)
    }

    pub fn difficulty_block(&self, block: &Block) -> u64 {
        self.difficulty(&block.root(), block.work())
    }

    pub fn is_valid_pow(&self, block: &Block, details: &BlockDetails) -> bool {
        self.difficulty_block(block) >= self.threshold(details)
    }

    pub fn validate(&self, block: &Block, details: &BlockDetails) -> Result<(), WorkError> {
        let actual = self.difficulty_block(block);
        let minimum = self.threshold(details);
        if actual >= minimum {
            Ok(())
        } else {
            Err(WorkError::InsufficientDifficulty { actual, minimum })
        }
    }

    /// Rescale a multiplier measured against `threshold` onto `epoch_2`.
    ///
    /// With ratio `r = to_multiplier(epoch_2, threshold)` the mapping is
    /// `(m + r - 1) / r`, so `1.0` stays `1.0` and reaching `epoch_2` itself
    /// maps to `2.0 - 1/r`. Multipliers against `epoch_2` are returned as is.
    pub fn normalized_multiplier(&self, multiplier: f64, threshold: u64) -> f64 {
        if threshold == self.epoch_1 || threshold == self.epoch_2_receive {
            let ratio = to_multiplier(self.epoch_2, threshold);
            (multiplier + (ratio - 1.0)) / ratio
        } else {
            multiplier
        }
    }

    /// Exact inverse of [`Self::normalized_multiplier`].
    pub fn denormalized_multiplier(&self, multiplier: f64, threshold: u64) -> f64 {
        if threshold == self.epoch_1 || threshold == self.epoch_2_receive {
            let ratio = to_multiplier(self.epoch_2, threshold);
            multiplier * ratio + 1.0 - ratio
        } else {
            multiplier
        }
    }

    /// Normalized multiplier of a block's own work.
    pub fn block_multiplier(&self, block: &Block, details: &BlockDetails) -> f64 {
        let threshold = self.threshold(details);
        self.normalized_multiplier(
            to_multiplier(self.difficulty_block(block), threshold),
            threshold,
        )
    }

    /// The threshold a block of this kind would need in the next epoch.
    pub fn next_epoch_boundary(&self, threshold: u64) -> Option<u64> {
        if threshold == self.epoch_2_receive {
            Some(self.epoch_1)
        } else if threshold == self.epoch_1 {
            Some(self.epoch_2)
        } else {
            None
        }
    }
}

impl Default for WorkThresholds {
    fn default() -> Self {
        Self::publish_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::from_multiplier;
    use lattice_types::{Account, BlockHash, BlockKind, Link};

    fn details(epoch: Epoch, is_send: bool, is_receive: bool, is_epoch: bool) -> BlockDetails {
        BlockDetails::new(epoch, is_send, is_receive, is_epoch)
    }

    #[test]
    fn thresholds_by_epoch_and_kind() {
        let t = WorkThresholds::publish_full();
        assert_eq!(t.threshold(&details(Epoch::Epoch0, true, false, false)), t.epoch_1);
        assert_eq!(t.threshold(&details(Epoch::Epoch1, false, true, false)), t.epoch_1);
        assert_eq!(t.threshold(&details(Epoch::Epoch2, true, false, false)), t.epoch_2);
        assert_eq!(
            t.threshold(&details(Epoch::Epoch2, false, true, false)),
            t.epoch_2_receive
        );
        assert_eq!(
            t.threshold(&details(Epoch::Epoch2, false, false, true)),
            t.epoch_2_receive
        );
    }

    #[test]
    fn base_and_entry() {
        let t = WorkThresholds::publish_full();
        assert_eq!(t.base, t.epoch_2);
        assert_eq!(t.entry, t.epoch_2_receive);
    }

    #[test]
    fn normalization_table_epoch_1() {
        let t = WorkThresholds::publish_full();
        for (raw, normalized) in [(1.0, 1.0), (9.0, 2.0), (25.0, 4.0)] {
            assert!((t.normalized_multiplier(raw, t.epoch_1) - normalized).abs() < 1e-10);
        }
    }

    #[test]
    fn normalization_table_epoch_2_receive() {
        let t = WorkThresholds::publish_full();
        for (raw, normalized) in [(1.0, 1.0), (65.0, 2.0), (241.0, 4.0)] {
            assert!((t.normalized_multiplier(raw, t.epoch_2_receive) - normalized).abs() < 1e-10);
        }
    }

    #[test]
    fn epoch_2_multipliers_are_untouched() {
        let t = WorkThresholds::publish_full();
        assert_eq!(t.normalized_multiplier(3.5, t.epoch_2), 3.5);
        assert_eq!(t.denormalized_multiplier(3.5, t.epoch_2), 3.5);
    }

    #[test]
    fn normalization_never_crosses_next_epoch() {
        let t = WorkThresholds::publish_dev();
        for threshold in [t.epoch_1, t.epoch_2_receive] {
            let boundary = t.next_epoch_boundary(threshold).unwrap();
            let limit = to_multiplier(boundary, threshold);
            for fraction in [0.0, 0.1, 0.5, 0.9, 0.999] {
                let multiplier = 1.0 + (limit - 1.0) * fraction;
                assert!(from_multiplier(multiplier, threshold) < boundary);
                let normalized = t.normalized_multiplier(multiplier, threshold);
                assert!(from_multiplier(normalized, threshold) < boundary);
            }
        }
    }

    #[test]
    fn stub_block_multiplier_follows_work() {
        let t = WorkThresholds::new_stub();
        let account = Account::new([1; 32]);
        let block = Block::new(
            BlockKind::Send,
            account,
            BlockHash::new([2; 32]),
            account,
            0,
            Link::ZERO,
            t.epoch_1,
        );
        let d = details(Epoch::Epoch0, true, false, false);
        assert!((t.block_multiplier(&block, &d) - 1.0).abs() < 1e-10);
        let harder = block.with_work(from_multiplier(9.0, t.epoch_1));
        // dev ratio between epoch_1 and epoch_2 is 8
        assert!((t.block_multiplier(&harder, &d) - 2.0).abs() < 1e-10);
    }

    #[test]
    fn validate_rejects_low_work() {
        let t = WorkThresholds::new_stub();
        let account = Account::new([1; 32]);
        let block = Block::new(
            BlockKind::Change,
            account,
            BlockHash::new([2; 32]),
            account,
            0,
            Link::ZERO,
            t.epoch_1 - 1,
        );
        let d = details(Epoch::Epoch1, false, false, false);
        assert!(matches!(
            t.validate(&block, &d),
            Err(WorkError::InsufficientDifficulty { .. })
        ));
        assert!(t.validate(&block.with_work(t.epoch_1), &d).is_ok());
    }
}
