//! Representative votes.

use crate::{Account, BlockHash};
use serde::{Deserialize, Serialize};

/// A representative's vote for one or more block hashes.
///
/// `sequence` grows with every vote a representative casts; `u64::MAX`
/// marks a final vote that can never be superseded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voting_account: Account,
    pub sequence: u64,
    pub hashes: Vec<BlockHash>,
}

impl Vote {
    pub const FINAL_SEQUENCE: u64 = u64::MAX;

    pub fn new(voting_account: Account, sequence: u64, hashes: Vec<BlockHash>) -> Self {
        Self {
            voting_account,
            sequence,
            hashes,
        }
    }

    pub fn new_final(voting_account: Account, hashes: Vec<BlockHash>) -> Self {
        Self::new(voting_account, Self::FINAL_SEQUENCE, hashes)
    }

    pub fn is_final(&self) -> bool {
        self.sequence == Self::FINAL_SEQUENCE
    }
}
