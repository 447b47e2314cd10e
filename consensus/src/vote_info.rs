//! Per-voter vote data and the outcome codes of vote processing.

use lattice_types::{BlockHash, Timestamp, Vote};
use std::fmt;

/// Result of routing a vote. Rejections are values, never errors; the
/// network layer decides whether to penalize the sender.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VoteCode {
    /// Accepted by a live election.
    Vote,
    /// Already seen, or matches an already decided winner.
    Replay,
    /// No election knows the hash.
    Indeterminate,
    /// Malformed: no hashes or no real voter.
    Invalid,
    /// Votes for a hash that lost an already confirmed election.
    Ignored,
}

impl VoteCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteCode::Vote => "vote",
            VoteCode::Replay => "replay",
            VoteCode::Indeterminate => "indeterminate",
            VoteCode::Invalid => "invalid",
            VoteCode::Ignored => "ignored",
        }
    }
}

impl fmt::Display for VoteCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a vote came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteSource {
    Live,
    /// Replayed from the inactive vote cache when an election starts.
    Cache,
    /// Cast by a wallet on this node. Elections holding one are never evicted.
    Local,
}

/// The most recent accepted vote of one voter in one election.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VoteRecord {
    pub hash: BlockHash,
    pub sequence: u64,
    pub time: Timestamp,
}

impl VoteRecord {
    pub fn new(hash: BlockHash, sequence: u64, time: Timestamp) -> Self {
        Self {
            hash,
            sequence,
            time,
        }
    }

    pub fn is_final(&self) -> bool {
        self.sequence == Vote::FINAL_SEQUENCE
    }
}
