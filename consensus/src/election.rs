//! Election state machine for one contested chain position.
//!
//! An election is created for a [`QualifiedRoot`] when a block at that
//! position needs confirming. Competing blocks for the same position join it
//! as candidates. Representatives vote on candidate hashes, and the election
//! confirms once the weighted tally of the leading candidate reaches the
//! quorum delta.
//!
//! All mutable state sits behind one mutex per election. Callers that also
//! hold the election manager's lock must take it first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use lattice_ledger::WeightOracle;
use lattice_types::{Account, Block, BlockHash, QualifiedRoot, Timestamp};

use crate::collaborators::PublishFilter;
use crate::vote_info::{VoteCode, VoteRecord, VoteSource};

/// Cooldown for voters holding more than 5% of online weight.
const COOLDOWN_LARGE_SECS: u64 = 1;
/// Cooldown for voters holding more than 1% of online weight.
const COOLDOWN_MEDIUM_SECS: u64 = 5;
const COOLDOWN_SMALL_SECS: u64 = 15;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElectionState {
    Running,
    /// Terminal. The manager retires the election after cementing or a grace window.
    Confirmed,
}

/// How a block came to be confirmed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElectionStatusType {
    Ongoing,
    /// The block's own election reached quorum.
    ActiveQuorum,
    /// Cemented as a dependency of another election's winner while its own
    /// election was still active.
    ActiveConfHeight,
    /// Cemented with no election in memory.
    InactiveConfHeight,
}

impl ElectionStatusType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ongoing => "ongoing",
            Self::ActiveQuorum => "active_quorum",
            Self::ActiveConfHeight => "active_conf_height",
            Self::InactiveConfHeight => "inactive_conf_height",
        }
    }
}

/// Snapshot of an election's result.
#[derive(Clone, Debug)]
pub struct ElectionStatus {
    pub winner: Arc<Block>,
    pub tally: u128,
    pub election_end: Timestamp,
    pub election_duration_secs: u64,
    pub voter_count: u32,
    pub confirmation_request_count: u32,
    pub status_type: ElectionStatusType,
}

impl ElectionStatus {
    fn ongoing(winner: Arc<Block>, now: Timestamp) -> Self {
        Self {
            winner,
            tally: 0,
            election_end: now,
            election_duration_secs: 0,
            voter_count: 0,
            confirmation_request_count: 0,
            status_type: ElectionStatusType::Ongoing,
        }
    }
}

/// What a vote is measured against.
pub struct VoteContext<'a> {
    pub weights: &'a dyn WeightOracle,
    pub online_weight: u128,
    pub quorum_delta: u128,
    pub now: Timestamp,
}

#[derive(Clone, Debug)]
pub struct VoteOutcome {
    pub code: VoteCode,
    /// Set when this vote confirmed the election.
    pub confirmed: Option<ElectionStatus>,
}

impl VoteOutcome {
    fn code(code: VoteCode) -> Self {
        Self {
            code,
            confirmed: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CandidateInsert {
    pub inserted: bool,
    /// A known candidate arrived again with more work.
    pub difficulty_update: bool,
    /// A new competing block joined the election.
    pub block_conflict: bool,
}

#[derive(Clone)]
struct Candidate {
    block: Arc<Block>,
    difficulty: u64,
    multiplier: f64,
}

struct ElectionData {
    state: ElectionState,
    /// Insertion order is first-seen order, which breaks tally ties.
    candidates: Vec<Candidate>,
    last_votes: HashMap<Account, VoteRecord>,
    status: ElectionStatus,
    multiplier: f64,
    confirmation_request_count: u32,
    wallet_backed: bool,
    confirmed_at: Option<Timestamp>,
    cleaned_up: bool,
}

impl ElectionData {
    fn candidate(&self, hash: &BlockHash) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.block.hash() == *hash)
    }

    fn tally(&self, weights: &dyn WeightOracle) -> Vec<(u128, Arc<Block>)> {
        let mut sums: Vec<(u128, Arc<Block>)> = self
            .candidates
            .iter()
            .map(|c| (0u128, Arc::clone(&c.block)))
            .collect();
        for (voter, record) in &self.last_votes {
            if let Some(entry) = sums.iter_mut().find(|(_, b)| b.hash() == record.hash) {
                entry.0 = entry.0.saturating_add(weights.weight(voter));
            }
        }
        // stable sort keeps first-seen order among equal tallies
        sums.sort_by(|a, b| b.0.cmp(&a.0));
        sums
    }

    fn voter_count(&self) -> u32 {
        self.last_votes
            .keys()
            .filter(|a| **a != Account::NOT_AN_ACCOUNT)
            .count() as u32
    }

    fn refresh_winner(&mut self, weights: &dyn WeightOracle) -> u128 {
        let tally = self.tally(weights);
        let Some((weight, leader)) = tally.into_iter().next() else {
            return 0;
        };
        if let Some(candidate) = self.candidate(&leader.hash()) {
            self.multiplier = candidate.multiplier;
        }
        self.status.winner = leader;
        self.status.tally = weight;
        weight
    }

    fn confirm(
        &mut self,
        created_at: Timestamp,
        status_type: ElectionStatusType,
        now: Timestamp,
    ) -> Option<ElectionStatus> {
        if self.state == ElectionState::Confirmed {
            return None;
        }
        self.state = ElectionState::Confirmed;
        self.confirmed_at = Some(now);
        self.status.election_end = now;
        self.status.election_duration_secs = created_at.elapsed_since(now);
        self.status.voter_count = self.voter_count();
        self.status.confirmation_request_count = self.confirmation_request_count;
        self.status.status_type = status_type;
        Some(self.status.clone())
    }
}

/// Minimum re-vote interval for a voter, by its share of online weight.
pub fn cooldown_secs(weight: u128, online_weight: u128) -> u64 {
    if weight > online_weight / 20 {
        COOLDOWN_LARGE_SECS
    } else if weight > online_weight / 100 {
        COOLDOWN_MEDIUM_SECS
    } else {
        COOLDOWN_SMALL_SECS
    }
}

/// `online_weight * percent / 100` without overflowing on large supplies.
pub fn quorum_delta(online_weight: u128, percent: u8) -> u128 {
    let percent = u128::from(percent.min(100));
    (online_weight / 100) * percent + (online_weight % 100) * percent / 100
}

pub struct Election {
    qualified_root: QualifiedRoot,
    created_at: Timestamp,
    data: Mutex<ElectionData>,
}

impl Election {
    /// Start an election with `block` as the only candidate.
    ///
    /// The initial winner is backed by a zero-weight vote from
    /// [`Account::NOT_AN_ACCOUNT`] so that it stays the leader until a real
    /// voter disagrees.
    pub fn new(block: Arc<Block>, difficulty: u64, multiplier: f64, now: Timestamp) -> Self {
        let hash = block.hash();
        let data = ElectionData {
            state: ElectionState::Running,
            candidates: vec![Candidate {
                block: Arc::clone(&block),
                difficulty,
                multiplier,
            }],
            last_votes: HashMap::from([(
                Account::NOT_AN_ACCOUNT,
                VoteRecord::new(hash, 0, now),
            )]),
            status: ElectionStatus::ongoing(Arc::clone(&block), now),
            multiplier,
            confirmation_request_count: 0,
            wallet_backed: false,
            confirmed_at: None,
            cleaned_up: false,
        };
        Self {
            qualified_root: block.qualified_root(),
            created_at: now,
            data: Mutex::new(data),
        }
    }

    pub fn qualified_root(&self) -> QualifiedRoot {
        self.qualified_root
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn state(&self) -> ElectionState {
        self.data.lock().unwrap().state
    }

    pub fn is_confirmed(&self) -> bool {
        self.state() == ElectionState::Confirmed
    }

    pub fn confirmed_at(&self) -> Option<Timestamp> {
        self.data.lock().unwrap().confirmed_at
    }

    pub fn winner(&self) -> Arc<Block> {
        Arc::clone(&self.data.lock().unwrap().status.winner)
    }

    pub fn status(&self) -> ElectionStatus {
        self.data.lock().unwrap().status.clone()
    }

    /// Normalized work multiplier of the current winner.
    pub fn multiplier(&self) -> f64 {
        self.data.lock().unwrap().multiplier
    }

    /// Highest difficulty among the candidates.
    pub fn max_difficulty(&self) -> u64 {
        let data = self.data.lock().unwrap();
        data.candidates.iter().map(|c| c.difficulty).max().unwrap_or(0)
    }

    pub fn candidates(&self) -> Vec<Arc<Block>> {
        let data = self.data.lock().unwrap();
        data.candidates.iter().map(|c| Arc::clone(&c.block)).collect()
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.data.lock().unwrap().candidate(hash).is_some()
    }

    pub fn last_vote(&self, voter: &Account) -> Option<VoteRecord> {
        self.data.lock().unwrap().last_votes.get(voter).copied()
    }

    pub fn voter_count(&self) -> u32 {
        self.data.lock().unwrap().voter_count()
    }

    pub fn confirmation_request_count(&self) -> u32 {
        self.data.lock().unwrap().confirmation_request_count
    }

    pub(crate) fn inc_confirmation_request_count(&self) -> u32 {
        let mut data = self.data.lock().unwrap();
        data.confirmation_request_count += 1;
        data.confirmation_request_count
    }

    /// Whether a wallet on this node voted here.
    pub fn is_wallet_backed(&self) -> bool {
        self.data.lock().unwrap().wallet_backed
    }

    /// Weighted tally per candidate, heaviest first.
    pub fn tally(&self, weights: &dyn WeightOracle) -> Vec<(u128, Arc<Block>)> {
        self.data.lock().unwrap().tally(weights)
    }

    /// Add a competing block, or refresh the work of a known one.
    pub fn insert_candidate(
        &self,
        block: Arc<Block>,
        difficulty: u64,
        multiplier: f64,
        max_candidates: usize,
        weights: &dyn WeightOracle,
    ) -> CandidateInsert {
        let mut data = self.data.lock().unwrap();
        if data.state == ElectionState::Confirmed || block.qualified_root() != self.qualified_root {
            return CandidateInsert::default();
        }
        let hash = block.hash();
        let winner = data.status.winner.hash();
        if let Some(existing) = data.candidates.iter_mut().find(|c| c.block.hash() == hash) {
            if difficulty <= existing.difficulty {
                return CandidateInsert::default();
            }
            existing.block = Arc::clone(&block);
            existing.difficulty = difficulty;
            existing.multiplier = multiplier;
            if winner == hash {
                data.status.winner = block;
                data.multiplier = multiplier;
            }
            return CandidateInsert {
                inserted: false,
                difficulty_update: true,
                block_conflict: false,
            };
        }
        if data.candidates.len() >= max_candidates {
            return CandidateInsert::default();
        }
        data.candidates.push(Candidate {
            block,
            difficulty,
            multiplier,
        });
        data.refresh_winner(weights);
        CandidateInsert {
            inserted: true,
            difficulty_update: false,
            block_conflict: true,
        }
    }

    /// Apply one voter's vote for `hash`.
    ///
    /// A vote whose sequence does not exceed the voter's last one is a replay
    /// unless the voter's cooldown has passed since that vote. Final votes
    /// are never replaced.
    pub fn vote(
        &self,
        voter: &Account,
        sequence: u64,
        hash: &BlockHash,
        source: VoteSource,
        ctx: &VoteContext<'_>,
    ) -> VoteOutcome {
        let mut data = self.data.lock().unwrap();
        if data.state == ElectionState::Confirmed {
            return if data.status.winner.hash() == *hash {
                VoteOutcome::code(VoteCode::Replay)
            } else {
                VoteOutcome::code(VoteCode::Ignored)
            };
        }
        if data.candidate(hash).is_none() {
            return VoteOutcome::code(VoteCode::Indeterminate);
        }

        if let Some(last) = data.last_votes.get(voter) {
            if last.is_final() {
                return VoteOutcome::code(VoteCode::Replay);
            }
            if sequence <= last.sequence {
                let cooldown = cooldown_secs(ctx.weights.weight(voter), ctx.online_weight);
                if !last.time.has_expired(cooldown, ctx.now) {
                    return VoteOutcome::code(VoteCode::Replay);
                }
            }
        }

        data.last_votes
            .insert(*voter, VoteRecord::new(*hash, sequence, ctx.now));
        if source == VoteSource::Local {
            data.wallet_backed = true;
        }

        let leader_weight = data.refresh_winner(ctx.weights);
        let confirmed = if leader_weight > 0 && leader_weight >= ctx.quorum_delta {
            data.confirm(self.created_at, ElectionStatusType::ActiveQuorum, ctx.now)
        } else {
            None
        };
        VoteOutcome {
            code: VoteCode::Vote,
            confirmed,
        }
    }

    /// Confirm with the current leader. Returns `None` if already confirmed.
    pub fn confirm_once(
        &self,
        status_type: ElectionStatusType,
        now: Timestamp,
    ) -> Option<ElectionStatus> {
        self.data
            .lock()
            .unwrap()
            .confirm(self.created_at, status_type, now)
    }

    /// Release the candidates from the duplicate filter. Idempotent.
    pub fn cleanup(&self, filter: &dyn PublishFilter) {
        let mut data = self.data.lock().unwrap();
        if data.cleaned_up {
            return;
        }
        data.cleaned_up = true;
        let hashes: Vec<BlockHash> = data.candidates.iter().map(|c| c.block.hash()).collect();
        drop(data);
        filter.clear(&hashes);
    }
}

impl std::fmt::Debug for Election {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Election")
            .field("qualified_root", &self.qualified_root)
            .field("state", &self.state())
            .finish()
    }
}
