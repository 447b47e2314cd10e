//! Event counters.
//!
//! Components receive an `Arc<dyn StatsSink>` at construction and bump
//! counters through it; nothing records into global state.

use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Every event the node counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    ElectionStart,
    ElectionConfirmed,
    ElectionDrop,
    ElectionRestart,
    ElectionDifficultyUpdate,
    ElectionBlockConflict,
    ElectionPriority,
    ElectionNonPriority,
    ElectionForceRollback,
    ActiveQuorum,
    ActiveConfHeight,
    InactiveConfHeight,
    VoteNew,
    VoteReplay,
    VoteIndeterminate,
    VoteInvalid,
    VoteIgnored,
    VoteCached,
    VoteCacheInsert,
    ConfirmationRequest,
    DependencyPending,
    DependencyActivated,
    DependencyDropped,
    BlocksCemented,
    CementBatch,
    AlreadyCemented,
}

impl Stat {
    pub const ALL: [Stat; 26] = [
        Stat::ElectionStart,
        Stat::ElectionConfirmed,
        Stat::ElectionDrop,
        Stat::ElectionRestart,
        Stat::ElectionDifficultyUpdate,
        Stat::ElectionBlockConflict,
        Stat::ElectionPriority,
        Stat::ElectionNonPriority,
        Stat::ElectionForceRollback,
        Stat::ActiveQuorum,
        Stat::ActiveConfHeight,
        Stat::InactiveConfHeight,
        Stat::VoteNew,
        Stat::VoteReplay,
        Stat::VoteIndeterminate,
        Stat::VoteInvalid,
        Stat::VoteIgnored,
        Stat::VoteCached,
        Stat::VoteCacheInsert,
        Stat::ConfirmationRequest,
        Stat::DependencyPending,
        Stat::DependencyActivated,
        Stat::DependencyDropped,
        Stat::BlocksCemented,
        Stat::CementBatch,
        Stat::AlreadyCemented,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stat::ElectionStart => "election_start",
            Stat::ElectionConfirmed => "election_confirmed",
            Stat::ElectionDrop => "election_drop",
            Stat::ElectionRestart => "election_restart",
            Stat::ElectionDifficultyUpdate => "election_difficulty_update",
            Stat::ElectionBlockConflict => "election_block_conflict",
            Stat::ElectionPriority => "election_priority",
            Stat::ElectionNonPriority => "election_non_priority",
            Stat::ElectionForceRollback => "election_force_rollback",
            Stat::ActiveQuorum => "active_quorum",
            Stat::ActiveConfHeight => "active_conf_height",
            Stat::InactiveConfHeight => "inactive_conf_height",
            Stat::VoteNew => "vote_new",
            Stat::VoteReplay => "vote_replay",
            Stat::VoteIndeterminate => "vote_indeterminate",
            Stat::VoteInvalid => "vote_invalid",
            Stat::VoteIgnored => "vote_ignored",
            Stat::VoteCached => "vote_cached",
            Stat::VoteCacheInsert => "vote_cache_insert",
            Stat::ConfirmationRequest => "confirmation_request",
            Stat::DependencyPending => "dependency_pending",
            Stat::DependencyActivated => "dependency_activated",
            Stat::DependencyDropped => "dependency_dropped",
            Stat::BlocksCemented => "blocks_cemented",
            Stat::CementBatch => "cement_batch",
            Stat::AlreadyCemented => "already_cemented",
        }
    }
}

/// Where components report events.
pub trait StatsSink: Send + Sync {
    fn add(&self, stat: Stat, value: u64);

    fn inc(&self, stat: Stat) {
        self.add(stat, 1);
    }
}

/// Thread-safe in-process counters.
pub struct Stats {
    counters: HashMap<Stat, AtomicU64>,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            counters: Stat::ALL
                .iter()
                .map(|&stat| (stat, AtomicU64::new(0)))
                .collect(),
        }
    }

    pub fn get(&self, stat: Stat) -> u64 {
        self.counters
            .get(&stat)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Counter values by event name, sorted.
    pub fn snapshot(&self) -> BTreeMap<&'static str, u64> {
        self.counters
            .iter()
            .map(|(stat, v)| (stat.name(), v.load(Ordering::Relaxed)))
            .collect()
    }

    pub fn clear(&self) {
        for counter in self.counters.values() {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsSink for Stats {
    fn add(&self, stat: Stat, value: u64) {
        if let Some(counter) = self.counters.get(&stat) {
            counter.fetch_add(value, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let stats = Stats::new();
        assert!(Stat::ALL.iter().all(|s| stats.get(*s) == 0));
    }

    #[test]
    fn inc_and_add() {
        let stats = Stats::new();
        stats.inc(Stat::ElectionDrop);
        stats.add(Stat::VoteCached, 2);
        assert_eq!(stats.get(Stat::ElectionDrop), 1);
        assert_eq!(stats.get(Stat::VoteCached), 2);
        assert_eq!(stats.get(Stat::ElectionRestart), 0);
    }

    #[test]
    fn snapshot_uses_event_names() {
        let stats = Stats::new();
        stats.inc(Stat::ActiveQuorum);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.len(), Stat::ALL.len());
        assert_eq!(snapshot["active_quorum"], 1);
    }

    #[test]
    fn names_are_unique() {
        let names: std::collections::HashSet<_> = Stat::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(names.len(), Stat::ALL.len());
    }

    #[test]
    fn clear_resets() {
        let stats = Stats::new();
        stats.add(Stat::BlocksCemented, 10);
        stats.clear();
        assert_eq!(stats.get(Stat::BlocksCemented), 0);
    }
}
