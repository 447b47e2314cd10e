//! Inactive vote cache: votes that arrive before their election exists.
//!
//! Votes can reach a node before the block they vote for has an election.
//! The cache keeps them, keyed by block hash, so they can be replayed into
//! the election the moment it starts. Each entry is consumed exactly once.
//!
//! The cache is bounded twice: at most `max_size` hashes (oldest hash
//! evicted first) and at most `max_voters` voters per hash (a full entry
//! only accepts a voter heavier than its lightest one).

use std::collections::{HashMap, VecDeque};

use lattice_types::{Account, BlockHash};

/// One cached vote with the voter's weight when it arrived.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CachedVote {
    pub voter: Account,
    pub weight: u128,
    pub sequence: u64,
}

pub struct VoteCache {
    entries: HashMap<BlockHash, Vec<CachedVote>>,
    /// Hashes in first-insertion order.
    order: VecDeque<BlockHash>,
    max_size: usize,
    max_voters: usize,
}

impl VoteCache {
    pub fn new(max_size: usize, max_voters: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_size: max_size.max(1),
            max_voters: max_voters.max(1),
        }
    }

    /// Cache a vote for `hash`.
    ///
    /// A voter already cached for the hash is replaced only by a higher
    /// sequence. Returns whether the cache changed.
    pub fn insert(&mut self, hash: BlockHash, voter: Account, weight: u128, sequence: u64) -> bool {
        if !self.entries.contains_key(&hash) {
            while self.entries.len() >= self.max_size {
                let Some(oldest) = self.order.pop_front() else {
                    break;
                };
                self.entries.remove(&oldest);
            }
            self.order.push_back(hash);
            self.entries.insert(hash, Vec::new());
        }
        let Some(votes) = self.entries.get_mut(&hash) else {
            return false;
        };

        if let Some(existing) = votes.iter_mut().find(|v| v.voter == voter) {
            if sequence <= existing.sequence {
                return false;
            }
            existing.weight = weight;
            existing.sequence = sequence;
            return true;
        }

        if votes.len() >= self.max_voters {
            let lightest = votes
                .iter()
                .enumerate()
                .min_by_key(|(_, v)| v.weight)
                .map(|(i, v)| (i, v.weight));
            match lightest {
                Some((index, lightest_weight)) if weight > lightest_weight => {
                    votes.remove(index);
                }
                _ => return false,
            }
        }

        votes.push(CachedVote {
            voter,
            weight,
            sequence,
        });
        true
    }

    /// Remove and return the votes for `hash`, in arrival order.
    pub fn take(&mut self, hash: &BlockHash) -> Vec<CachedVote> {
        match self.entries.remove(hash) {
            Some(votes) => {
                self.order.retain(|h| h != hash);
                votes
            }
            None => Vec::new(),
        }
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.entries.contains_key(hash)
    }

    /// Number of hashes with cached votes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_votes(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn make_hash(byte: u8) -> BlockHash {
        BlockHash::new([byte; 32])
    }

    fn voter(byte: u8) -> Account {
        Account::new([byte; 32])
    }

    #[test]
    fn insert_and_take() {
        let mut cache = VoteCache::new(16, 4);
        assert!(cache.insert(make_hash(1), voter(1), 100, 1));
        assert!(cache.insert(make_hash(1), voter(2), 200, 1));
        assert_eq!(cache.total_votes(), 2);

        let votes = cache.take(&make_hash(1));
        assert_eq!(votes.len(), 2);
        assert_eq!(votes[0].voter, voter(1));
        assert!(cache.is_empty());
        assert!(cache.take(&make_hash(1)).is_empty());
    }

    #[test]
    fn higher_sequence_replaces_voter() {
        let mut cache = VoteCache::new(16, 4);
        cache.insert(make_hash(1), voter(1), 100, 5);
        assert!(!cache.insert(make_hash(1), voter(1), 300, 5));
        assert!(!cache.insert(make_hash(1), voter(1), 300, 4));
        assert!(cache.insert(make_hash(1), voter(1), 300, 6));
        assert_eq!(cache.total_votes(), 1);
        let votes = cache.take(&make_hash(1));
        assert_eq!((votes[0].weight, votes[0].sequence), (300, 6));
    }

    #[test]
    fn oldest_hash_evicted_first() {
        let mut cache = VoteCache::new(2, 4);
        cache.insert(make_hash(1), voter(1), 1, 1);
        cache.insert(make_hash(2), voter(1), 1, 1);
        // more votes for an existing hash do not evict
        cache.insert(make_hash(1), voter(2), 1, 1);
        cache.insert(make_hash(3), voter(1), 1, 1);

        assert!(!cache.contains(&make_hash(1)));
        assert!(cache.contains(&make_hash(2)));
        assert!(cache.contains(&make_hash(3)));
    }

    #[test]
    fn full_entry_keeps_heaviest_voters() {
        let mut cache = VoteCache::new(16, 2);
        cache.insert(make_hash(1), voter(1), 100, 1);
        cache.insert(make_hash(1), voter(2), 50, 1);
        assert!(!cache.insert(make_hash(1), voter(3), 10, 1));
        assert!(cache.insert(make_hash(1), voter(4), 500, 1));

        let voters: Vec<_> = cache.take(&make_hash(1)).iter().map(|v| v.voter).collect();
        assert_eq!(voters, vec![voter(1), voter(4)]);
    }

    proptest! {
        #[test]
        fn never_exceeds_bounds(inserts in proptest::collection::vec((0u8..40, 0u8..10, 1u128..1000), 0..200)) {
            let mut cache = VoteCache::new(8, 3);
            for (hash, who, weight) in inserts {
                cache.insert(make_hash(hash), voter(who), weight, 1);
                prop_assert!(cache.len() <= 8);
            }
            prop_assert!(cache.total_votes() <= 8 * 3);
        }
    }
}
