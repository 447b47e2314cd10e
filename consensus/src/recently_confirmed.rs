//! Bounded memory of elections that recently left the active set.
//!
//! Both caches are insertion-ordered and evict the oldest entry when full.
//! [`RecentlyConfirmed`] lets late votes and blocks for a decided position be
//! recognized as replays. [`RecentlyDropped`] remembers evicted positions and
//! the best work seen for them, so an identical resubmission does not restart
//! the election.

use std::collections::{HashMap, VecDeque};

use lattice_types::{BlockHash, QualifiedRoot};

pub struct RecentlyConfirmed {
    by_root: HashMap<QualifiedRoot, BlockHash>,
    by_hash: HashMap<BlockHash, QualifiedRoot>,
    order: VecDeque<QualifiedRoot>,
    capacity: usize,
}

impl RecentlyConfirmed {
    pub fn new(capacity: usize) -> Self {
        Self {
            by_root: HashMap::new(),
            by_hash: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    /// Record the winner of `root`. Returns `false` if the root was already known.
    pub fn insert(&mut self, root: QualifiedRoot, winner: BlockHash) -> bool {
        if self.capacity == 0 || self.by_root.contains_key(&root) {
            return false;
        }
        if self.order.len() >= self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                if let Some(hash) = self.by_root.remove(&evicted) {
                    self.by_hash.remove(&hash);
                }
            }
        }
        self.by_root.insert(root, winner);
        self.by_hash.insert(winner, root);
        self.order.push_back(root);
        true
    }

    pub fn contains_root(&self, root: &QualifiedRoot) -> bool {
        self.by_root.contains_key(root)
    }

    pub fn contains_hash(&self, hash: &BlockHash) -> bool {
        self.by_hash.contains_key(hash)
    }

    pub fn winner(&self, root: &QualifiedRoot) -> Option<BlockHash> {
        self.by_root.get(root).copied()
    }

    pub fn erase(&mut self, hash: &BlockHash) {
        if let Some(root) = self.by_hash.remove(hash) {
            self.by_root.remove(&root);
            self.order.retain(|r| *r != root);
        }
    }

    pub fn clear(&mut self) {
        self.by_root.clear();
        self.by_hash.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

pub struct RecentlyDropped {
    difficulties: HashMap<QualifiedRoot, u64>,
    order: VecDeque<QualifiedRoot>,
    capacity: usize,
}

impl RecentlyDropped {
    pub fn new(capacity: usize) -> Self {
        Self {
            difficulties: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    /// Remember a dropped root, keeping the highest difficulty seen for it.
    pub fn add(&mut self, root: QualifiedRoot, difficulty: u64) {
        if self.capacity == 0 {
            return;
        }
        if let Some(existing) = self.difficulties.get_mut(&root) {
            *existing = (*existing).max(difficulty);
            return;
        }
        if self.order.len() >= self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.difficulties.remove(&evicted);
            }
        }
        self.difficulties.insert(root, difficulty);
        self.order.push_back(root);
    }

    pub fn find(&self, root: &QualifiedRoot) -> Option<u64> {
        self.difficulties.get(root).copied()
    }

    pub fn erase(&mut self, root: &QualifiedRoot) {
        if self.difficulties.remove(root).is_some() {
            self.order.retain(|r| r != root);
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
