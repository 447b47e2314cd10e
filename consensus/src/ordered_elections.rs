//! Active elections indexed two ways: by qualified root for lookup and by
//! adjusted multiplier for scheduling.
//!
//! Both indexes are updated together on every mutation.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use lattice_types::QualifiedRoot;

use crate::election::Election;

/// Sort key: higher multiplier first, then earlier insertion.
#[derive(Clone, Copy, Debug)]
struct PriorityKey {
    multiplier: f64,
    sequence: u64,
}

impl PartialEq for PriorityKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PriorityKey {}

impl PartialOrd for PriorityKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PriorityKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .multiplier
            .total_cmp(&self.multiplier)
            .then(self.sequence.cmp(&other.sequence))
    }
}

struct Entry {
    election: Arc<Election>,
    key: PriorityKey,
}

#[derive(Default)]
pub struct OrderedElections {
    by_root: HashMap<QualifiedRoot, Entry>,
    by_priority: BTreeMap<PriorityKey, QualifiedRoot>,
    next_sequence: u64,
}

impl OrderedElections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert with an initial adjusted multiplier. Returns `false` if the root is taken.
    pub fn insert(&mut self, election: Arc<Election>, adjusted_multiplier: f64) -> bool {
        let root = election.qualified_root();
        if self.by_root.contains_key(&root) {
            return false;
        }
        let key = PriorityKey {
            multiplier: adjusted_multiplier,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.by_priority.insert(key, root);
        self.by_root.insert(root, Entry { election, key });
        true
    }

    pub fn get(&self, root: &QualifiedRoot) -> Option<&Arc<Election>> {
        self.by_root.get(root).map(|e| &e.election)
    }

    pub fn contains(&self, root: &QualifiedRoot) -> bool {
        self.by_root.contains_key(root)
    }

    pub fn adjusted_multiplier(&self, root: &QualifiedRoot) -> Option<f64> {
        self.by_root.get(root).map(|e| e.key.multiplier)
    }

    pub fn set_adjusted_multiplier(&mut self, root: &QualifiedRoot, multiplier: f64) {
        let Some(entry) = self.by_root.get_mut(root) else {
            return;
        };
        self.by_priority.remove(&entry.key);
        entry.key.multiplier = multiplier;
        self.by_priority.insert(entry.key, *root);
    }

    pub fn erase(&mut self, root: &QualifiedRoot) -> Option<Arc<Election>> {
        let entry = self.by_root.remove(root)?;
        self.by_priority.remove(&entry.key);
        Some(entry.election)
    }

    /// Zero-based position in scheduling order.
    pub fn rank(&self, root: &QualifiedRoot) -> Option<usize> {
        let entry = self.by_root.get(root)?;
        Some(self.by_priority.range(..entry.key).count())
    }

    /// Elections from highest to lowest adjusted multiplier.
    pub fn iter_by_priority(&self) -> impl Iterator<Item = (&QualifiedRoot, &Arc<Election>, f64)> {
        self.by_priority.iter().filter_map(move |(key, root)| {
            self.by_root
                .get(root)
                .map(|entry| (root, &entry.election, key.multiplier))
        })
    }

    /// The lowest-priority election accepted by `evictable`.
    pub fn lowest(&self, mut evictable: impl FnMut(&Election) -> bool) -> Option<QualifiedRoot> {
        self.by_priority
            .iter()
            .rev()
            .map(|(_, root)| root)
            .find(|root| {
                self.by_root
                    .get(root)
                    .map(|e| evictable(&e.election))
                    .unwrap_or(false)
            })
            .copied()
    }

    pub fn elections(&self) -> impl Iterator<Item = &Arc<Election>> {
        self.by_root.values().map(|e| &e.election)
    }

    pub fn len(&self) -> usize {
        self.by_root.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_root.is_empty()
    }

    pub fn clear(&mut self) -> Vec<Arc<Election>> {
        self.by_priority.clear();
        self.by_root.drain().map(|(_, e)| e.election).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_types::{Account, Block, BlockHash, BlockKind, Link, Timestamp};

    fn election(byte: u8) -> Arc<Election> {
        let block = Block::new(
            BlockKind::Change,
            Account::new([byte; 32]),
            BlockHash::new([byte; 32]),
            Account::new([byte; 32]),
            1,
            Link::ZERO,
            0,
        );
        Arc::new(Election::new(Arc::new(block), 0, 1.0, Timestamp::new(0)))
    }

    fn order(index: &OrderedElections) -> Vec<f64> {
        index.iter_by_priority().map(|(_, _, m)| m).collect()
    }

    #[test]
    fn iterates_highest_first() {
        let mut index = OrderedElections::new();
        index.insert(election(1), 1.0);
        index.insert(election(2), 3.0);
        index.insert(election(3), 2.0);
        assert_eq!(order(&index), vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn equal_multipliers_keep_insertion_order() {
        let mut index = OrderedElections::new();
        let a = election(1);
        let b = election(2);
        index.insert(Arc::clone(&a), 1.0);
        index.insert(Arc::clone(&b), 1.0);
        assert_eq!(index.rank(&a.qualified_root()), Some(0));
        assert_eq!(index.rank(&b.qualified_root()), Some(1));
    }

    #[test]
    fn reprioritize_and_erase_stay_in_sync() {
        let mut index = OrderedElections::new();
        let a = election(1);
        let b = election(2);
        index.insert(Arc::clone(&a), 1.0);
        index.insert(Arc::clone(&b), 2.0);
        index.set_adjusted_multiplier(&a.qualified_root(), 5.0);
        assert_eq!(index.rank(&a.qualified_root()), Some(0));
        assert_eq!(index.adjusted_multiplier(&a.qualified_root()), Some(5.0));

        assert!(index.erase(&a.qualified_root()).is_some());
        assert_eq!(order(&index), vec![2.0]);
        assert_eq!(index.len(), 1);
        assert!(!index.insert(Arc::clone(&b), 9.0));
    }

    #[test]
    fn lowest_skips_exempt() {
        let mut index = OrderedElections::new();
        let a = election(1);
        let b = election(2);
        index.insert(Arc::clone(&a), 1.0);
        index.insert(Arc::clone(&b), 2.0);
        assert_eq!(index.lowest(|_| true), Some(a.qualified_root()));
        let exempt = a.qualified_root();
        assert_eq!(
            index.lowest(|e| e.qualified_root() != exempt),
            Some(b.qualified_root())
        );
        assert_eq!(index.lowest(|_| false), None);
    }
}
