//! The most recent cementing results, newest last.

use std::collections::VecDeque;

use crate::election::ElectionStatus;

pub struct RecentlyCemented {
    statuses: VecDeque<ElectionStatus>,
    capacity: usize,
}

impl RecentlyCemented {
    pub fn new(capacity: usize) -> Self {
        Self {
            statuses: VecDeque::new(),
            capacity,
        }
    }

    pub fn push(&mut self, status: ElectionStatus) {
        if self.capacity == 0 {
            return;
        }
        if self.statuses.len() >= self.capacity {
            self.statuses.pop_front();
        }
        self.statuses.push_back(status);
    }

    pub fn list(&self) -> Vec<ElectionStatus> {
        self.statuses.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::election::Election;
    use lattice_types::{Account, Block, BlockHash, BlockKind, Link, Timestamp};
    use std::sync::Arc;

    fn status(byte: u8) -> ElectionStatus {
        let block = Block::new(
            BlockKind::Change,
            Account::new([byte; 32]),
            BlockHash::new([byte; 32]),
            Account::new([byte; 32]),
            1,
            Link::ZERO,
            0,
        );
        Election::new(Arc::new(block), 0, 1.0, Timestamp::new(0)).status()
    }

    #[test]
    fn keeps_newest() {
        let mut rc = RecentlyCemented::new(2);
        rc.push(status(1));
        rc.push(status(2));
        rc.push(status(3));
        let accounts: Vec<_> = rc.list().iter().map(|s| s.winner.account()).collect();
        assert_eq!(accounts, vec![Account::new([2; 32]), Account::new([3; 32])]);
    }
}
