//! Narrow interfaces to the parts of the node the election manager talks to,
//! plus recording implementations for tests and the dev daemon.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use lattice_types::{Block, BlockHash, QualifiedRoot};

/// Broadcasts confirmation requests for an election to representatives.
pub trait ConfirmationSolicitor: Send + Sync {
    fn request(&self, root: &QualifiedRoot, candidates: &[Arc<Block>]);
}

/// Duplicate-suppression filter of the network layer.
pub trait PublishFilter: Send + Sync {
    /// Forget the hashes so the blocks can be published again.
    fn clear(&self, hashes: &[BlockHash]);
}

/// Entry point of the confirmation height processor.
pub trait CementationQueue: Send + Sync {
    fn add(&self, block: Arc<Block>);
    fn is_processing_added_block(&self, hash: &BlockHash) -> bool;
}

/// Remembers every request instead of sending it.
#[derive(Default)]
pub struct RecordingSolicitor {
    requests: Mutex<Vec<QualifiedRoot>>,
}

impl RecordingSolicitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<QualifiedRoot> {
        self.requests.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.requests.lock().unwrap().clear();
    }
}

impl ConfirmationSolicitor for RecordingSolicitor {
    fn request(&self, root: &QualifiedRoot, _candidates: &[Arc<Block>]) {
        self.requests.lock().unwrap().push(*root);
    }
}

#[derive(Default)]
pub struct RecordingPublishFilter {
    cleared: Mutex<Vec<BlockHash>>,
}

impl RecordingPublishFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cleared(&self) -> Vec<BlockHash> {
        self.cleared.lock().unwrap().clone()
    }
}

impl PublishFilter for RecordingPublishFilter {
    fn clear(&self, hashes: &[BlockHash]) {
        self.cleared.lock().unwrap().extend_from_slice(hashes);
    }
}

/// Collects blocks handed off for cementing without cementing them.
#[derive(Default)]
pub struct RecordingCementationQueue {
    added: Mutex<Vec<Arc<Block>>>,
    processing: Mutex<HashSet<BlockHash>>,
}

impl RecordingCementationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn added(&self) -> Vec<Arc<Block>> {
        self.added.lock().unwrap().clone()
    }

    /// Take the queued blocks, as a worker would.
    pub fn drain(&self) -> Vec<Arc<Block>> {
        let blocks = std::mem::take(&mut *self.added.lock().unwrap());
        let mut processing = self.processing.lock().unwrap();
        for block in &blocks {
            processing.remove(&block.hash());
        }
        blocks
    }
}

impl CementationQueue for RecordingCementationQueue {
    fn add(&self, block: Arc<Block>) {
        self.processing.lock().unwrap().insert(block.hash());
        self.added.lock().unwrap().push(block);
    }

    fn is_processing_added_block(&self, hash: &BlockHash) -> bool {
        self.processing.lock().unwrap().contains(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_types::{Account, BlockKind, Link};

    #[test]
    fn cementation_queue_tracks_processing() {
        let queue = RecordingCementationQueue::new();
        let block = Arc::new(Block::new(
            BlockKind::Change,
            Account::new([1; 32]),
            BlockHash::new([2; 32]),
            Account::new([1; 32]),
            5,
            Link::ZERO,
            0,
        ));
        queue.add(Arc::clone(&block));
        assert!(queue.is_processing_added_block(&block.hash()));
        assert_eq!(queue.drain().len(), 1);
        assert!(!queue.is_processing_added_block(&block.hash()));
        assert!(queue.added().is_empty());
    }
}
