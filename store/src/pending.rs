//! Pending receive storage trait.

use crate::StoreError;
use lattice_types::{Account, BlockHash, Epoch};
use serde::{Deserialize, Serialize};

/// `(destination, send_hash)`: one unreceived send.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PendingKey {
    pub destination: Account,
    pub send_hash: BlockHash,
}

impl PendingKey {
    pub fn new(destination: Account, send_hash: BlockHash) -> Self {
        Self {
            destination,
            send_hash,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingInfo {
    pub source: Account,
    pub amount: u128,
    pub epoch: Epoch,
}

/// Each entry is a transfer the destination has not yet received.
pub trait PendingStore {
    fn put_pending(&self, key: &PendingKey, info: &PendingInfo) -> Result<(), StoreError>;

    fn get_pending(&self, key: &PendingKey) -> Result<PendingInfo, StoreError>;

    fn delete_pending(&self, key: &PendingKey) -> Result<(), StoreError>;

    /// Total number of pending receives across all accounts.
    fn pending_count(&self) -> Result<u64, StoreError>;
}
