//! Block storage trait.

use crate::StoreError;
use lattice_types::BlockHash;

/// Serialized blocks keyed by hash, plus the successor links of each chain.
pub trait BlockStore {
    fn put_block(&self, hash: &BlockHash, block_bytes: &[u8]) -> Result<(), StoreError>;

    fn get_block(&self, hash: &BlockHash) -> Result<Vec<u8>, StoreError>;

    fn block_exists(&self, hash: &BlockHash) -> Result<bool, StoreError>;

    fn delete_block(&self, hash: &BlockHash) -> Result<(), StoreError>;

    /// Next block in the same account chain, if any.
    fn successor(&self, hash: &BlockHash) -> Result<Option<BlockHash>, StoreError>;

    fn put_successor(&self, hash: &BlockHash, successor: &BlockHash) -> Result<(), StoreError>;

    fn clear_successor(&self, hash: &BlockHash) -> Result<(), StoreError>;

    /// Total number of blocks in the store.
    fn block_count(&self) -> Result<u64, StoreError>;
}
