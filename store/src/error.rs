use lattice_types::BlockHash;
use thiserror::Error;

/// Failures reported by a ledger table backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Lookup of an absent key. The ledger maps this to "absent" rather
    /// than surfacing it.
    #[error("{table} entry not found: {key}")]
    NotFound { table: &'static str, key: String },

    /// A block hash was stored again with different bytes.
    #[error("block {0} already stored with different contents")]
    Duplicate(BlockHash),

    /// Stored bytes no longer decode to the value that was written.
    #[error("stored block {hash} is corrupted: {reason}")]
    Corruption { hash: BlockHash, reason: String },
}

impl StoreError {
    pub fn not_found(table: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            table,
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
