use lattice_types::{Account, BlockHash};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("block not found: {0}")]
    BlockNotFound(BlockHash),

    #[error("account not found: {0}")]
    AccountNotFound(Account),

    #[error("cannot roll back cemented block {0}")]
    RollbackCemented(BlockHash),

    #[error("block encoding failed: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Store(#[from] lattice_store::StoreError),
}
