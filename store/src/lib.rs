//! Abstract storage traits for the lattice ledger.
//!
//! Every storage backend implements these traits. The rest of the codebase
//! depends only on the traits. Writers take turns through [`WriteQueue`].

pub mod account;
pub mod block;
pub mod confirmation_height;
pub mod error;
pub mod pending;
pub mod write_queue;

pub use account::{AccountInfo, AccountStore};
pub use block::BlockStore;
pub use confirmation_height::{ConfirmationHeightInfo, ConfirmationHeightStore};
pub use error::StoreError;
pub use pending::{PendingInfo, PendingKey, PendingStore};
pub use write_queue::{WriteGuard, WriteQueue, Writer};

/// Everything the ledger needs from a backend.
pub trait LedgerStore:
    AccountStore + BlockStore + PendingStore + ConfirmationHeightStore + Send + Sync
{
}

impl<T> LedgerStore for T where
    T: AccountStore + BlockStore + PendingStore + ConfirmationHeightStore + Send + Sync
{
}
