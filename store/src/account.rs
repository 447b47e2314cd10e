//! Account storage trait.

use crate::StoreError;
use lattice_types::{Account, BlockHash, Epoch};
use serde::{Deserialize, Serialize};

/// Latest state of an account chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInfo {
    /// Hash of the latest block in this account's chain.
    pub head: BlockHash,
    pub open_block: BlockHash,
    pub representative: Account,
    pub balance: u128,
    /// Number of blocks in this account's chain.
    pub block_count: u64,
    pub epoch: Epoch,
}

pub trait AccountStore {
    fn get_account(&self, account: &Account) -> Result<AccountInfo, StoreError>;
    fn put_account(&self, account: &Account, info: &AccountInfo) -> Result<(), StoreError>;
    fn delete_account(&self, account: &Account) -> Result<(), StoreError>;
    fn account_exists(&self, account: &Account) -> Result<bool, StoreError>;
    fn account_count(&self) -> Result<u64, StoreError>;
    fn iter_accounts(&self) -> Result<Vec<(Account, AccountInfo)>, StoreError>;
}
