//! Nullable store: thread-safe in-memory tables.

use lattice_store::{
    AccountInfo, AccountStore, BlockStore, ConfirmationHeightInfo, ConfirmationHeightStore,
    PendingInfo, PendingKey, PendingStore, StoreError,
};
use lattice_types::{Account, BlockHash};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory implementation of every ledger table.
///
/// Each table has its own lock, so readers of one table never wait for a
/// writer of another.
#[derive(Default)]
pub struct NullStore {
    accounts: RwLock<HashMap<Account, AccountInfo>>,
    blocks: RwLock<HashMap<BlockHash, Vec<u8>>>,
    successors: RwLock<HashMap<BlockHash, BlockHash>>,
    pending: RwLock<HashMap<PendingKey, PendingInfo>>,
    confirmation_heights: RwLock<HashMap<Account, ConfirmationHeightInfo>>,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountStore for NullStore {
    fn get_account(&self, account: &Account) -> Result<AccountInfo, StoreError> {
        self.accounts
            .read()
            .unwrap()
            .get(account)
            .cloned()
            .ok_or_else(|| StoreError::not_found("accounts", account))
    }

    fn put_account(&self, account: &Account, info: &AccountInfo) -> Result<(), StoreError> {
        self.accounts.write().unwrap().insert(*account, info.clone());
        Ok(())
    }

    fn delete_account(&self, account: &Account) -> Result<(), StoreError> {
        self.accounts.write().unwrap().remove(account);
        Ok(())
    }

    fn account_exists(&self, account: &Account) -> Result<bool, StoreError> {
        Ok(self.accounts.read().unwrap().contains_key(account))
    }

    fn account_count(&self) -> Result<u64, StoreError> {
        Ok(self.accounts.read().unwrap().len() as u64)
    }

    fn iter_accounts(&self) -> Result<Vec<(Account, AccountInfo)>, StoreError> {
        Ok(self
            .accounts
            .read()
            .unwrap()
            .iter()
            .map(|(a, i)| (*a, i.clone()))
            .collect())
    }
}

impl BlockStore for NullStore {
    fn put_block(&self, hash: &BlockHash, block_bytes: &[u8]) -> Result<(), StoreError> {
        let mut blocks = self.blocks.write().unwrap();
        match blocks.get(hash) {
            Some(existing) if existing.as_slice() != block_bytes => {
                Err(StoreError::Duplicate(*hash))
            }
            _ => {
                blocks.insert(*hash, block_bytes.to_vec());
                Ok(())
            }
        }
    }

    fn get_block(&self, hash: &BlockHash) -> Result<Vec<u8>, StoreError> {
        self.blocks
            .read()
            .unwrap()
            .get(hash)
            .cloned()
            .ok_or_else(|| StoreError::not_found("blocks", hash))
    }

    fn block_exists(&self, hash: &BlockHash) -> Result<bool, StoreError> {
        Ok(self.blocks.read().unwrap().contains_key(hash))
    }

    fn delete_block(&self, hash: &BlockHash) -> Result<(), StoreError> {
        self.blocks.write().unwrap().remove(hash);
        self.successors.write().unwrap().remove(hash);
        Ok(())
    }

    fn successor(&self, hash: &BlockHash) -> Result<Option<BlockHash>, StoreError> {
        Ok(self.successors.read().unwrap().get(hash).copied())
    }

    fn put_successor(&self, hash: &BlockHash, successor: &BlockHash) -> Result<(), StoreError> {
        self.successors.write().unwrap().insert(*hash, *successor);
        Ok(())
    }

    fn clear_successor(&self, hash: &BlockHash) -> Result<(), StoreError> {
        self.successors.write().unwrap().remove(hash);
        Ok(())
    }

    fn block_count(&self) -> Result<u64, StoreError> {
        Ok(self.blocks.read().unwrap().len() as u64)
    }
}

impl PendingStore for NullStore {
    fn put_pending(&self, key: &PendingKey, info: &PendingInfo) -> Result<(), StoreError> {
        self.pending.write().unwrap().insert(*key, info.clone());
        Ok(())
    }

    fn get_pending(&self, key: &PendingKey) -> Result<PendingInfo, StoreError> {
        self.pending
            .read()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| {
                StoreError::not_found("pending", format!("{}:{}", key.destination, key.send_hash))
            })
    }

    fn delete_pending(&self, key: &PendingKey) -> Result<(), StoreError> {
        self.pending.write().unwrap().remove(key);
        Ok(())
    }

    fn pending_count(&self) -> Result<u64, StoreError> {
        Ok(self.pending.read().unwrap().len() as u64)
    }
}

impl ConfirmationHeightStore for NullStore {
    fn get_confirmation_height(
        &self,
        account: &Account,
    ) -> Result<ConfirmationHeightInfo, StoreError> {
        self.confirmation_heights
            .read()
            .unwrap()
            .get(account)
            .copied()
            .ok_or_else(|| StoreError::not_found("confirmation_height", account))
    }

    fn put_confirmation_height(
        &self,
        account: &Account,
        info: &ConfirmationHeightInfo,
    ) -> Result<(), StoreError> {
        self.confirmation_heights
            .write()
            .unwrap()
            .insert(*account, *info);
        Ok(())
    }

    fn delete_confirmation_height(&self, account: &Account) -> Result<(), StoreError> {
        self.confirmation_heights.write().unwrap().remove(account);
        Ok(())
    }
}
