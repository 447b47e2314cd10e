//! Undoing applied blocks.
//!
//! Rolling back a block also rolls back every later block on its account
//! and, for sends that were already received, the receiving chain down to
//! the receive. Cemented blocks are never rolled back.

use std::sync::Arc;

use lattice_store::{AccountInfo, PendingInfo, PendingKey};
use lattice_types::{Account, Block, BlockHash};

use crate::{Ledger, LedgerError};

impl Ledger {
    /// Roll back `hash` and everything that depends on it.
    ///
    /// Returns the removed blocks, most recent first.
    pub fn rollback(&self, hash: &BlockHash) -> Result<Vec<Arc<Block>>, LedgerError> {
        let target = self
            .get_block(hash)?
            .ok_or(LedgerError::BlockNotFound(*hash))?;
        let account = target.account();
        let mut removed = Vec::new();
        loop {
            let info = self
                .account_info(&account)
                .ok_or(LedgerError::AccountNotFound(account))?;
            let head = self
                .get_block(&info.head)?
                .ok_or(LedgerError::BlockNotFound(info.head))?;
            if self.block_confirmed(&head.hash()) {
                return Err(LedgerError::RollbackCemented(head.hash()));
            }
            self.rollback_head(&head, &info, &mut removed)?;
            if head.hash() == *hash {
                break;
            }
        }
        Ok(removed)
    }

    fn rollback_head(
        &self,
        block: &Arc<Block>,
        info: &AccountInfo,
        removed: &mut Vec<Arc<Block>>,
    ) -> Result<(), LedgerError> {
        let hash = block.hash();
        let account = block.account();

        if let Some(destination) = block.destination() {
            let key = PendingKey::new(destination, hash);
            if self.pending(&key).is_none() {
                let receive = self.find_receive(&destination, &hash)?;
                removed.extend(self.rollback(&receive)?);
            }
            self.store.delete_pending(&key)?;
        }

        let previous = if block.is_open() {
            None
        } else {
            Some(
                self.get_block(&block.previous())?
                    .ok_or(LedgerError::BlockNotFound(block.previous()))?,
            )
        };

        if let Some(source) = block.source() {
            if let Some(send) = self.get_block(&source)? {
                let previous_balance = previous.as_ref().map(|p| p.balance()).unwrap_or(0);
                self.store.put_pending(
                    &PendingKey::new(account, source),
                    &PendingInfo {
                        source: send.account(),
                        amount: block.balance() - previous_balance,
                        epoch: send.sideband().map(|s| s.details.epoch).unwrap_or_default(),
                    },
                )?;
            }
        }

        let mut weights = self.rep_weights.write().unwrap();
        match &previous {
            Some(previous) => {
                weights.redelegate(
                    &block.representative(),
                    block.balance(),
                    &previous.representative(),
                    previous.balance(),
                );
                drop(weights);
                self.store.put_account(
                    &account,
                    &AccountInfo {
                        head: previous.hash(),
                        open_block: info.open_block,
                        representative: previous.representative(),
                        balance: previous.balance(),
                        block_count: info.block_count - 1,
                        epoch: previous
                            .sideband()
                            .map(|s| s.details.epoch)
                            .unwrap_or_default(),
                    },
                )?;
                self.store.clear_successor(&previous.hash())?;
            }
            None => {
                weights.remove_weight(&block.representative(), block.balance());
                drop(weights);
                self.store.delete_account(&account)?;
                self.store.delete_confirmation_height(&account)?;
            }
        }

        self.store.delete_block(&hash)?;
        tracing::debug!(%hash, %account, "block rolled back");
        removed.push(Arc::clone(block));
        Ok(())
    }

    /// The block on `destination`'s chain that received `send_hash`.
    fn find_receive(&self, destination: &Account, send_hash: &BlockHash) -> Result<BlockHash, LedgerError> {
        let info = self
            .account_info(destination)
            .ok_or(LedgerError::AccountNotFound(*destination))?;
        let mut current = info.head;
        while !current.is_zero() {
            let block = self
                .get_block(&current)?
                .ok_or(LedgerError::BlockNotFound(current))?;
            if block.source() == Some(*send_hash) {
                return Ok(current);
            }
            current = block.previous();
        }
        Err(LedgerError::BlockNotFound(*send_hash))
    }
}
