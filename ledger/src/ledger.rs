//! The ledger: typed access to the store plus cached counters and weights.
//!
//! Mutating calls (`process`, `rollback`, `put_confirmation_height`) must be
//! made while holding a write turn from `lattice_store::WriteQueue`; reads
//! may happen at any time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use lattice_nullables::NullStore;
use lattice_store::{AccountInfo, ConfirmationHeightInfo, LedgerStore, PendingInfo, PendingKey, StoreError};
use lattice_types::{Account, Block, BlockDetails, BlockHash, BlockKind, QualifiedRoot};

use crate::rep_weights::{RepWeights, WeightOracle};
use crate::{LedgerConstants, LedgerError};

/// Summary statistics for the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerSummary {
    pub accounts: u64,
    pub blocks: u64,
    pub pending: u64,
    pub cemented: u64,
}

pub struct Ledger {
    pub(crate) store: Arc<dyn LedgerStore>,
    pub constants: LedgerConstants,
    pub(crate) rep_weights: RwLock<RepWeights>,
    cemented_count: AtomicU64,
}

impl Ledger {
    /// Open a ledger on `store`, writing the genesis block if the store is empty.
    pub fn new(store: Arc<dyn LedgerStore>, constants: LedgerConstants) -> Result<Self, LedgerError> {
        let ledger = Self {
            store,
            constants,
            rep_weights: RwLock::new(RepWeights::new()),
            cemented_count: AtomicU64::new(0),
        };
        if ledger.store.block_count()? == 0 {
            ledger.initialize_genesis()?;
        } else {
            ledger.rebuild_caches()?;
        }
        Ok(ledger)
    }

    /// In-memory ledger with unit-test constants.
    pub fn new_null() -> Result<Self, LedgerError> {
        Self::new(Arc::new(NullStore::new()), LedgerConstants::unit_test())
    }

    fn initialize_genesis(&self) -> Result<(), LedgerError> {
        let genesis = &self.constants.genesis;
        let account = self.constants.genesis_account;
        self.put_block(genesis)?;
        self.store.put_account(
            &account,
            &AccountInfo {
                head: genesis.hash(),
                open_block: genesis.hash(),
                representative: genesis.representative(),
                balance: genesis.balance(),
                block_count: 1,
                epoch: Default::default(),
            },
        )?;
        self.store
            .put_confirmation_height(&account, &ConfirmationHeightInfo::new(1, genesis.hash()))?;
        self.rep_weights
            .write()
            .unwrap()
            .add_weight(&genesis.representative(), genesis.balance());
        self.cemented_count.store(1, Ordering::SeqCst);
        tracing::info!(network = self.constants.network.as_str(), genesis = %genesis.hash(), "ledger initialized");
        Ok(())
    }

    fn rebuild_caches(&self) -> Result<(), LedgerError> {
        let accounts = self.store.iter_accounts()?;
        let mut cemented = 0;
        for (account, _) in &accounts {
            cemented += self.confirmation_height(account)?.height;
        }
        self.rep_weights
            .write()
            .unwrap()
            .rebuild(accounts.iter().map(|(_, info)| (info.representative, info.balance)));
        self.cemented_count.store(cemented, Ordering::SeqCst);
        tracing::info!(accounts = accounts.len(), cemented, "ledger caches rebuilt");
        Ok(())
    }

    pub(crate) fn put_block(&self, block: &Block) -> Result<(), LedgerError> {
        let bytes = bincode::serialize(block).map_err(|e| LedgerError::Serialization(e.to_string()))?;
        self.store.put_block(&block.hash(), &bytes)?;
        Ok(())
    }

    /// Load a block, `None` if it is not in the store.
    pub fn get_block(&self, hash: &BlockHash) -> Result<Option<Arc<Block>>, LedgerError> {
        match self.store.get_block(hash) {
            Ok(bytes) => {
                let block: Block =
                    bincode::deserialize(&bytes).map_err(|e| StoreError::Corruption {
                        hash: *hash,
                        reason: e.to_string(),
                    })?;
                Ok(Some(Arc::new(block)))
            }
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Like [`Self::get_block`] but logs backend failures and reports them as absent.
    pub fn block(&self, hash: &BlockHash) -> Option<Arc<Block>> {
        match self.get_block(hash) {
            Ok(block) => block,
            Err(e) => {
                tracing::error!(%hash, error = %e, "failed to load block");
                None
            }
        }
    }

    pub fn block_exists(&self, hash: &BlockHash) -> bool {
        self.store.block_exists(hash).unwrap_or(false)
    }

    pub fn successor(&self, hash: &BlockHash) -> Option<BlockHash> {
        self.store.successor(hash).ok().flatten()
    }

    /// The applied block occupying a chain position, if any.
    pub fn block_at_root(&self, root: &QualifiedRoot) -> Option<BlockHash> {
        if root.previous.is_zero() {
            let account = Account::new(*root.root.as_bytes());
            self.account_info(&account).map(|info| info.open_block)
        } else {
            self.successor(&root.previous)
        }
    }

    pub fn account_info(&self, account: &Account) -> Option<AccountInfo> {
        self.store.get_account(account).ok()
    }

    pub fn account_balance(&self, account: &Account) -> u128 {
        self.account_info(account).map(|i| i.balance).unwrap_or(0)
    }

    pub(crate) fn pending(&self, key: &PendingKey) -> Option<PendingInfo> {
        self.store.get_pending(key).ok()
    }

    pub fn pending_exists(&self, destination: &Account, send_hash: &BlockHash) -> bool {
        self.pending(&PendingKey::new(*destination, *send_hash))
            .is_some()
    }

    /// Balance moved by a block.
    pub fn amount(&self, hash: &BlockHash) -> Option<u128> {
        let block = self.block(hash)?;
        if block.is_open() {
            return Some(block.balance());
        }
        let previous = self.block(&block.previous())?;
        Some(block.balance().abs_diff(previous.balance()))
    }

    pub fn weight(&self, representative: &Account) -> u128 {
        self.rep_weights.read().unwrap().weight(representative)
    }

    pub fn total_weight(&self) -> u128 {
        self.rep_weights.read().unwrap().total_weight()
    }

    /// Cemented height of an account; height 0 when nothing is cemented.
    pub fn confirmation_height(&self, account: &Account) -> Result<ConfirmationHeightInfo, LedgerError> {
        match self.store.get_confirmation_height(account) {
            Ok(info) => Ok(info),
            Err(e) if e.is_not_found() => Ok(ConfirmationHeightInfo::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist a new cemented height. Callers hold the confirmation-height write turn.
    pub fn put_confirmation_height(
        &self,
        account: &Account,
        info: &ConfirmationHeightInfo,
    ) -> Result<(), LedgerError> {
        self.store.put_confirmation_height(account, info)?;
        Ok(())
    }

    pub fn add_cemented(&self, count: u64) {
        self.cemented_count.fetch_add(count, Ordering::SeqCst);
    }

    pub fn cemented_count(&self) -> u64 {
        self.cemented_count.load(Ordering::SeqCst)
    }

    pub fn block_count(&self) -> u64 {
        self.store.block_count().unwrap_or(0)
    }

    pub fn summary(&self) -> Result<LedgerSummary, LedgerError> {
        Ok(LedgerSummary {
            accounts: self.store.account_count()?,
            blocks: self.store.block_count()?,
            pending: self.store.pending_count()?,
            cemented: self.cemented_count(),
        })
    }

    /// Whether the block is at or below its account's confirmation height.
    pub fn block_confirmed(&self, hash: &BlockHash) -> bool {
        let Some(block) = self.block(hash) else {
            return false;
        };
        match self.confirmation_height(&block.account()) {
            Ok(info) => block.height() <= info.height,
            Err(_) => false,
        }
    }

    /// First block above the account's confirmation height.
    pub fn first_uncemented(&self, account: &Account) -> Option<Arc<Block>> {
        let info = self.confirmation_height(account).ok()?;
        let hash = if info.height == 0 {
            self.account_info(account)?.open_block
        } else {
            self.successor(&info.frontier)?
        };
        self.block(&hash)
    }

    /// The first causal prerequisite of `block` that is not yet cemented.
    ///
    /// Checks the previous block first, then the source of receives and opens.
    pub fn unconfirmed_dependency(&self, block: &Block) -> Option<BlockHash> {
        if block.hash() == self.constants.genesis.hash() {
            return None;
        }
        if !block.previous().is_zero() && !self.block_confirmed(&block.previous()) {
            return Some(block.previous());
        }
        block
            .source()
            .filter(|source| !self.block_confirmed(source))
    }

    pub fn dependents_confirmed(&self, block: &Block) -> bool {
        self.unconfirmed_dependency(block).is_none()
    }

    /// Work-threshold details of a block, applied or not.
    pub fn block_details(&self, block: &Block) -> BlockDetails {
        if let Some(sideband) = block.sideband() {
            return sideband.details;
        }
        let account_epoch = self
            .account_info(&block.account())
            .map(|i| i.epoch)
            .unwrap_or_default();
        match block.kind() {
            BlockKind::Send => BlockDetails::new(account_epoch, true, false, false),
            BlockKind::Open | BlockKind::Receive => {
                let source_epoch = block
                    .source()
                    .and_then(|s| self.pending(&PendingKey::new(block.account(), s)))
                    .map(|p| p.epoch)
                    .unwrap_or_default();
                BlockDetails::new(account_epoch.max(source_epoch), false, true, false)
            }
            BlockKind::Change => BlockDetails::new(account_epoch, false, false, false),
            BlockKind::Epoch => BlockDetails::new(
                account_epoch.next().unwrap_or(account_epoch),
                false,
                false,
                true,
            ),
        }
    }

    /// Normalized work multiplier of a block.
    pub fn block_multiplier(&self, block: &Block) -> f64 {
        let details = self.block_details(block);
        self.constants.thresholds.block_multiplier(block, &details)
    }

    pub fn block_difficulty(&self, block: &Block) -> u64 {
        self.constants.thresholds.difficulty_block(block)
    }
}

impl WeightOracle for Ledger {
    fn weight(&self, representative: &Account) -> u128 {
        Ledger::weight(self, representative)
    }
}
