//! Chain-building fixture for tests.
//!
//! Wraps an in-memory ledger using stub difficulty, so a block's work value
//! is its difficulty and tests can choose exact multipliers.

use std::sync::Arc;

use lattice_store::ConfirmationHeightInfo;
use lattice_types::{Account, Block, BlockHash, BlockKind, Epoch, Link};
use lattice_work::from_multiplier;

use crate::{Ledger, ProcessResult};

pub struct LedgerContext {
    pub ledger: Arc<Ledger>,
}

impl LedgerContext {
    pub fn new() -> Self {
        let ledger = Ledger::new_null().expect("in-memory ledger cannot fail to open");
        Self {
            ledger: Arc::new(ledger),
        }
    }

    pub fn key(seed: u8) -> Account {
        Account::new([seed; 32])
    }

    pub fn genesis(&self) -> Arc<Block> {
        Arc::clone(&self.ledger.constants.genesis)
    }

    pub fn genesis_account(&self) -> Account {
        self.ledger.constants.genesis_account
    }

    /// Work value reaching `multiplier` over the epoch 1 threshold.
    pub fn work(&self, multiplier: f64) -> u64 {
        from_multiplier(multiplier, self.ledger.constants.thresholds.epoch_1)
    }

    fn head(&self, account: &Account) -> Arc<Block> {
        let info = self
            .ledger
            .account_info(account)
            .expect("account must be opened first");
        self.ledger.block(&info.head).expect("head block exists")
    }

    /// Send from the account's current head.
    pub fn send(&self, from: &Account, to: &Account, amount: u128) -> Block {
        self.send_from(&self.head(from), to, amount)
    }

    /// Send chained onto `previous`, which does not need to be applied yet.
    pub fn send_from(&self, previous: &Block, to: &Account, amount: u128) -> Block {
        Block::new(
            BlockKind::Send,
            previous.account(),
            previous.hash(),
            previous.representative(),
            previous.balance() - amount,
            Link::from(*to),
            self.work(1.0),
        )
    }

    /// Open `account` by receiving `send`, self-represented.
    pub fn open(&self, account: &Account, send: &Block) -> Block {
        Block::new(
            BlockKind::Open,
            *account,
            BlockHash::ZERO,
            *account,
            self.sent_amount(send),
            Link::from(send.hash()),
            self.work(1.0),
        )
    }

    pub fn receive(&self, account: &Account, send: &Block) -> Block {
        let head = self.head(account);
        Block::new(
            BlockKind::Receive,
            *account,
            head.hash(),
            head.representative(),
            head.balance() + self.sent_amount(send),
            Link::from(send.hash()),
            self.work(1.0),
        )
    }

    pub fn change(&self, account: &Account, representative: &Account) -> Block {
        let head = self.head(account);
        Block::new(
            BlockKind::Change,
            *account,
            head.hash(),
            *representative,
            head.balance(),
            Link::ZERO,
            self.work(1.0),
        )
    }

    pub fn epoch(&self, account: &Account, epoch: Epoch) -> Block {
        let head = self.head(account);
        let link = self
            .ledger
            .constants
            .epoch_link(epoch)
            .expect("epoch 0 has no marker");
        Block::new(
            BlockKind::Epoch,
            *account,
            head.hash(),
            head.representative(),
            head.balance(),
            link,
            self.work(8.0),
        )
    }

    fn sent_amount(&self, send: &Block) -> u128 {
        let previous = self
            .ledger
            .block(&send.previous())
            .expect("send's previous block is applied");
        previous.balance() - send.balance()
    }

    pub fn process_result(&self, mut block: Block) -> ProcessResult {
        self.ledger.process(&mut block).expect("in-memory store")
    }

    /// Apply a block that must be valid.
    pub fn process(&self, mut block: Block) -> Arc<Block> {
        let result = self.ledger.process(&mut block).expect("in-memory store");
        assert_eq!(result, ProcessResult::Progress, "block {}", block.hash());
        Arc::new(block)
    }

    /// Mark everything up to `block` on its account as cemented.
    pub fn cement(&self, block: &Block) {
        let account = block.account();
        let current = self.ledger.confirmation_height(&account).expect("in-memory store");
        let height = self
            .ledger
            .block(&block.hash())
            .map(|b| b.height())
            .expect("block is applied");
        if height > current.height {
            self.ledger
                .put_confirmation_height(&account, &ConfirmationHeightInfo::new(height, block.hash()))
                .expect("in-memory store");
            self.ledger.add_cemented(height - current.height);
        }
    }
}

impl Default for LedgerContext {
    fn default() -> Self {
        Self::new()
    }
}
