//! Confirmation height processor: cements confirmed blocks in causal order.
//!
//! Cementing a target walks its account chain down to the current
//! confirmation height. A receive or open first pulls in the uncemented part
//! of its source account's chain up to the referenced send. Blocks are
//! emitted oldest dependency first and the target last.
//!
//! Two strategies share that ordering:
//! - [`unbounded`] loads every segment up front and writes once.
//! - [`bounded`] steps one block at a time and writes every `batch_size`
//!   blocks, so memory does not grow with chain length.

pub mod bounded;
pub mod processor;
pub mod unbounded;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use lattice_ledger::Ledger;
use lattice_types::{Account, Block, BlockHash};

use crate::NodeError;

pub use processor::{AlreadyCementedObserver, BlockCementedObserver, ConfirmationHeightProcessor};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationHeightMode {
    /// Unbounded while few blocks are uncemented, bounded otherwise.
    #[default]
    Automatic,
    Bounded,
    Unbounded,
}

/// Read access to account chains during a cementing pass.
pub trait ChainWalker {
    fn block(&self, hash: &BlockHash) -> Option<Arc<Block>>;

    fn successor(&self, hash: &BlockHash) -> Option<BlockHash>;

    fn open_block(&self, account: &Account) -> Option<BlockHash>;

    /// `(height, frontier)` of the account's cemented prefix.
    fn cemented(&self, account: &Account) -> Result<(u64, BlockHash), NodeError>;
}

impl ChainWalker for Ledger {
    fn block(&self, hash: &BlockHash) -> Option<Arc<Block>> {
        Ledger::block(self, hash)
    }

    fn successor(&self, hash: &BlockHash) -> Option<BlockHash> {
        Ledger::successor(self, hash)
    }

    fn open_block(&self, account: &Account) -> Option<BlockHash> {
        self.account_info(account).map(|info| info.open_block)
    }

    fn cemented(&self, account: &Account) -> Result<(u64, BlockHash), NodeError> {
        let info = self.confirmation_height(account)?;
        Ok((info.height, info.frontier))
    }
}

/// Per-account height already cemented or emitted during one pass.
#[derive(Default)]
pub(crate) struct PlannedHeights {
    heights: HashMap<Account, (u64, BlockHash)>,
}

impl PlannedHeights {
    pub(crate) fn get(
        &mut self,
        walker: &dyn ChainWalker,
        account: &Account,
    ) -> Result<(u64, BlockHash), NodeError> {
        if let Some(planned) = self.heights.get(account) {
            return Ok(*planned);
        }
        let cemented = walker.cemented(account)?;
        self.heights.insert(*account, cemented);
        Ok(cemented)
    }

    pub(crate) fn emit(&mut self, block: &Block) {
        self.heights
            .insert(block.account(), (block.height(), block.hash()));
    }
}

pub(crate) fn load(walker: &dyn ChainWalker, hash: &BlockHash) -> Result<Arc<Block>, NodeError> {
    walker
        .block(hash)
        .ok_or_else(|| NodeError::Invariant(format!("block {hash} is not in the ledger")))
}

/// The source send of a receive or open, if it still has to be cemented first.
pub(crate) fn pending_source(
    walker: &dyn ChainWalker,
    planned: &mut PlannedHeights,
    block: &Block,
) -> Result<Option<Arc<Block>>, NodeError> {
    let Some(source_hash) = block.source() else {
        return Ok(None);
    };
    let source = load(walker, &source_hash)?;
    let (height, _) = planned.get(walker, &source.account())?;
    Ok((source.height() > height).then_some(source))
}
