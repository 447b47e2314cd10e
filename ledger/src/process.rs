//! Applying blocks to the ledger.

use std::fmt;

use lattice_store::{AccountInfo, PendingInfo, PendingKey};
use lattice_types::{Block, BlockDetails, BlockKind, BlockSideband, Epoch, Timestamp};

use crate::{Ledger, LedgerError};

/// Outcome of applying a block. Everything except `Progress` leaves the
/// ledger untouched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessResult {
    Progress,
    /// Already in the ledger.
    Old,
    /// Another block already occupies this chain position.
    Fork,
    GapPrevious,
    GapSource,
    /// Signatures are verified before blocks reach the ledger.
    BadSignature,
    NegativeSpend,
    BalanceMismatch,
    /// The source send is not pending for this account.
    Unreceivable,
    /// The block does not fit where it claims to go.
    BlockPosition,
    InsufficientWork,
}

impl ProcessResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Progress => "progress",
            Self::Old => "old",
            Self::Fork => "fork",
            Self::GapPrevious => "gap_previous",
            Self::GapSource => "gap_source",
            Self::BadSignature => "bad_signature",
            Self::NegativeSpend => "negative_spend",
            Self::BalanceMismatch => "balance_mismatch",
            Self::Unreceivable => "unreceivable",
            Self::BlockPosition => "block_position",
            Self::InsufficientWork => "insufficient_work",
        }
    }
}

impl fmt::Display for ProcessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated block and the state it produces.
struct Application {
    details: BlockDetails,
    height: u64,
    previous_info: Option<AccountInfo>,
    received: Option<PendingKey>,
    epoch: Epoch,
}

impl Ledger {
    /// Validate and apply `block`, attaching its sideband on success.
    ///
    /// Store failures are errors; rule violations are `Ok` with the
    /// corresponding [`ProcessResult`].
    pub fn process(&self, block: &mut Block) -> Result<ProcessResult, LedgerError> {
        if self.store.block_exists(&block.hash())? {
            return Ok(ProcessResult::Old);
        }
        let application = match block.kind() {
            BlockKind::Open => self.validate_open(block),
            _ => self.validate_successor(block),
        };
        let application = match application {
            Ok(application) => application,
            Err(result) => return Ok(result),
        };
        if !self
            .constants
            .thresholds
            .is_valid_pow(block, &application.details)
        {
            return Ok(ProcessResult::InsufficientWork);
        }
        self.apply(block, application)?;
        Ok(ProcessResult::Progress)
    }

    fn validate_open(&self, block: &Block) -> Result<Application, ProcessResult> {
        if !block.previous().is_zero() {
            return Err(ProcessResult::BlockPosition);
        }
        if self.account_info(&block.account()).is_some() {
            return Err(ProcessResult::Fork);
        }
        let (key, pending) = self.validate_receivable(block)?;
        if block.balance() != pending.amount {
            return Err(ProcessResult::BalanceMismatch);
        }
        Ok(Application {
            details: BlockDetails::new(pending.epoch, false, true, false),
            height: 1,
            previous_info: None,
            received: Some(key),
            epoch: pending.epoch,
        })
    }

    fn validate_receivable(&self, block: &Block) -> Result<(PendingKey, PendingInfo), ProcessResult> {
        let source = block.link().as_block_hash();
        if !self.block_exists(&source) {
            return Err(ProcessResult::GapSource);
        }
        let key = PendingKey::new(block.account(), source);
        let pending = self.pending(&key).ok_or(ProcessResult::Unreceivable)?;
        Ok((key, pending))
    }

    fn validate_successor(&self, block: &Block) -> Result<Application, ProcessResult> {
        if block.previous().is_zero() {
            return Err(ProcessResult::BlockPosition);
        }
        let previous = self
            .block(&block.previous())
            .ok_or(ProcessResult::GapPrevious)?;
        if previous.account() != block.account() {
            return Err(ProcessResult::BlockPosition);
        }
        let info = self
            .account_info(&block.account())
            .ok_or(ProcessResult::GapPrevious)?;
        if info.head != block.previous() {
            return Err(ProcessResult::Fork);
        }
        let height = info.block_count + 1;
        let epoch = info.epoch;
        let (details, received, epoch) = match block.kind() {
            BlockKind::Send => {
                if block.balance() >= info.balance {
                    return Err(ProcessResult::NegativeSpend);
                }
                (BlockDetails::new(epoch, true, false, false), None, epoch)
            }
            BlockKind::Receive => {
                let (key, pending) = self.validate_receivable(block)?;
                if info.balance.checked_add(pending.amount) != Some(block.balance()) {
                    return Err(ProcessResult::BalanceMismatch);
                }
                let epoch = epoch.max(pending.epoch);
                (BlockDetails::new(epoch, false, true, false), Some(key), epoch)
            }
            BlockKind::Change => {
                if block.balance() != info.balance {
                    return Err(ProcessResult::BalanceMismatch);
                }
                (BlockDetails::new(epoch, false, false, false), None, epoch)
            }
            BlockKind::Epoch => {
                let next = epoch.next().ok_or(ProcessResult::BlockPosition)?;
                if self.constants.epoch_link(next) != Some(block.link())
                    || block.representative() != info.representative
                {
                    return Err(ProcessResult::BlockPosition);
                }
                if block.balance() != info.balance {
                    return Err(ProcessResult::BalanceMismatch);
                }
                (BlockDetails::new(next, false, false, true), None, next)
            }
            BlockKind::Open => return Err(ProcessResult::BlockPosition),
        };
        Ok(Application {
            details,
            height,
            previous_info: Some(info),
            received,
            epoch,
        })
    }

    fn apply(&self, block: &mut Block, application: Application) -> Result<(), LedgerError> {
        let hash = block.hash();
        let account = block.account();
        block.set_sideband(BlockSideband {
            height: application.height,
            details: application.details,
            timestamp: Timestamp::now(),
        });
        self.put_block(block)?;

        let open_block = match &application.previous_info {
            Some(info) => {
                self.store.put_successor(&block.previous(), &hash)?;
                info.open_block
            }
            None => hash,
        };

        if let Some(key) = application.received {
            self.store.delete_pending(&key)?;
        }
        if let Some(destination) = block.destination() {
            let previous_balance = application
                .previous_info
                .as_ref()
                .map(|i| i.balance)
                .unwrap_or(0);
            self.store.put_pending(
                &PendingKey::new(destination, hash),
                &PendingInfo {
                    source: account,
                    amount: previous_balance - block.balance(),
                    epoch: application.epoch,
                },
            )?;
        }

        self.store.put_account(
            &account,
            &AccountInfo {
                head: hash,
                open_block,
                representative: block.representative(),
                balance: block.balance(),
                block_count: application.height,
                epoch: application.epoch,
            },
        )?;

        let mut weights = self.rep_weights.write().unwrap();
        match &application.previous_info {
            Some(info) => weights.redelegate(
                &info.representative,
                info.balance,
                &block.representative(),
                block.balance(),
            ),
            None => weights.add_weight(&block.representative(), block.balance()),
        }
        drop(weights);

        tracing::debug!(%hash, %account, height = application.height, kind = ?block.kind(), "block applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LedgerContext;
    use lattice_types::{Account, BlockHash, Link};

    #[test]
    fn send_then_open() {
        let ctx = LedgerContext::new();
        let genesis = ctx.genesis_account();
        let dest = LedgerContext::key(1);

        let send = ctx.process(ctx.send(&genesis, &dest, 100));
        assert_eq!(send.height(), 2);
        assert!(ctx.ledger.pending_exists(&dest, &send.hash()));

        let open = ctx.process(ctx.open(&dest, &send));
        assert_eq!(open.height(), 1);
        assert!(!ctx.ledger.pending_exists(&dest, &send.hash()));
        assert_eq!(ctx.ledger.account_balance(&dest), 100);
        assert_eq!(ctx.ledger.weight(&dest), 100);
        assert_eq!(ctx.ledger.weight(&genesis), u128::MAX - 100);
        assert_eq!(ctx.ledger.successor(&ctx.genesis().hash()), Some(send.hash()));
    }

    #[test]
    fn duplicate_is_old() {
        let ctx = LedgerContext::new();
        let send = ctx.send(&ctx.genesis_account(), &LedgerContext::key(1), 1);
        ctx.process(send.clone());
        assert_eq!(ctx.process_result(send), ProcessResult::Old);
    }

    #[test]
    fn second_block_on_same_previous_is_fork() {
        let ctx = LedgerContext::new();
        let genesis = ctx.genesis();
        let first = ctx.send_from(&genesis, &LedgerContext::key(1), 1);
        let second = ctx.send_from(&genesis, &LedgerContext::key(2), 1);
        ctx.process(first);
        assert_eq!(ctx.process_result(second), ProcessResult::Fork);
    }

    #[test]
    fn unknown_previous_is_gap() {
        let ctx = LedgerContext::new();
        let genesis = ctx.genesis();
        let first = ctx.send_from(&genesis, &LedgerContext::key(1), 1);
        let second = ctx.send_from(&first, &LedgerContext::key(1), 1);
        assert_eq!(ctx.process_result(second), ProcessResult::GapPrevious);
    }

    #[test]
    fn open_without_send_is_gap_source() {
        let ctx = LedgerContext::new();
        let dest = LedgerContext::key(1);
        let open = Block::new(
            BlockKind::Open,
            dest,
            BlockHash::ZERO,
            dest,
            10,
            Link::from(BlockHash::new([7; 32])),
            ctx.work(1.0),
        );
        assert_eq!(ctx.process_result(open), ProcessResult::GapSource);
    }

    #[test]
    fn open_for_other_account_is_unreceivable() {
        let ctx = LedgerContext::new();
        let send = ctx.process(ctx.send(&ctx.genesis_account(), &LedgerContext::key(1), 10));
        let open = ctx.open(&LedgerContext::key(2), &send);
        assert_eq!(ctx.process_result(open), ProcessResult::Unreceivable);
    }

    #[test]
    fn send_that_grows_balance_is_negative_spend() {
        let ctx = LedgerContext::new();
        let dest = LedgerContext::key(1);
        let send = ctx.process(ctx.send(&ctx.genesis_account(), &dest, 10));
        ctx.process(ctx.open(&dest, &send));
        let head = ctx.ledger.account_info(&dest).unwrap().head;
        let bad = Block::new(
            BlockKind::Send,
            dest,
            head,
            dest,
            11,
            Link::from(ctx.genesis_account()),
            ctx.work(1.0),
        );
        assert_eq!(ctx.process_result(bad), ProcessResult::NegativeSpend);
    }

    #[test]
    fn change_must_keep_balance() {
        let ctx = LedgerContext::new();
        let genesis = ctx.genesis();
        let bad = Block::new(
            BlockKind::Change,
            genesis.account(),
            genesis.hash(),
            LedgerContext::key(3),
            genesis.balance() - 1,
            Link::ZERO,
            ctx.work(1.0),
        );
        assert_eq!(ctx.process_result(bad), ProcessResult::BalanceMismatch);

        let rep = LedgerContext::key(3);
        ctx.process(ctx.change(&genesis.account(), &rep));
        assert_eq!(ctx.ledger.weight(&rep), u128::MAX);
        assert_eq!(ctx.ledger.weight(&genesis.account()), 0);
    }

    #[test]
    fn low_work_is_rejected() {
        let ctx = LedgerContext::new();
        let send = ctx
            .send(&ctx.genesis_account(), &LedgerContext::key(1), 1)
            .with_work(ctx.work(1.0) - 1);
        assert_eq!(ctx.process_result(send), ProcessResult::InsufficientWork);
        assert_eq!(ctx.ledger.block_count(), 1);
    }

    #[test]
    fn epoch_upgrade_raises_account_epoch() {
        let ctx = LedgerContext::new();
        let genesis = ctx.genesis_account();
        let epoch = ctx.process(ctx.epoch(&genesis, Epoch::Epoch1));
        assert_eq!(epoch.sideband().unwrap().details.epoch, Epoch::Epoch1);
        assert_eq!(ctx.ledger.account_info(&genesis).unwrap().epoch, Epoch::Epoch1);

        // skipping an epoch is not allowed
        let mut skip = ctx.epoch(&genesis, Epoch::Epoch2);
        skip = Block::new(
            BlockKind::Epoch,
            genesis,
            skip.previous(),
            skip.representative(),
            skip.balance(),
            ctx.ledger.constants.epoch_1_link,
            skip.work(),
        );
        assert_eq!(ctx.process_result(skip), ProcessResult::BlockPosition);
    }

    #[test]
    fn receive_adds_pending_amount() {
        let ctx = LedgerContext::new();
        let genesis = ctx.genesis_account();
        let dest = LedgerContext::key(1);
        let first = ctx.process(ctx.send(&genesis, &dest, 5));
        let second = ctx.process(ctx.send(&genesis, &dest, 7));
        ctx.process(ctx.open(&dest, &first));
        let receive = ctx.process(ctx.receive(&dest, &second));
        assert_eq!(receive.height(), 2);
        assert_eq!(ctx.ledger.account_balance(&dest), 12);
        assert_eq!(ctx.ledger.amount(&receive.hash()), Some(7));
        assert_eq!(ctx.ledger.summary().unwrap().pending, 0);
    }

    #[test]
    fn unapplied_open_has_no_account() {
        let ctx = LedgerContext::new();
        assert!(ctx.ledger.account_info(&Account::new([9; 32])).is_none());
    }
}
