//! Blocks of the account lattice.
//!
//! Every account owns a chain of blocks. Each block records the account's
//! full balance and representative after it is applied, so a representative's
//! weight is simply the sum of the balances delegated to it.

use crate::{Account, BlockHash, Link, QualifiedRoot, Root, Timestamp};
use lattice_crypto::blake2b_256_multi;
use serde::{Deserialize, Serialize};

/// What a block does to its account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    /// First block of an account; receives `link` as its source.
    Open,
    /// Lowers the balance; `link` is the destination account.
    Send,
    /// Raises the balance; `link` is the source send.
    Receive,
    /// Changes the representative only.
    Change,
    /// Upgrades the account's epoch; `link` is the epoch marker.
    Epoch,
}

impl BlockKind {
    fn tag(self) -> u8 {
        match self {
            Self::Open => 1,
            Self::Send => 2,
            Self::Receive => 3,
            Self::Change => 4,
            Self::Epoch => 5,
        }
    }
}

/// Ledger epoch of an account. Later epochs carry different work thresholds.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Epoch {
    #[default]
    Epoch0,
    Epoch1,
    Epoch2,
}

impl Epoch {
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Epoch0 => Some(Self::Epoch1),
            Self::Epoch1 => Some(Self::Epoch2),
            Self::Epoch2 => None,
        }
    }
}

/// Facts about a block that select its proof-of-work threshold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDetails {
    pub epoch: Epoch,
    pub is_send: bool,
    pub is_receive: bool,
    pub is_epoch: bool,
}

impl BlockDetails {
    pub fn new(epoch: Epoch, is_send: bool, is_receive: bool, is_epoch: bool) -> Self {
        Self {
            epoch,
            is_send,
            is_receive,
            is_epoch,
        }
    }
}

/// Metadata attached by the ledger once a block is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSideband {
    /// 1-based position in the account chain.
    pub height: u64,
    pub details: BlockDetails,
    pub timestamp: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    kind: BlockKind,
    account: Account,
    previous: BlockHash,
    representative: Account,
    balance: u128,
    link: Link,
    work: u64,
    hash: BlockHash,
    sideband: Option<BlockSideband>,
}

impl Block {
    pub fn new(
        kind: BlockKind,
        account: Account,
        previous: BlockHash,
        representative: Account,
        balance: u128,
        link: Link,
        work: u64,
    ) -> Self {
        let hash = BlockHash::new(blake2b_256_multi(&[
            &[kind.tag()],
            account.as_bytes(),
            previous.as_bytes(),
            representative.as_bytes(),
            &balance.to_be_bytes(),
            link.as_bytes(),
        ]));
        Self {
            kind,
            account,
            previous,
            representative,
            balance,
            link,
            work,
            hash,
            sideband: None,
        }
    }

    /// Same block carrying a different work value. The hash is unchanged.
    pub fn with_work(&self, work: u64) -> Self {
        Self {
            work,
            ..self.clone()
        }
    }

    pub fn hash(&self) -> BlockHash {
        self.hash
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn account(&self) -> Account {
        self.account
    }

    pub fn previous(&self) -> BlockHash {
        self.previous
    }

    pub fn representative(&self) -> Account {
        self.representative
    }

    pub fn balance(&self) -> u128 {
        self.balance
    }

    pub fn link(&self) -> Link {
        self.link
    }

    pub fn work(&self) -> u64 {
        self.work
    }

    pub fn is_open(&self) -> bool {
        self.previous.is_zero()
    }

    /// The value proof-of-work is computed against.
    pub fn root(&self) -> Root {
        if self.is_open() {
            Root::from(self.account)
        } else {
            Root::from(self.previous)
        }
    }

    pub fn qualified_root(&self) -> QualifiedRoot {
        QualifiedRoot::new(self.root(), self.previous)
    }

    /// Source send for receive and open blocks.
    pub fn source(&self) -> Option<BlockHash> {
        match self.kind {
            BlockKind::Open | BlockKind::Receive => Some(self.link.as_block_hash()),
            _ => None,
        }
    }

    /// Destination account for send blocks.
    pub fn destination(&self) -> Option<Account> {
        match self.kind {
            BlockKind::Send => Some(self.link.as_account()),
            _ => None,
        }
    }

    pub fn sideband(&self) -> Option<&BlockSideband> {
        self.sideband.as_ref()
    }

    pub fn set_sideband(&mut self, sideband: BlockSideband) {
        self.sideband = Some(sideband);
    }

    /// Height from the sideband, 0 if the block was never applied.
    pub fn height(&self) -> u64 {
        self.sideband.map(|s| s.height).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(byte: u8) -> Account {
        Account::new([byte; 32])
    }

    fn send(previous: BlockHash, work: u64) -> Block {
        Block::new(
            BlockKind::Send,
            account(1),
            previous,
            account(1),
            100,
            Link::from(account(2)),
            work,
        )
    }

    #[test]
    fn work_is_not_part_of_hash() {
        let block = send(BlockHash::new([9; 32]), 1);
        assert_eq!(block.hash(), block.with_work(2).hash());
        assert_eq!(block.with_work(2).work(), 2);
    }

    #[test]
    fn hash_covers_balance() {
        let a = send(BlockHash::new([9; 32]), 1);
        let b = Block::new(
            BlockKind::Send,
            account(1),
            BlockHash::new([9; 32]),
            account(1),
            99,
            Link::from(account(2)),
            1,
        );
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn open_block_is_rooted_at_account() {
        let open = Block::new(
            BlockKind::Open,
            account(3),
            BlockHash::ZERO,
            account(3),
            10,
            Link::from(BlockHash::new([4; 32])),
            0,
        );
        assert_eq!(open.root(), Root::from(account(3)));
        assert_eq!(open.qualified_root().previous, BlockHash::ZERO);
        assert_eq!(open.source(), Some(BlockHash::new([4; 32])));
        assert_eq!(open.destination(), None);
    }

    #[test]
    fn successor_is_rooted_at_previous() {
        let previous = BlockHash::new([5; 32]);
        let block = send(previous, 0);
        assert_eq!(block.root(), Root::from(previous));
        assert_eq!(block.destination(), Some(account(2)));
        assert_eq!(block.height(), 0);
    }

    #[test]
    fn sideband_survives_serde() {
        let mut block = send(BlockHash::new([5; 32]), 7);
        block.set_sideband(BlockSideband {
            height: 3,
            details: BlockDetails::new(Epoch::Epoch1, true, false, false),
            timestamp: Timestamp::new(10),
        });
        let json = serde_json::to_string(&block).unwrap();
        let back: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(back, block);
        assert_eq!(back.height(), 3);
    }

    #[test]
    fn epochs_advance_in_order() {
        assert_eq!(Epoch::Epoch0.next(), Some(Epoch::Epoch1));
        assert_eq!(Epoch::Epoch2.next(), None);
        assert!(Epoch::Epoch2 > Epoch::Epoch1);
    }
}
