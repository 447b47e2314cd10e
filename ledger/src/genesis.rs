//! Per-network ledger constants: genesis block, epoch markers, work thresholds.
//!
//! The genesis block opens the genesis account with the entire supply. Its
//! account is derived from the network name so each network has a distinct,
//! deterministic genesis hash.

use std::sync::Arc;

use lattice_crypto::blake2b_256;
use lattice_types::{
    Account, Block, BlockDetails, BlockHash, BlockKind, BlockSideband, Epoch, Link, NetworkId,
    Timestamp,
};
use lattice_work::WorkThresholds;

#[derive(Clone, Debug)]
pub struct LedgerConstants {
    pub network: NetworkId,
    pub genesis: Arc<Block>,
    pub genesis_account: Account,
    pub genesis_amount: u128,
    pub epoch_1_link: Link,
    pub epoch_2_link: Link,
    pub thresholds: WorkThresholds,
}

impl LedgerConstants {
    pub fn for_network(network: NetworkId) -> Self {
        Self::with_thresholds(network, WorkThresholds::for_network(network))
    }

    /// Dev network where a block's work value is its difficulty.
    pub fn unit_test() -> Self {
        Self::with_thresholds(NetworkId::Dev, WorkThresholds::new_stub())
    }

    pub fn with_thresholds(network: NetworkId, thresholds: WorkThresholds) -> Self {
        let genesis_account = genesis_account(network);
        let genesis_amount = u128::MAX;
        let mut genesis = Block::new(
            BlockKind::Open,
            genesis_account,
            BlockHash::ZERO,
            genesis_account,
            genesis_amount,
            Link::from(genesis_account),
            0,
        );
        genesis.set_sideband(BlockSideband {
            height: 1,
            details: BlockDetails::new(Epoch::Epoch0, false, false, false),
            timestamp: Timestamp::EPOCH,
        });
        Self {
            network,
            genesis: Arc::new(genesis),
            genesis_account,
            genesis_amount,
            epoch_1_link: epoch_link(b"epoch v1 block"),
            epoch_2_link: epoch_link(b"epoch v2 block"),
            thresholds,
        }
    }

    /// Marker an epoch block must carry to upgrade an account to `epoch`.
    pub fn epoch_link(&self, epoch: Epoch) -> Option<Link> {
        match epoch {
            Epoch::Epoch0 => None,
            Epoch::Epoch1 => Some(self.epoch_1_link),
            Epoch::Epoch2 => Some(self.epoch_2_link),
        }
    }
}

fn genesis_account(network: NetworkId) -> Account {
    Account::new(blake2b_256(
        format!("lattice genesis {}", network.as_str()).as_bytes(),
    ))
}

fn epoch_link(marker: &[u8]) -> Link {
    let mut bytes = [0u8; 32];
    bytes[..marker.len()].copy_from_slice(marker);
    Link::new(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn networks_have_distinct_genesis() {
        let live = LedgerConstants::for_network(NetworkId::Live);
        let dev = LedgerConstants::for_network(NetworkId::Dev);
        assert_ne!(live.genesis.hash(), dev.genesis.hash());
        assert_ne!(live.genesis_account, dev.genesis_account);
    }

    #[test]
    fn genesis_holds_supply_at_height_one() {
        let constants = LedgerConstants::unit_test();
        assert_eq!(constants.genesis.balance(), u128::MAX);
        assert_eq!(constants.genesis.height(), 1);
        assert!(constants.genesis.is_open());
    }

    #[test]
    fn epoch_links() {
        let constants = LedgerConstants::unit_test();
        assert_eq!(constants.epoch_link(Epoch::Epoch0), None);
        assert_ne!(
            constants.epoch_link(Epoch::Epoch1),
            constants.epoch_link(Epoch::Epoch2)
        );
    }
}
