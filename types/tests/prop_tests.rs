use proptest::prelude::*;

use lattice_types::{Account, Block, BlockHash, BlockKind, Link, Root};

proptest! {
    /// Hex display parses back to the same hash.
    #[test]
    fn block_hash_display_parses(bytes in prop::array::uniform32(0u8..)) {
        let hash = BlockHash::new(bytes);
        let parsed: BlockHash = hash.to_string().parse().unwrap();
        prop_assert_eq!(parsed, hash);
    }

    /// is_zero is true only for all-zero bytes.
    #[test]
    fn account_is_zero_correct(bytes in prop::array::uniform32(0u8..)) {
        prop_assert_eq!(Account::new(bytes).is_zero(), bytes == [0u8; 32]);
    }

    /// A block's root is its previous hash unless it opens the account.
    #[test]
    fn root_follows_previous(prev in prop::array::uniform32(0u8..), balance in any::<u128>()) {
        let previous = BlockHash::new(prev);
        let account = Account::new([3; 32]);
        let block = Block::new(BlockKind::Change, account, previous, account, balance, Link::ZERO, 0);
        let expected = if previous.is_zero() { Root::from(account) } else { Root::from(previous) };
        prop_assert_eq!(block.root(), expected);
        prop_assert_eq!(block.qualified_root().previous, previous);
    }
}
