//! 32-byte identifiers: accounts, block hashes, roots and block links.

use crate::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! bytes32 {
    ($name:ident) => {
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name([u8; 32]);

        impl $name {
            pub const ZERO: Self = Self([0u8; 32]);
            pub const MAX: Self = Self([0xffu8; 32]);

            pub const fn new(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == [0u8; 32]
            }

            /// Build a value whose trailing 8 bytes hold `value` big-endian.
            pub fn from_u64(value: u64) -> Self {
                let mut bytes = [0u8; 32];
                bytes[24..].copy_from_slice(&value.to_be_bytes());
                Self(bytes)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}\u{2026})", stringify!($name), hex::encode(&self.0[..4]))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&hex::encode_upper(self.0))
            }
        }

        impl FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = hex::decode(s).map_err(|e| TypesError::InvalidHex(e.to_string()))?;
                let bytes: [u8; 32] = bytes.try_into().map_err(|v: Vec<u8>| {
                    TypesError::InvalidLength {
                        expected: 32,
                        actual: v.len(),
                    }
                })?;
                Ok(Self(bytes))
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }
    };
}

bytes32!(Account);
bytes32!(BlockHash);
bytes32!(Link);
bytes32!(Root);

impl Account {
    /// Synthetic voter that seeds every election with its initial winner.
    ///
    /// No key can produce it, so it never carries delegated weight.
    pub const NOT_AN_ACCOUNT: Self = Self([
        0x4e, 0x4f, 0x54, 0x2d, 0x41, 0x4e, 0x2d, 0x41, 0x43, 0x43, 0x4f, 0x55, 0x4e, 0x54, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x01,
    ]);
}

impl Link {
    /// Interpret the link as a send destination.
    pub fn as_account(&self) -> Account {
        Account(self.0)
    }

    /// Interpret the link as a receive/open source.
    pub fn as_block_hash(&self) -> BlockHash {
        BlockHash(self.0)
    }
}

impl From<Account> for Link {
    fn from(account: Account) -> Self {
        Self(account.0)
    }
}

impl From<BlockHash> for Root {
    fn from(hash: BlockHash) -> Self {
        Self(hash.0)
    }
}

impl From<Account> for Root {
    fn from(account: Account) -> Self {
        Self(account.0)
    }
}

impl From<BlockHash> for Link {
    fn from(hash: BlockHash) -> Self {
        Self(hash.0)
    }
}
