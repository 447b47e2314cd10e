//! Identity of a contested chain position.

use crate::{BlockHash, Root};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `(root, previous)` pair. Two blocks compete when they share it.
///
/// For an open block the root is the account and `previous` is zero; for
/// every other block both halves are the previous block's hash.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QualifiedRoot {
    pub root: Root,
    pub previous: BlockHash,
}

impl QualifiedRoot {
    pub fn new(root: Root, previous: BlockHash) -> Self {
        Self { root, previous }
    }
}

impl fmt::Debug for QualifiedRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QualifiedRoot({:?}, {:?})", self.root, self.previous)
    }
}

impl fmt::Display for QualifiedRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.root, self.previous)
    }
}
