//! Per-account cemented height.

use crate::StoreError;
use lattice_types::{Account, BlockHash};
use serde::{Deserialize, Serialize};

/// How far an account chain is permanently confirmed.
///
/// `height` only grows and `frontier` is the block at that height. An
/// account with nothing cemented has height 0 and a zero frontier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationHeightInfo {
    pub height: u64,
    pub frontier: BlockHash,
}

impl ConfirmationHeightInfo {
    pub fn new(height: u64, frontier: BlockHash) -> Self {
        Self { height, frontier }
    }
}

pub trait ConfirmationHeightStore {
    fn get_confirmation_height(
        &self,
        account: &Account,
    ) -> Result<ConfirmationHeightInfo, StoreError>;

    fn put_confirmation_height(
        &self,
        account: &Account,
        info: &ConfirmationHeightInfo,
    ) -> Result<(), StoreError>;

    fn delete_confirmation_height(&self, account: &Account) -> Result<(), StoreError>;
}
