//! Representative weights, maintained incrementally as blocks are applied.
//!
//! Every account's balance is delegated to the representative named in its
//! head block, so a representative's weight is the sum of those balances.

use lattice_types::Account;
use std::collections::HashMap;

/// Anything that can report a representative's voting weight.
pub trait WeightOracle: Send + Sync {
    fn weight(&self, representative: &Account) -> u128;
}

impl WeightOracle for HashMap<Account, u128> {
    fn weight(&self, representative: &Account) -> u128 {
        self.get(representative).copied().unwrap_or(0)
    }
}

#[derive(Default)]
pub struct RepWeights {
    weights: HashMap<Account, u128>,
    total_weight: u128,
}

impl RepWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_weight(&mut self, rep: &Account, weight: u128) {
        if weight == 0 {
            return;
        }
        let entry = self.weights.entry(*rep).or_insert(0);
        *entry = entry.saturating_add(weight);
        self.total_weight = self.total_weight.saturating_add(weight);
    }

    pub fn remove_weight(&mut self, rep: &Account, weight: u128) {
        if let Some(entry) = self.weights.get_mut(rep) {
            let removed = weight.min(*entry);
            *entry -= removed;
            self.total_weight = self.total_weight.saturating_sub(removed);
            if *entry == 0 {
                self.weights.remove(rep);
            }
        }
    }

    /// Move an account's delegation after one of its blocks is applied or undone.
    pub fn redelegate(
        &mut self,
        old_rep: &Account,
        old_balance: u128,
        new_rep: &Account,
        new_balance: u128,
    ) {
        self.remove_weight(old_rep, old_balance);
        self.add_weight(new_rep, new_balance);
    }

    pub fn weight(&self, rep: &Account) -> u128 {
        self.weights.get(rep).copied().unwrap_or(0)
    }

    pub fn total_weight(&self) -> u128 {
        self.total_weight
    }

    pub fn rep_count(&self) -> usize {
        self.weights.len()
    }

    /// Rebuild from `(representative, balance)` pairs of every account.
    pub fn rebuild(&mut self, delegations: impl IntoIterator<Item = (Account, u128)>) {
        self.weights.clear();
        self.total_weight = 0;
        for (rep, balance) in delegations {
            self.add_weight(&rep, balance);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rep(byte: u8) -> Account {
        Account::new([byte; 32])
    }

    #[test]
    fn add_and_remove() {
        let mut weights = RepWeights::new();
        weights.add_weight(&rep(1), 100);
        weights.add_weight(&rep(1), 50);
        weights.remove_weight(&rep(1), 30);
        assert_eq!(weights.weight(&rep(1)), 120);
        assert_eq!(weights.total_weight(), 120);
    }

    #[test]
    fn removing_everything_forgets_rep() {
        let mut weights = RepWeights::new();
        weights.add_weight(&rep(1), 10);
        weights.remove_weight(&rep(1), 10);
        assert_eq!(weights.rep_count(), 0);
        assert_eq!(weights.weight(&rep(1)), 0);
    }

    #[test]
    fn remove_is_capped() {
        let mut weights = RepWeights::new();
        weights.add_weight(&rep(1), 10);
        weights.add_weight(&rep(2), 10);
        weights.remove_weight(&rep(1), 50);
        assert_eq!(weights.total_weight(), 10);
    }

    #[test]
    fn redelegate_moves_balance() {
        let mut weights = RepWeights::new();
        weights.add_weight(&rep(1), 100);
        weights.redelegate(&rep(1), 100, &rep(2), 60);
        assert_eq!(weights.weight(&rep(1)), 0);
        assert_eq!(weights.weight(&rep(2)), 60);
        assert_eq!(weights.total_weight(), 60);
    }

    #[test]
    fn rebuild_sums_delegations() {
        let mut weights = RepWeights::new();
        weights.add_weight(&rep(9), 1);
        weights.rebuild([(rep(1), 5), (rep(1), 7), (rep(2), 3)]);
        assert_eq!(weights.weight(&rep(1)), 12);
        assert_eq!(weights.weight(&rep(9)), 0);
        assert_eq!(weights.total_weight(), 15);
    }

    #[test]
    fn map_oracle_defaults_to_zero() {
        let map: HashMap<Account, u128> = [(rep(1), 4)].into_iter().collect();
        assert_eq!(map.weight(&rep(1)), 4);
        assert_eq!(map.weight(&rep(2)), 0);
    }
}
