//! Scheduling priority of active elections.
//!
//! An election's adjusted multiplier starts from its winner's normalized
//! work multiplier and is scaled by:
//! - chain weight: `1 + min(balance / online_weight, 1)`
//! - blocking: `1 + 0.1` per active election that depends on it, capped at `2`
//!
//! Dependency order dominates work: an election whose winner depends on
//! another active election's winner (through `previous` or a receive's
//! source) never ranks above that election.

use std::collections::HashMap;

use lattice_types::{BlockHash, QualifiedRoot};

const BLOCKING_STEP: f64 = 0.1;
const BLOCKING_CAP: f64 = 2.0;
const DEPENDENT_DISCOUNT: f64 = 0.99;

/// What the priority of one election is computed from.
#[derive(Clone, Debug)]
pub struct PriorityInput {
    pub root: QualifiedRoot,
    pub winner: BlockHash,
    /// Previous and source hashes of the winner.
    pub dependencies: Vec<BlockHash>,
    pub multiplier: f64,
    pub balance: u128,
}

pub fn weight_factor(balance: u128, online_weight: u128) -> f64 {
    if online_weight == 0 {
        return 1.0;
    }
    1.0 + (balance as f64 / online_weight as f64).min(1.0)
}

pub fn blocking_factor(dependents: usize) -> f64 {
    (1.0 + BLOCKING_STEP * dependents as f64).min(BLOCKING_CAP)
}

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    Pending,
    InProgress,
    Done(f64),
}

struct Graph<'a> {
    inputs: &'a [PriorityInput],
    parents: Vec<Vec<usize>>,
    base: Vec<f64>,
    visits: Vec<Visit>,
}

impl Graph<'_> {
    fn adjusted(&mut self, index: usize) -> f64 {
        match self.visits[index] {
            Visit::Done(value) => return value,
            // a cycle cannot occur between real blocks; treat it as a root
            Visit::InProgress => return self.base[index],
            Visit::Pending => {}
        }
        self.visits[index] = Visit::InProgress;
        let mut value = self.base[index];
        let parents = self.parents[index].clone();
        if !parents.is_empty() {
            for parent in parents {
                value = value.min(self.adjusted(parent));
            }
            value *= DEPENDENT_DISCOUNT;
        }
        self.visits[index] = Visit::Done(value);
        value
    }
}

/// Adjusted multiplier for every input election.
pub fn adjusted_multipliers(
    inputs: &[PriorityInput],
    online_weight: u128,
) -> HashMap<QualifiedRoot, f64> {
    let by_hash: HashMap<BlockHash, usize> = inputs
        .iter()
        .enumerate()
        .map(|(i, input)| (input.winner, i))
        .collect();

    let mut dependents = vec![0usize; inputs.len()];
    let parents: Vec<Vec<usize>> = inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            let mut found: Vec<usize> = input
                .dependencies
                .iter()
                .filter_map(|hash| by_hash.get(hash).copied())
                .filter(|parent| *parent != i)
                .collect();
            found.dedup();
            found
        })
        .collect();
    for found in &parents {
        for parent in found {
            dependents[*parent] += 1;
        }
    }

    let base = inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            input.multiplier
                * weight_factor(input.balance, online_weight)
                * blocking_factor(dependents[i])
        })
        .collect();

    let mut graph = Graph {
        inputs,
        parents,
        base,
        visits: vec![Visit::Pending; inputs.len()],
    };
    (0..inputs.len())
        .map(|i| {
            let value = graph.adjusted(i);
            (graph.inputs[i].root, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_types::Root;

    fn make_hash(byte: u8) -> BlockHash {
        BlockHash::new([byte; 32])
    }

    fn input(byte: u8, dependencies: &[u8], multiplier: f64, balance: u128) -> PriorityInput {
        PriorityInput {
            root: QualifiedRoot::new(Root::new([byte; 32]), make_hash(byte)),
            winner: make_hash(byte + 100),
            dependencies: dependencies.iter().map(|d| make_hash(d + 100)).collect(),
            multiplier,
            balance,
        }
    }

    fn root(byte: u8) -> QualifiedRoot {
        QualifiedRoot::new(Root::new([byte; 32]), make_hash(byte))
    }

    #[test]
    fn higher_work_wins_when_otherwise_equal() {
        let adjusted = adjusted_multipliers(&[input(1, &[], 2.0, 10), input(2, &[], 1.5, 10)], 100);
        assert!(adjusted[&root(1)] > adjusted[&root(2)]);
    }

    #[test]
    fn heavier_chain_ranks_higher() {
        let adjusted = adjusted_multipliers(&[input(1, &[], 1.0, 90), input(2, &[], 1.0, 10)], 100);
        assert!(adjusted[&root(1)] > adjusted[&root(2)]);
    }

    #[test]
    fn dependents_rank_below_parents() {
        // 2 depends on 1, 3 depends on 2; dependents carry more work
        let adjusted = adjusted_multipliers(
            &[
                input(1, &[], 1.0, 10),
                input(2, &[1], 8.0, 10),
                input(3, &[2], 16.0, 10),
            ],
            100,
        );
        assert!(adjusted[&root(2)] < adjusted[&root(1)]);
        assert!(adjusted[&root(3)] < adjusted[&root(2)]);
    }

    #[test]
    fn blocking_elections_get_boost() {
        let adjusted = adjusted_multipliers(
            &[
                input(1, &[], 1.0, 10),
                input(2, &[], 1.0, 10),
                input(3, &[1], 1.0, 10),
            ],
            100,
        );
        assert!(adjusted[&root(1)] > adjusted[&root(2)]);
    }

    #[test]
    fn unknown_dependencies_are_ignored() {
        let adjusted = adjusted_multipliers(&[input(1, &[50], 3.0, 0)], 0);
        assert_eq!(adjusted[&root(1)], 3.0);
    }

    #[test]
    fn factors() {
        assert_eq!(weight_factor(5, 0), 1.0);
        assert_eq!(weight_factor(500, 100), 2.0);
        assert_eq!(blocking_factor(0), 1.0);
        assert_eq!(blocking_factor(50), 2.0);
    }
}
