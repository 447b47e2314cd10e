//! Online weight sampling: which representatives are actively voting.
//!
//! Quorum is measured against *online* voting weight, not total delegated
//! weight. A representative counts as online if it voted within the sampling
//! window. Two safeguards keep quorum from collapsing when few votes arrive:
//! a configured minimum, and an exponentially smoothed trend of past samples.

use std::collections::HashMap;

use lattice_ledger::WeightOracle;
use lattice_types::{Account, Timestamp};

/// Decay percentage for the trend (95 keeps 95% of the old value per sample).
const TREND_DECAY_PCT: u128 = 95;

pub struct OnlineWeightSampler {
    /// Representative to the time of its latest vote.
    recent_voters: HashMap<Account, Timestamp>,
    window_secs: u64,
    trended_weight: u128,
    min_weight: u128,
}

impl OnlineWeightSampler {
    pub fn new(window_secs: u64, min_weight: u128) -> Self {
        Self {
            recent_voters: HashMap::new(),
            window_secs,
            trended_weight: 0,
            min_weight,
        }
    }

    /// Record a vote by `rep`. Older timestamps never overwrite newer ones.
    pub fn observe(&mut self, rep: &Account, now: Timestamp) {
        let entry = self.recent_voters.entry(*rep).or_insert(now);
        if now > *entry {
            *entry = now;
        }
    }

    pub fn online_representatives(&self, now: Timestamp) -> Vec<Account> {
        self.recent_voters
            .iter()
            .filter(|(_, last)| !last.has_expired(self.window_secs, now))
            .map(|(rep, _)| *rep)
            .collect()
    }

    /// Summed weight of the representatives that voted within the window.
    pub fn online_weight(&self, now: Timestamp, weights: &dyn WeightOracle) -> u128 {
        self.recent_voters
            .iter()
            .filter(|(_, last)| !last.has_expired(self.window_secs, now))
            .fold(0u128, |sum, (rep, _)| sum.saturating_add(weights.weight(rep)))
    }

    /// Fold a new online weight sample into the trend.
    pub fn update_trend(&mut self, current_online_weight: u128) {
        if self.trended_weight == 0 {
            self.trended_weight = current_online_weight;
        } else {
            self.trended_weight = (self.trended_weight / 100 * TREND_DECAY_PCT)
                .saturating_add(current_online_weight / 100 * (100 - TREND_DECAY_PCT));
        }
    }

    /// Sample the current online weight into the trend and prune stale voters.
    pub fn sample(&mut self, now: Timestamp, weights: &dyn WeightOracle) {
        let current = self.online_weight(now, weights);
        self.update_trend(current);
        self.prune(now);
    }

    /// `max(current, trend, minimum)`.
    pub fn effective_weight(&self, now: Timestamp, weights: &dyn WeightOracle) -> u128 {
        self.online_weight(now, weights)
            .max(self.trended_weight)
            .max(self.min_weight)
    }

    pub fn trended_weight(&self) -> u128 {
        self.trended_weight
    }

    pub fn min_weight(&self) -> u128 {
        self.min_weight
    }

    pub fn prune(&mut self, now: Timestamp) {
        let window = self.window_secs;
        self.recent_voters
            .retain(|_, last| !last.has_expired(window, now));
    }

    /// Tracked representatives, including stale ones not yet pruned.
    pub fn tracked_count(&self) -> usize {
        self.recent_voters.len()
    }
}
