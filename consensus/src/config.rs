//! Election manager tuning.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Limits and thresholds of the election manager.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActiveElectionsConfig {
    /// Maximum number of concurrent elections.
    #[serde(default = "default_size")]
    pub size: usize,

    /// Share of elections, by adjusted multiplier, that get confirmation requests.
    #[serde(default = "default_prioritized_fraction")]
    pub prioritized_fraction: f64,

    #[serde(default = "default_recently_confirmed_size")]
    pub recently_confirmed_size: usize,

    #[serde(default = "default_recently_dropped_size")]
    pub recently_dropped_size: usize,

    #[serde(default = "default_recently_cemented_size")]
    pub recently_cemented_size: usize,

    /// Hashes held by the inactive vote cache.
    #[serde(default = "default_vote_cache_size")]
    pub vote_cache_size: usize,

    #[serde(default = "default_vote_cache_max_voters")]
    pub vote_cache_max_voters: usize,

    /// Confirmed multipliers averaged into the trended active multiplier.
    #[serde(default = "default_multiplier_samples")]
    pub multiplier_samples: usize,

    /// How long a confirmed election may wait for cementing before it is retired.
    #[serde(default = "default_confirmed_grace_secs")]
    pub confirmed_grace_secs: u64,

    #[serde(default = "default_quorum_percent")]
    pub quorum_percent: u8,

    /// Floor for the online weight used in quorum, in raw units.
    #[serde(
        default = "default_online_weight_minimum",
        serialize_with = "serialize_u128",
        deserialize_with = "deserialize_u128"
    )]
    pub online_weight_minimum: u128,

    #[serde(default = "default_online_window_secs")]
    pub online_window_secs: u64,

    /// Competing blocks one election accepts.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_size() -> usize {
    5000
}

fn default_prioritized_fraction() -> f64 {
    0.1
}

fn default_recently_confirmed_size() -> usize {
    65536
}

fn default_recently_dropped_size() -> usize {
    65536
}

fn default_recently_cemented_size() -> usize {
    1024
}

fn default_vote_cache_size() -> usize {
    16384
}

fn default_vote_cache_max_voters() -> usize {
    64
}

fn default_multiplier_samples() -> usize {
    20
}

fn default_confirmed_grace_secs() -> u64 {
    5
}

fn default_quorum_percent() -> u8 {
    67
}

fn default_online_weight_minimum() -> u128 {
    60_000_000 * 10u128.pow(30)
}

fn default_online_window_secs() -> u64 {
    300
}

fn default_max_candidates() -> usize {
    10
}

// TOML integers are 64-bit, so raw amounts travel as strings.
fn serialize_u128<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

fn deserialize_u128<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
    let s = String::deserialize(deserializer)?;
    s.parse().map_err(serde::de::Error::custom)
}

impl ActiveElectionsConfig {
    /// Small limits and no online weight floor, for tests.
    pub fn dev() -> Self {
        Self {
            size: 50,
            online_weight_minimum: 0,
            confirmed_grace_secs: 5,
            ..Self::default()
        }
    }
}

impl Default for ActiveElectionsConfig {
    fn default() -> Self {
        Self {
            size: default_size(),
            prioritized_fraction: default_prioritized_fraction(),
            recently_confirmed_size: default_recently_confirmed_size(),
            recently_dropped_size: default_recently_dropped_size(),
            recently_cemented_size: default_recently_cemented_size(),
            vote_cache_size: default_vote_cache_size(),
            vote_cache_max_voters: default_vote_cache_max_voters(),
            multiplier_samples: default_multiplier_samples(),
            confirmed_grace_secs: default_confirmed_grace_secs(),
            quorum_percent: default_quorum_percent(),
            online_weight_minimum: default_online_weight_minimum(),
            online_window_secs: default_online_window_secs(),
            max_candidates: default_max_candidates(),
        }
    }
}
