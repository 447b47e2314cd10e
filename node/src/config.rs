//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};

use lattice_consensus::ActiveElectionsConfig;
use lattice_types::NetworkId;

use crate::confirmation_height::ConfirmationHeightMode;
use crate::NodeError;

/// Configuration for a lattice node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Selects genesis and work thresholds.
    #[serde(default)]
    pub network: NetworkId,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Period of the confirmation request loop.
    #[serde(default = "default_confirmation_request_interval_ms")]
    pub confirmation_request_interval_ms: u64,

    /// Period of pending dependency activation.
    #[serde(default = "default_dependency_activation_interval_ms")]
    pub dependency_activation_interval_ms: u64,

    #[serde(default)]
    pub active_elections: ActiveElectionsConfig,

    #[serde(default)]
    pub confirmation_height: ConfirmationHeightConfig,
}

/// Cementing strategy and batch limits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationHeightConfig {
    #[serde(default)]
    pub mode: ConfirmationHeightMode,

    /// Blocks written per batch in bounded mode.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Automatic mode stays unbounded while fewer blocks than this are uncemented.
    #[serde(default = "default_unbounded_cutoff")]
    pub unbounded_cutoff: u64,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_confirmation_request_interval_ms() -> u64 {
    500
}

fn default_dependency_activation_interval_ms() -> u64 {
    1_000
}

fn default_batch_size() -> usize {
    1024
}

fn default_unbounded_cutoff() -> u64 {
    16384
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Dev network with small election limits and no online weight floor.
    pub fn dev() -> Self {
        Self {
            network: NetworkId::Dev,
            active_elections: ActiveElectionsConfig::dev(),
            ..Self::default()
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: NetworkId::default(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            confirmation_request_interval_ms: default_confirmation_request_interval_ms(),
            dependency_activation_interval_ms: default_dependency_activation_interval_ms(),
            active_elections: ActiveElectionsConfig::default(),
            confirmation_height: ConfirmationHeightConfig::default(),
        }
    }
}

impl Default for ConfirmationHeightConfig {
    fn default() -> Self {
        Self {
            mode: ConfirmationHeightMode::default(),
            batch_size: default_batch_size(),
            unbounded_cutoff: default_unbounded_cutoff(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.network, NetworkId::Dev);
        assert_eq!(config.confirmation_request_interval_ms, 500);
        assert_eq!(config.confirmation_height.mode, ConfirmationHeightMode::Automatic);
        assert_eq!(config.active_elections.size, 5000);
    }

    #[test]
    fn nested_tables_override() {
        let toml = r#"
            network = "test"
            log_format = "json"

            [active_elections]
            size = 12
            online_weight_minimum = "1000"

            [confirmation_height]
            mode = "bounded"
            batch_size = 3
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.network, NetworkId::Test);
        assert_eq!(config.log_format, "json");
        assert_eq!(config.active_elections.size, 12);
        assert_eq!(config.active_elections.online_weight_minimum, 1000);
        assert_eq!(config.active_elections.quorum_percent, 67);
        assert_eq!(config.confirmation_height.mode, ConfirmationHeightMode::Bounded);
        assert_eq!(config.confirmation_height.batch_size, 3);
        assert_eq!(config.confirmation_height.unbounded_cutoff, 16384);
    }

    #[test]
    fn reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = \"debug\"").unwrap();
        let config = NodeConfig::from_toml_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = NodeConfig::from_toml_file("/nonexistent/lattice.toml");
        assert!(matches!(result, Err(NodeError::Config(_))));
    }
}
