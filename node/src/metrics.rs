//! Prometheus metrics for the lattice node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`]. Gauges are refreshed from
//! the election manager, the ledger and the event counters on demand, then
//! encoded in the Prometheus text exposition format.

use prometheus::{
    register_gauge_with_registry, register_int_gauge_vec_with_registry,
    register_int_gauge_with_registry, Encoder, Gauge, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};

use lattice_consensus::ActiveElections;
use lattice_ledger::Ledger;
use lattice_utils::Stats;

use crate::confirmation_height::ConfirmationHeightProcessor;
use crate::NodeError;

pub struct NodeMetrics {
    pub registry: Registry,

    // ── Consensus ───────────────────────────────────────────────────────
    pub active_elections: IntGauge,
    pub trended_active_multiplier: Gauge,
    pub vote_cache_size: IntGauge,

    // ── Ledger ──────────────────────────────────────────────────────────
    pub block_count: IntGauge,
    pub cemented_blocks: IntGauge,
    /// Targets waiting for the confirmation height processor.
    pub confirmation_height_queue: IntGauge,

    /// Event counters by name, mirrored from [`Stats`].
    pub stats: IntGaugeVec,
}

impl NodeMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let active_elections = register_int_gauge_with_registry!(
            Opts::new("lattice_active_elections", "Elections currently running"),
            registry
        )
        .expect("failed to register active_elections gauge");

        let trended_active_multiplier = register_gauge_with_registry!(
            Opts::new(
                "lattice_trended_active_multiplier",
                "Average work multiplier of prioritized elections"
            ),
            registry
        )
        .expect("failed to register trended_active_multiplier gauge");

        let vote_cache_size = register_int_gauge_with_registry!(
            Opts::new(
                "lattice_vote_cache_size",
                "Hashes with votes waiting for an election"
            ),
            registry
        )
        .expect("failed to register vote_cache_size gauge");

        let block_count = register_int_gauge_with_registry!(
            Opts::new("lattice_block_count", "Blocks in the ledger"),
            registry
        )
        .expect("failed to register block_count gauge");

        let cemented_blocks = register_int_gauge_with_registry!(
            Opts::new("lattice_cemented_blocks", "Blocks at or below their confirmation height"),
            registry
        )
        .expect("failed to register cemented_blocks gauge");

        let confirmation_height_queue = register_int_gauge_with_registry!(
            Opts::new(
                "lattice_confirmation_height_queue",
                "Confirmed blocks waiting to be cemented"
            ),
            registry
        )
        .expect("failed to register confirmation_height_queue gauge");

        let stats_by_name = register_int_gauge_vec_with_registry!(
            Opts::new("lattice_stat", "Consensus and cementing event counts"),
            &["name"],
            registry
        )
        .expect("failed to register stat gauge");

        Self {
            registry,
            active_elections,
            trended_active_multiplier,
            vote_cache_size,
            block_count,
            cemented_blocks,
            confirmation_height_queue,
            stats: stats_by_name,
        }
    }

    pub fn refresh(
        &self,
        active: &ActiveElections,
        ledger: &Ledger,
        processor: &ConfirmationHeightProcessor,
        stats: &Stats,
    ) {
        self.active_elections.set(active.len() as i64);
        self.trended_active_multiplier
            .set(active.trended_active_multiplier());
        self.vote_cache_size.set(active.vote_cache_len() as i64);
        self.block_count.set(ledger.block_count() as i64);
        self.cemented_blocks.set(ledger.cemented_count() as i64);
        self.confirmation_height_queue
            .set(processor.awaiting_processing_len() as i64);
        for (name, count) in stats.snapshot() {
            self.stats.with_label_values(&[name]).set(count as i64);
        }
    }

    /// Text exposition of every registered metric.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| NodeError::Metrics(e.to_string()))
    }
}

impl Default for NodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
