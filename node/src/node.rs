//! Node wiring: ledger, election manager, cementing worker and the periodic
//! loops that drive them.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use lattice_consensus::{
    ActiveElections, Collaborators, ConfirmationSolicitor, PublishFilter, VoteCode, VoteSource,
};
use lattice_ledger::{Ledger, LedgerConstants, ProcessResult};
use lattice_nullables::NullStore;
use lattice_store::{WriteQueue, Writer};
use lattice_types::{Block, BlockHash, QualifiedRoot, Vote};
use lattice_utils::{Clock, Stats, SystemClock};

use crate::confirmation_height::ConfirmationHeightProcessor;
use crate::metrics::NodeMetrics;
use crate::shutdown::ShutdownController;
use crate::tracing_spans::{request_loop_span, vote_span};
use crate::{NodeConfig, NodeError};

/// Stands in for the network on a node without peers.
struct Offline;

impl ConfirmationSolicitor for Offline {
    fn request(&self, root: &QualifiedRoot, candidates: &[Arc<Block>]) {
        tracing::trace!(%root, candidates = candidates.len(), "no peers to solicit");
    }
}

impl PublishFilter for Offline {
    fn clear(&self, hashes: &[BlockHash]) {
        tracing::trace!(count = hashes.len(), "publish filter cleared");
    }
}

pub struct LatticeNode {
    pub config: NodeConfig,
    pub ledger: Arc<Ledger>,
    pub write_queue: Arc<WriteQueue>,
    pub stats: Arc<Stats>,
    pub active: Arc<ActiveElections>,
    pub confirmation_height: Arc<ConfirmationHeightProcessor>,
    pub metrics: Arc<NodeMetrics>,
    pub shutdown: Arc<ShutdownController>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    fork_resolver: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl LatticeNode {
    pub fn new(
        config: NodeConfig,
        ledger: Arc<Ledger>,
        clock: Arc<dyn Clock>,
        solicitor: Arc<dyn ConfirmationSolicitor>,
        publish_filter: Arc<dyn PublishFilter>,
    ) -> Self {
        let write_queue = Arc::new(WriteQueue::new());
        let stats = Arc::new(Stats::new());

        let confirmation_height = Arc::new(ConfirmationHeightProcessor::new(
            config.confirmation_height.clone(),
            Arc::clone(&ledger),
            Arc::clone(&write_queue),
            stats.clone(),
        ));

        let active = Arc::new(ActiveElections::new(
            config.active_elections.clone(),
            Arc::clone(&ledger),
            Arc::clone(&write_queue),
            stats.clone(),
            clock,
            Collaborators {
                solicitor,
                publish_filter,
                cementation: confirmation_height.clone(),
            },
        ));

        let weak = Arc::downgrade(&active);
        confirmation_height.add_cemented_observer(Box::new(move |block| {
            if let Some(active) = weak.upgrade() {
                active.block_cemented_callback(block);
            }
        }));
        let weak = Arc::downgrade(&active);
        confirmation_height.add_already_cemented_observer(Box::new(move |hash| {
            if let Some(active) = weak.upgrade() {
                active.block_already_cemented_callback(hash);
            }
        }));
        active.add_observer(Box::new(|confirmed| {
            tracing::debug!(
                hash = %confirmed.status.winner.hash(),
                account = %confirmed.account,
                amount = confirmed.amount,
                status = ?confirmed.status.status_type,
                "block confirmed"
            );
        }));

        Self {
            config,
            ledger,
            write_queue,
            stats,
            active,
            confirmation_height,
            metrics: Arc::new(NodeMetrics::new()),
            shutdown: Arc::new(ShutdownController::new()),
            tasks: Mutex::new(Vec::new()),
            fork_resolver: Mutex::new(None),
        }
    }

    /// In-memory node for `config.network` with no peers.
    pub fn new_dev(config: NodeConfig) -> Result<Self, NodeError> {
        let constants = LedgerConstants::for_network(config.network);
        let ledger = Arc::new(Ledger::new(Arc::new(NullStore::new()), constants)?);
        let offline = Arc::new(Offline);
        Ok(Self::new(
            config,
            ledger,
            Arc::new(SystemClock),
            offline.clone(),
            offline,
        ))
    }

    /// Apply a locally created block and start an election for its account.
    pub fn process_local(&self, mut block: Block) -> Result<ProcessResult, NodeError> {
        let result = {
            let _guard = self.write_queue.wait(Writer::ProcessBatch);
            self.ledger.process(&mut block)?
        };
        if result == ProcessResult::Progress {
            self.active.activate(&block.account());
        } else {
            tracing::debug!(hash = %block.hash(), %result, "local block rejected");
        }
        Ok(result)
    }

    pub fn vote(&self, vote: &Vote, source: VoteSource) -> VoteCode {
        let _span = vote_span(&vote.voting_account, vote.hashes.len()).entered();
        self.active.vote(vote, source)
    }

    /// Start the cementing and fork resolution threads and the periodic
    /// loops. Must run inside a tokio runtime.
    pub fn start(&self) -> Result<(), NodeError> {
        tracing::info!(network = ?self.config.network, "lattice node starting");
        self.confirmation_height.start()?;
        let active = Arc::clone(&self.active);
        let handle = std::thread::Builder::new()
            .name("Fork resolver".to_string())
            .spawn(move || active.run_fork_resolution())?;
        *self.fork_resolver.lock().unwrap() = Some(handle);
        self.spawn_loops();
        Ok(())
    }

    fn spawn_loops(&self) {
        let mut tasks = self.tasks.lock().unwrap();

        let active = Arc::clone(&self.active);
        let ledger = Arc::clone(&self.ledger);
        let processor = Arc::clone(&self.confirmation_height);
        let stats = Arc::clone(&self.stats);
        let metrics = Arc::clone(&self.metrics);
        let mut shutdown_rx = self.shutdown.subscribe();
        let period = Duration::from_millis(self.config.confirmation_request_interval_ms.max(1));
        tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("confirmation request loop shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        let _span = request_loop_span(active.len()).entered();
                        active.request_confirm();
                        metrics.refresh(&active, &ledger, &processor, &stats);
                    }
                }
            }
        }));

        let active = Arc::clone(&self.active);
        let mut shutdown_rx = self.shutdown.subscribe();
        let period = Duration::from_millis(self.config.dependency_activation_interval_ms.max(1));
        tasks.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => {
                        tracing::debug!("dependency activation loop shutting down");
                        break;
                    }
                    _ = interval.tick() => active.activate_dependencies(),
                }
            }
        }));
    }

    pub async fn stop(&self) {
        tracing::info!("lattice node stopping");
        self.shutdown.shutdown();
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap());
        for task in tasks {
            if let Err(error) = task.await {
                tracing::warn!(%error, "node task ended abnormally");
            }
        }
        self.active.stop();
        let fork_resolver = self.fork_resolver.lock().unwrap().take();
        if let Some(handle) = fork_resolver {
            if handle.join().is_err() {
                tracing::error!("fork resolution thread panicked");
            }
        }
        self.confirmation_height.stop();
        tracing::info!(
            blocks = self.ledger.block_count(),
            cemented = self.ledger.cemented_count(),
            "lattice node stopped"
        );
    }
}
