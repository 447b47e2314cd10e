//! Election manager: the bounded set of live elections.
//!
//! The manager starts elections for blocks, routes votes to them (or to the
//! inactive vote cache), ranks them for confirmation requests, and hands
//! quorum winners to the confirmation height processor. When the processor
//! reports cemented blocks it retires the matching elections, notifies
//! observers, and activates the next uncemented blocks.
//!
//! A confirmed winner missing from the ledger (a fork that lost locally) is
//! queued for the fork resolution worker, which takes the write turn, rolls
//! back the loser and applies the winner. Vote processing never waits for
//! the write turn.
//!
//! Locking: `data` is taken before any election's own lock, and before
//! `election_winner_details`. Collaborators (solicitor, cementation queue,
//! observers) are only called with no manager lock held.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock};

use lattice_ledger::{Ledger, ProcessResult, WeightOracle};
use lattice_store::{WriteQueue, Writer};
use lattice_types::{Account, Block, BlockHash, QualifiedRoot, Timestamp, Vote};
use lattice_utils::{Clock, Stat, StatsSink};
use lattice_work::from_multiplier;

use crate::collaborators::{CementationQueue, ConfirmationSolicitor, PublishFilter};
use crate::election::{quorum_delta, Election, ElectionStatus, ElectionStatusType, VoteContext};
use crate::ordered_elections::OrderedElections;
use crate::priority::{adjusted_multipliers, PriorityInput};
use crate::recently_cemented::RecentlyCemented;
use crate::recently_confirmed::{RecentlyConfirmed, RecentlyDropped};
use crate::vote_cache::VoteCache;
use crate::vote_info::{VoteCode, VoteSource};
use crate::{ActiveElectionsConfig, ConsensusError, OnlineWeightSampler};

#[derive(Clone, Debug, Default)]
pub struct InsertResult {
    pub election: Option<Arc<Election>>,
    pub inserted: bool,
}

/// An unconfirmed prerequisite discovered while activating an account.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendingDependency {
    pub hash: BlockHash,
    pub priority: f64,
}

/// Delivered to observers once per cemented block.
#[derive(Clone, Debug)]
pub struct BlockConfirmed {
    pub status: ElectionStatus,
    pub account: Account,
    pub amount: u128,
}

pub type ConfirmationObserver = Box<dyn Fn(&BlockConfirmed) + Send + Sync>;

/// The manager's view of the rest of the node.
pub struct Collaborators {
    pub solicitor: Arc<dyn ConfirmationSolicitor>,
    pub publish_filter: Arc<dyn PublishFilter>,
    pub cementation: Arc<dyn CementationQueue>,
}

struct ActiveElectionsData {
    roots: OrderedElections,
    blocks: HashMap<BlockHash, Arc<Election>>,
    vote_cache: VoteCache,
    recently_confirmed: RecentlyConfirmed,
    recently_dropped: RecentlyDropped,
    recently_cemented: RecentlyCemented,
    pending_dependencies: Vec<PendingDependency>,
    multipliers: VecDeque<f64>,
    trended_active_multiplier: f64,
    online: OnlineWeightSampler,
}

pub struct ActiveElections {
    config: ActiveElectionsConfig,
    ledger: Arc<Ledger>,
    write_queue: Arc<WriteQueue>,
    stats: Arc<dyn StatsSink>,
    clock: Arc<dyn Clock>,
    solicitor: Arc<dyn ConfirmationSolicitor>,
    publish_filter: Arc<dyn PublishFilter>,
    cementation: Arc<dyn CementationQueue>,
    data: Mutex<ActiveElectionsData>,
    /// Quorum winners handed to the cementing processor, by winner hash.
    election_winner_details: Mutex<HashMap<BlockHash, Arc<Election>>>,
    /// Confirmed winners that must replace a ledger block first.
    forced: Mutex<VecDeque<(Arc<Election>, Arc<Block>)>>,
    forced_condition: Condvar,
    observers: RwLock<Vec<ConfirmationObserver>>,
    stopped: AtomicBool,
}

impl ActiveElections {
    pub fn new(
        config: ActiveElectionsConfig,
        ledger: Arc<Ledger>,
        write_queue: Arc<WriteQueue>,
        stats: Arc<dyn StatsSink>,
        clock: Arc<dyn Clock>,
        collaborators: Collaborators,
    ) -> Self {
        let samples = config.multiplier_samples.max(1);
        let data = ActiveElectionsData {
            roots: OrderedElections::new(),
            blocks: HashMap::new(),
            vote_cache: VoteCache::new(config.vote_cache_size, config.vote_cache_max_voters),
            recently_confirmed: RecentlyConfirmed::new(config.recently_confirmed_size),
            recently_dropped: RecentlyDropped::new(config.recently_dropped_size),
            recently_cemented: RecentlyCemented::new(config.recently_cemented_size),
            pending_dependencies: Vec::new(),
            multipliers: std::iter::repeat(1.0).take(samples).collect(),
            trended_active_multiplier: 1.0,
            online: OnlineWeightSampler::new(
                config.online_window_secs,
                config.online_weight_minimum,
            ),
        };
        Self {
            config,
            ledger,
            write_queue,
            stats,
            clock,
            solicitor: collaborators.solicitor,
            publish_filter: collaborators.publish_filter,
            cementation: collaborators.cementation,
            data: Mutex::new(data),
            election_winner_details: Mutex::new(HashMap::new()),
            forced: Mutex::new(VecDeque::new()),
            forced_condition: Condvar::new(),
            observers: RwLock::new(Vec::new()),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn add_observer(&self, observer: ConfirmationObserver) {
        self.observers.write().unwrap().push(observer);
    }

    fn weights(&self) -> &dyn WeightOracle {
        &*self.ledger
    }

    fn prioritized_count(&self, len: usize) -> usize {
        let count = (len as f64 * self.config.prioritized_fraction).ceil() as usize;
        count.clamp(1, len.max(1))
    }

    // ── Insertion ──────────────────────────────────────────────────────

    /// Start an election for `block`, or add it to the election already
    /// running for its qualified root.
    pub fn insert(&self, block: &Arc<Block>) -> InsertResult {
        if self.stopped.load(Ordering::SeqCst) {
            return InsertResult::default();
        }
        let root = block.qualified_root();
        let hash = block.hash();
        let difficulty = self.ledger.block_difficulty(block);
        let multiplier = self.ledger.block_multiplier(block);
        let now = self.clock.now();

        let mut data = self.data.lock().unwrap();
        if let Some(existing) = data.roots.get(&root).cloned() {
            let result = existing.insert_candidate(
                Arc::clone(block),
                difficulty,
                multiplier,
                self.config.max_candidates,
                self.weights(),
            );
            if result.difficulty_update {
                self.stats.inc(Stat::ElectionDifficultyUpdate);
            }
            let mut confirmed = None;
            if result.block_conflict {
                self.stats.inc(Stat::ElectionBlockConflict);
                tracing::debug!(%root, %hash, "fork joined election");
                data.blocks.insert(hash, Arc::clone(&existing));
                confirmed = self.replay_cached_votes(&mut data, &existing, &hash, now);
            }
            drop(data);
            if let Some(status) = confirmed {
                self.process_confirmed(&existing, status);
            }
            return InsertResult {
                election: Some(existing),
                inserted: false,
            };
        }

        if data.recently_confirmed.contains_root(&root) {
            return InsertResult::default();
        }
        if let Some(previous) = data.recently_dropped.find(&root) {
            if difficulty <= previous {
                return InsertResult::default();
            }
            data.recently_dropped.erase(&root);
            self.stats.inc(Stat::ElectionRestart);
            tracing::debug!(%root, difficulty, previous, "restarting dropped election");
        }

        if data.roots.len() >= self.config.size {
            self.evict_lowest(&mut data);
        }

        let election = Arc::new(Election::new(Arc::clone(block), difficulty, multiplier, now));
        data.roots.insert(Arc::clone(&election), multiplier);
        data.blocks.insert(hash, Arc::clone(&election));
        self.stats.inc(Stat::ElectionStart);

        let rank = data.roots.rank(&root).unwrap_or(usize::MAX);
        if rank < self.prioritized_count(data.roots.len()) {
            self.stats.inc(Stat::ElectionPriority);
        } else {
            self.stats.inc(Stat::ElectionNonPriority);
        }
        tracing::debug!(%root, %hash, multiplier, "election started");

        let confirmed = self.replay_cached_votes(&mut data, &election, &hash, now);
        drop(data);
        if let Some(status) = confirmed {
            self.process_confirmed(&election, status);
        }
        InsertResult {
            election: Some(election),
            inserted: true,
        }
    }

    fn evict_lowest(&self, data: &mut ActiveElectionsData) {
        let Some(root) = data
            .roots
            .lowest(|e| !e.is_confirmed() && !e.is_wallet_backed())
        else {
            return;
        };
        if let Some(election) = self.erase_election(data, &root) {
            data.recently_dropped.add(root, election.max_difficulty());
            self.stats.inc(Stat::ElectionDrop);
            tracing::debug!(%root, "election dropped");
        }
    }

    /// Remove an election from both indexes and release its blocks.
    fn erase_election(
        &self,
        data: &mut ActiveElectionsData,
        root: &QualifiedRoot,
    ) -> Option<Arc<Election>> {
        let election = data.roots.erase(root)?;
        let candidates = election.candidates();
        for block in &candidates {
            data.blocks.remove(&block.hash());
        }
        {
            let mut details = self.election_winner_details.lock().unwrap();
            for block in &candidates {
                details.remove(&block.hash());
            }
        }
        election.cleanup(self.publish_filter.as_ref());
        Some(election)
    }

    fn vote_context(&self, data: &ActiveElectionsData, now: Timestamp) -> VoteContext<'_> {
        let online_weight = data.online.effective_weight(now, self.weights());
        VoteContext {
            weights: self.weights(),
            online_weight,
            quorum_delta: quorum_delta(online_weight, self.config.quorum_percent),
            now,
        }
    }

    fn replay_cached_votes(
        &self,
        data: &mut ActiveElectionsData,
        election: &Arc<Election>,
        hash: &BlockHash,
        now: Timestamp,
    ) -> Option<ElectionStatus> {
        let cached = data.vote_cache.take(hash);
        if cached.is_empty() {
            return None;
        }
        let ctx = self.vote_context(data, now);
        let mut confirmed = None;
        for vote in cached {
            let outcome = election.vote(&vote.voter, vote.sequence, hash, VoteSource::Cache, &ctx);
            if outcome.code == VoteCode::Vote {
                self.stats.inc(Stat::VoteCached);
            }
            if outcome.confirmed.is_some() {
                confirmed = outcome.confirmed;
            }
        }
        confirmed
    }

    // ── Votes ──────────────────────────────────────────────────────────

    /// Route a vote to the elections of its hashes.
    ///
    /// Returns `Vote` if any election accepted it, otherwise `Replay` if any
    /// hash was already decided, otherwise `Ignored` or `Indeterminate`.
    /// Votes for known, uncemented blocks without an election are cached.
    pub fn vote(&self, vote: &Vote, source: VoteSource) -> VoteCode {
        let voter = vote.voting_account;
        if vote.hashes.is_empty() || voter.is_zero() || voter == Account::NOT_AN_ACCOUNT {
            self.stats.inc(Stat::VoteInvalid);
            return VoteCode::Invalid;
        }
        let now = self.clock.now();
        let mut codes = Vec::with_capacity(vote.hashes.len());
        let mut confirmed = Vec::new();

        let mut data = self.data.lock().unwrap();
        data.online.observe(&voter, now);
        let ctx = self.vote_context(&data, now);
        for hash in &vote.hashes {
            if let Some(election) = data.blocks.get(hash).cloned() {
                let outcome = election.vote(&voter, vote.sequence, hash, source, &ctx);
                if let Some(status) = outcome.confirmed {
                    confirmed.push((election, status));
                }
                codes.push(outcome.code);
            } else if data.recently_confirmed.contains_hash(hash) {
                codes.push(VoteCode::Replay);
            } else {
                if self.ledger.block_exists(hash) && !self.ledger.block_confirmed(hash) {
                    let weight = self.ledger.weight(&voter);
                    if data.vote_cache.insert(*hash, voter, weight, vote.sequence) {
                        self.stats.inc(Stat::VoteCacheInsert);
                    }
                }
                codes.push(VoteCode::Indeterminate);
            }
        }
        drop(data);

        for (election, status) in confirmed {
            self.process_confirmed(&election, status);
        }

        let code = [
            VoteCode::Vote,
            VoteCode::Replay,
            VoteCode::Ignored,
            VoteCode::Indeterminate,
        ]
        .into_iter()
        .find(|c| codes.contains(c))
        .unwrap_or(VoteCode::Indeterminate);
        self.stats.inc(match code {
            VoteCode::Vote => Stat::VoteNew,
            VoteCode::Replay => Stat::VoteReplay,
            VoteCode::Ignored => Stat::VoteIgnored,
            VoteCode::Indeterminate => Stat::VoteIndeterminate,
            VoteCode::Invalid => Stat::VoteInvalid,
        });
        code
    }

    // ── Confirmation ───────────────────────────────────────────────────

    /// Record a newly confirmed election and hand its winner to cementing.
    fn process_confirmed(&self, election: &Arc<Election>, status: ElectionStatus) {
        let winner = Arc::clone(&status.winner);
        let hash = winner.hash();
        {
            let mut data = self.data.lock().unwrap();
            data.recently_confirmed
                .insert(election.qualified_root(), hash);
            self.push_multiplier_sample(&mut data, election.multiplier());
        }
        self.stats.inc(Stat::ElectionConfirmed);
        self.election_winner_details
            .lock()
            .unwrap()
            .insert(hash, Arc::clone(election));
        tracing::debug!(root = %election.qualified_root(), %hash, tally = status.tally, "election confirmed");

        if self.ledger.block_exists(&hash) {
            self.cementation.add(winner);
        } else {
            tracing::debug!(%hash, "confirmed winner missing from ledger, queued for fork resolution");
            self.forced
                .lock()
                .unwrap()
                .push_back((Arc::clone(election), winner));
            self.forced_condition.notify_one();
        }
    }

    /// Forget a winner that could not be applied, so its root can be
    /// elected again.
    fn abandon_winner(&self, hash: &BlockHash) {
        self.election_winner_details.lock().unwrap().remove(hash);
        self.data.lock().unwrap().recently_confirmed.erase(hash);
    }

    /// The confirmed winner is not in the ledger: replace whatever block
    /// holds its position, then cement it.
    fn force_winner(&self, election: &Arc<Election>, winner: &Arc<Block>) {
        let hash = winner.hash();
        let guard = self.write_queue.wait(Writer::ProcessBatch);
        if let Some(existing) = self.ledger.block_at_root(&winner.qualified_root()) {
            match self.ledger.rollback(&existing) {
                Ok(removed) => {
                    self.stats.inc(Stat::ElectionForceRollback);
                    tracing::warn!(
                        root = %election.qualified_root(),
                        rolled_back = %existing,
                        count = removed.len(),
                        winner = %winner.hash(),
                        "rolled back fork loser"
                    );
                    let mut data = self.data.lock().unwrap();
                    for block in &removed {
                        let Some(other) = data.blocks.get(&block.hash()).cloned() else {
                            continue;
                        };
                        if other.qualified_root() != election.qualified_root() {
                            self.erase_election(&mut data, &other.qualified_root());
                        }
                    }
                }
                Err(e) => {
                    drop(guard);
                    tracing::warn!(%existing, error = %e, "failed to roll back fork loser");
                    self.abandon_winner(&hash);
                    return;
                }
            }
        }
        let mut block = (**winner).clone();
        let result = self.ledger.process(&mut block);
        drop(guard);
        match result {
            Ok(ProcessResult::Progress) => {
                self.cementation.add(Arc::new(block));
                return;
            }
            Ok(result) => {
                tracing::warn!(%hash, %result, "confirmed winner rejected by ledger");
            }
            Err(e) => {
                tracing::warn!(%hash, error = %e, "failed to apply confirmed winner");
            }
        }
        self.abandon_winner(&hash);
    }

    /// Resolve every queued forced winner on the calling thread. Returns how
    /// many were handled.
    pub fn resolve_forced_winners(&self) -> usize {
        let mut handled = 0;
        loop {
            let next = self.forced.lock().unwrap().pop_front();
            let Some((election, winner)) = next else {
                return handled;
            };
            self.force_winner(&election, &winner);
            handled += 1;
        }
    }

    pub fn forced_winners_len(&self) -> usize {
        self.forced.lock().unwrap().len()
    }

    /// Fork resolution worker loop. Returns once the manager is stopped.
    pub fn run_fork_resolution(&self) {
        let mut queue = self.forced.lock().unwrap();
        while !self.stopped.load(Ordering::SeqCst) {
            match queue.pop_front() {
                Some((election, winner)) => {
                    drop(queue);
                    self.force_winner(&election, &winner);
                    queue = self.forced.lock().unwrap();
                }
                None => queue = self.forced_condition.wait(queue).unwrap(),
            }
        }
    }

    /// Confirm the election for `root` with its current leader.
    pub fn force_confirm(&self, root: &QualifiedRoot) -> Result<ElectionStatus, ConsensusError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(ConsensusError::Stopped);
        }
        let election = self
            .data
            .lock()
            .unwrap()
            .roots
            .get(root)
            .cloned()
            .ok_or(ConsensusError::ElectionNotFound(*root))?;
        match election.confirm_once(ElectionStatusType::ActiveQuorum, self.clock.now()) {
            Some(status) => {
                self.process_confirmed(&election, status.clone());
                Ok(status)
            }
            None => Ok(election.status()),
        }
    }

    // ── Multipliers ────────────────────────────────────────────────────

    fn push_multiplier_sample(&self, data: &mut ActiveElectionsData, multiplier: f64) {
        data.multipliers.push_back(multiplier);
        while data.multipliers.len() > self.config.multiplier_samples.max(1) {
            data.multipliers.pop_front();
        }
        data.trended_active_multiplier =
            data.multipliers.iter().sum::<f64>() / data.multipliers.len() as f64;
    }

    /// Add a confirmed multiplier to the samples and recompute the trend.
    pub fn update_active_multiplier(&self, multiplier: f64) {
        let mut data = self.data.lock().unwrap();
        self.push_multiplier_sample(&mut data, multiplier);
    }

    pub fn trended_active_multiplier(&self) -> f64 {
        self.data.lock().unwrap().trended_active_multiplier
    }

    /// Minimum difficulty new submissions should reach.
    pub fn active_difficulty(&self) -> u64 {
        from_multiplier(
            self.trended_active_multiplier(),
            self.ledger.constants.thresholds.epoch_1,
        )
    }

    /// Recompute every unconfirmed election's scheduling priority.
    pub fn update_adjusted_multiplier(&self) {
        let now = self.clock.now();
        let mut data = self.data.lock().unwrap();
        self.update_adjusted_locked(&mut data, now);
    }

    fn update_adjusted_locked(&self, data: &mut ActiveElectionsData, now: Timestamp) {
        let online_weight = data.online.effective_weight(now, self.weights());
        let inputs: Vec<PriorityInput> = data
            .roots
            .elections()
            .filter(|e| !e.is_confirmed())
            .map(|e| {
                let winner = e.winner();
                let dependencies = [Some(winner.previous()), winner.source()]
                    .into_iter()
                    .flatten()
                    .filter(|h| !h.is_zero())
                    .collect();
                PriorityInput {
                    root: e.qualified_root(),
                    winner: winner.hash(),
                    dependencies,
                    multiplier: e.multiplier(),
                    balance: winner.balance(),
                }
            })
            .collect();
        for (root, multiplier) in adjusted_multipliers(&inputs, online_weight) {
            data.roots.set_adjusted_multiplier(&root, multiplier);
        }
    }

    pub fn adjusted_multiplier(&self, root: &QualifiedRoot) -> Option<f64> {
        self.data.lock().unwrap().roots.adjusted_multiplier(root)
    }

    // ── Request loop ───────────────────────────────────────────────────

    /// One pass of the confirmation request loop.
    ///
    /// Samples online weight, retires confirmed elections past their grace
    /// window, reranks, and solicits votes for the prioritized elections.
    pub fn request_confirm(&self) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        let now = self.clock.now();
        let prioritized: Vec<Arc<Election>> = {
            let mut data = self.data.lock().unwrap();
            data.online.sample(now, self.weights());

            let grace = self.config.confirmed_grace_secs;
            let expired: Vec<QualifiedRoot> = data
                .roots
                .elections()
                .filter(|e| {
                    e.confirmed_at()
                        .map(|at| at.has_expired(grace, now))
                        .unwrap_or(false)
                })
                .map(|e| e.qualified_root())
                .collect();
            for root in &expired {
                self.erase_election(&mut data, root);
                tracing::debug!(%root, "confirmed election retired after grace window");
            }

            self.update_adjusted_locked(&mut data, now);
            let count = self.prioritized_count(data.roots.len());
            data.roots
                .iter_by_priority()
                .map(|(_, election, _)| election)
                .filter(|e| !e.is_confirmed())
                .take(count)
                .cloned()
                .collect()
        };

        for election in prioritized {
            election.inc_confirmation_request_count();
            self.solicitor
                .request(&election.qualified_root(), &election.candidates());
            self.stats.inc(Stat::ConfirmationRequest);
        }
    }

    // ── Activation ─────────────────────────────────────────────────────

    /// Start an election for the first uncemented block of `account`.
    ///
    /// If that block still depends on an uncemented block, the dependency is
    /// queued instead and no election starts.
    pub fn activate(&self, account: &Account) -> InsertResult {
        if self.stopped.load(Ordering::SeqCst) {
            return InsertResult::default();
        }
        let Some(block) = self.ledger.first_uncemented(account) else {
            return InsertResult::default();
        };
        if let Some(dependency) = self.ledger.unconfirmed_dependency(&block) {
            let priority = self.ledger.block_multiplier(&block);
            let mut data = self.data.lock().unwrap();
            if !data.pending_dependencies.iter().any(|d| d.hash == dependency) {
                data.pending_dependencies.push(PendingDependency {
                    hash: dependency,
                    priority,
                });
                self.stats.inc(Stat::DependencyPending);
                tracing::debug!(%account, %dependency, "activation waits for dependency");
            }
            return InsertResult::default();
        }
        self.insert(&block)
    }

    pub fn add_pending_dependency(&self, hash: BlockHash, priority: f64) {
        self.data
            .lock()
            .unwrap()
            .pending_dependencies
            .push(PendingDependency { hash, priority });
    }

    pub fn pending_dependencies_len(&self) -> usize {
        self.data.lock().unwrap().pending_dependencies.len()
    }

    /// Drain the dependency queue, activating the account of each valid entry.
    /// Malformed or unknown entries are dropped.
    pub fn activate_dependencies(&self) {
        let pending = std::mem::take(&mut self.data.lock().unwrap().pending_dependencies);
        for dependency in pending {
            let valid = !dependency.hash.is_zero()
                && dependency.hash != BlockHash::MAX
                && dependency.priority.is_finite()
                && dependency.priority > 0.0;
            let block = if valid {
                self.ledger.block(&dependency.hash)
            } else {
                None
            };
            let Some(block) = block else {
                self.stats.inc(Stat::DependencyDropped);
                continue;
            };
            if self.activate(&block.account()).inserted {
                self.stats.inc(Stat::DependencyActivated);
            }
        }
    }

    // ── Cementing callbacks ────────────────────────────────────────────

    /// Called by the confirmation height processor for each cemented block,
    /// oldest first.
    pub fn block_cemented_callback(&self, block: &Arc<Block>) {
        let hash = block.hash();
        let now = self.clock.now();
        let from_quorum = self.election_winner_details.lock().unwrap().remove(&hash);

        let mut data = self.data.lock().unwrap();
        let status = match from_quorum {
            Some(election) => {
                let mut status = election.status();
                status.status_type = ElectionStatusType::ActiveQuorum;
                status
            }
            None => match data.blocks.get(&hash).cloned() {
                Some(election) => {
                    election.confirm_once(ElectionStatusType::ActiveConfHeight, now);
                    data.recently_confirmed
                        .insert(election.qualified_root(), hash);
                    let mut status = election.status();
                    status.status_type = ElectionStatusType::ActiveConfHeight;
                    status
                }
                None => ElectionStatus {
                    winner: Arc::clone(block),
                    tally: 0,
                    election_end: now,
                    election_duration_secs: 0,
                    voter_count: 0,
                    confirmation_request_count: 0,
                    status_type: ElectionStatusType::InactiveConfHeight,
                },
            },
        };
        let active = status.status_type != ElectionStatusType::InactiveConfHeight;
        if active {
            self.erase_election(&mut data, &block.qualified_root());
        }
        data.recently_cemented.push(status.clone());
        drop(data);

        self.stats.inc(match status.status_type {
            ElectionStatusType::ActiveQuorum => Stat::ActiveQuorum,
            ElectionStatusType::ActiveConfHeight => Stat::ActiveConfHeight,
            _ => Stat::InactiveConfHeight,
        });
        let notification = BlockConfirmed {
            account: block.account(),
            amount: self.ledger.amount(&hash).unwrap_or(0),
            status,
        };
        for observer in self.observers.read().unwrap().iter() {
            observer(&notification);
        }

        if active {
            self.activate(&block.account());
            if let Some(destination) = block.destination() {
                self.activate(&destination);
            }
        }
    }

    /// Called when a block handed to the processor was already cemented.
    pub fn block_already_cemented_callback(&self, hash: &BlockHash) {
        self.election_winner_details.lock().unwrap().remove(hash);
        let mut data = self.data.lock().unwrap();
        if let Some(election) = data.blocks.get(hash).cloned() {
            if election.is_confirmed() {
                self.erase_election(&mut data, &election.qualified_root());
            }
        }
    }

    // ── Introspection ──────────────────────────────────────────────────

    pub fn election(&self, root: &QualifiedRoot) -> Option<Arc<Election>> {
        self.data.lock().unwrap().roots.get(root).cloned()
    }

    pub fn election_for_block(&self, hash: &BlockHash) -> Option<Arc<Election>> {
        self.data.lock().unwrap().blocks.get(hash).cloned()
    }

    pub fn active(&self, root: &QualifiedRoot) -> bool {
        self.data.lock().unwrap().roots.contains(root)
    }

    pub fn len(&self) -> usize {
        self.data.lock().unwrap().roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Roots from highest to lowest adjusted multiplier.
    pub fn roots_by_priority(&self) -> Vec<(QualifiedRoot, f64)> {
        self.data
            .lock()
            .unwrap()
            .roots
            .iter_by_priority()
            .map(|(root, _, multiplier)| (*root, multiplier))
            .collect()
    }

    pub fn recently_confirmed_contains(&self, root: &QualifiedRoot) -> bool {
        self.data.lock().unwrap().recently_confirmed.contains_root(root)
    }

    pub fn clear_recently_confirmed(&self) {
        self.data.lock().unwrap().recently_confirmed.clear();
    }

    /// Best difficulty seen for a dropped root.
    pub fn recently_dropped(&self, root: &QualifiedRoot) -> Option<u64> {
        self.data.lock().unwrap().recently_dropped.find(root)
    }

    pub fn recently_cemented(&self) -> Vec<ElectionStatus> {
        self.data.lock().unwrap().recently_cemented.list()
    }

    pub fn vote_cache_len(&self) -> usize {
        self.data.lock().unwrap().vote_cache.len()
    }

    pub fn winner_details_contains(&self, hash: &BlockHash) -> bool {
        self.election_winner_details.lock().unwrap().contains_key(hash)
    }

    pub fn winner_details_len(&self) -> usize {
        self.election_winner_details.lock().unwrap().len()
    }

    pub fn online_weight(&self) -> u128 {
        let now = self.clock.now();
        self.data
            .lock()
            .unwrap()
            .online
            .effective_weight(now, self.weights())
    }

    /// Stop accepting work and release every election.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut data = self.data.lock().unwrap();
        let elections = data.roots.clear();
        data.blocks.clear();
        data.vote_cache.clear();
        drop(data);
        self.election_winner_details.lock().unwrap().clear();
        {
            let mut forced = self.forced.lock().unwrap();
            forced.clear();
            self.forced_condition.notify_all();
        }
        for election in &elections {
            election.cleanup(self.publish_filter.as_ref());
        }
        tracing::info!(count = elections.len(), "election manager stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{RecordingCementationQueue, RecordingPublishFilter, RecordingSolicitor};
    use lattice_ledger::LedgerContext;
    use lattice_nullables::NullClock;
    use lattice_utils::Stats;

    fn manager(config: ActiveElectionsConfig) -> (LedgerContext, Arc<Stats>, ActiveElections) {
        let ctx = LedgerContext::new();
        let stats = Arc::new(Stats::new());
        let active = ActiveElections::new(
            config,
            Arc::clone(&ctx.ledger),
            Arc::new(WriteQueue::new()),
            stats.clone(),
            Arc::new(NullClock::new(1000)),
            Collaborators {
                solicitor: Arc::new(RecordingSolicitor::new()),
                publish_filter: Arc::new(RecordingPublishFilter::new()),
                cementation: Arc::new(RecordingCementationQueue::new()),
            },
        );
        (ctx, stats, active)
    }

    #[test]
    fn trended_multiplier_averages_recent_samples() {
        let config = ActiveElectionsConfig {
            multiplier_samples: 4,
            ..ActiveElectionsConfig::dev()
        };
        let (ctx, _, active) = manager(config);
        assert_eq!(active.trended_active_multiplier(), 1.0);
        assert_eq!(active.active_difficulty(), ctx.ledger.constants.thresholds.epoch_1);

        active.update_active_multiplier(3.0);
        assert_eq!(active.trended_active_multiplier(), 1.5);
        for _ in 0..4 {
            active.update_active_multiplier(2.0);
        }
        assert_eq!(active.trended_active_multiplier(), 2.0);
        assert_eq!(active.active_difficulty(), ctx.work(2.0));
    }

    #[test]
    fn prioritized_count_rounds_up_and_is_never_zero() {
        let (_, _, active) = manager(ActiveElectionsConfig::dev());
        assert_eq!(active.prioritized_count(0), 1);
        assert_eq!(active.prioritized_count(1), 1);
        assert_eq!(active.prioritized_count(10), 1);
        assert_eq!(active.prioritized_count(11), 2);
    }

    #[test]
    fn malformed_votes_are_invalid() {
        let (ctx, stats, active) = manager(ActiveElectionsConfig::dev());
        let hash = ctx.genesis().hash();
        assert_eq!(
            active.vote(&Vote::new(ctx.genesis_account(), 1, vec![]), VoteSource::Live),
            VoteCode::Invalid
        );
        assert_eq!(
            active.vote(&Vote::new(Account::NOT_AN_ACCOUNT, 1, vec![hash]), VoteSource::Live),
            VoteCode::Invalid
        );
        assert_eq!(
            active.vote(&Vote::new(Account::ZERO, 1, vec![hash]), VoteSource::Live),
            VoteCode::Invalid
        );
        assert_eq!(stats.get(Stat::VoteInvalid), 3);
    }

    #[test]
    fn stopped_manager_rejects_work() {
        let (ctx, _, active) = manager(ActiveElectionsConfig::dev());
        let send = Arc::new(ctx.send(&ctx.genesis_account(), &LedgerContext::key(1), 10));
        assert!(active.insert(&send).inserted);
        active.stop();
        assert!(active.is_empty());
        assert!(!active.insert(&send).inserted);
        assert!(matches!(
            active.force_confirm(&send.qualified_root()),
            Err(ConsensusError::Stopped)
        ));
    }

    #[test]
    fn fork_resolution_worker_exits_on_stop() {
        let (_ctx, _, active) = manager(ActiveElectionsConfig::dev());
        let active = Arc::new(active);
        let worker = {
            let active = Arc::clone(&active);
            std::thread::spawn(move || active.run_fork_resolution())
        };
        active.stop();
        worker.join().unwrap();
        assert_eq!(active.forced_winners_len(), 0);
    }
}
