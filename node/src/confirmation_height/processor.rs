//! Background cementing of confirmed blocks.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::thread::JoinHandle;

use lattice_consensus::CementationQueue;
use lattice_ledger::Ledger;
use lattice_store::{ConfirmationHeightInfo, WriteQueue, Writer};
use lattice_types::{Account, Block, BlockHash};
use lattice_utils::{Stat, StatsSink};

use super::{bounded, unbounded, ConfirmationHeightMode};
use crate::config::ConfirmationHeightConfig;
use crate::tracing_spans::cementation_span;
use crate::NodeError;

pub type BlockCementedObserver = Box<dyn Fn(&Arc<Block>) + Send + Sync>;
pub type AlreadyCementedObserver = Box<dyn Fn(&BlockHash) + Send + Sync>;

#[derive(Default)]
struct Queue {
    pending: VecDeque<Arc<Block>>,
    current: Option<BlockHash>,
}

/// Raises confirmation heights for confirmed blocks, one target at a time.
///
/// Targets are taken in arrival order. Observers run after each written
/// batch with no store turn held, in cementing order.
pub struct ConfirmationHeightProcessor {
    config: ConfirmationHeightConfig,
    ledger: Arc<Ledger>,
    write_queue: Arc<WriteQueue>,
    stats: Arc<dyn StatsSink>,
    queue: Mutex<Queue>,
    condition: Condvar,
    stopped: AtomicBool,
    cemented_observers: RwLock<Vec<BlockCementedObserver>>,
    already_cemented_observers: RwLock<Vec<AlreadyCementedObserver>>,
    join_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ConfirmationHeightProcessor {
    pub fn new(
        config: ConfirmationHeightConfig,
        ledger: Arc<Ledger>,
        write_queue: Arc<WriteQueue>,
        stats: Arc<dyn StatsSink>,
    ) -> Self {
        Self {
            config,
            ledger,
            write_queue,
            stats,
            queue: Mutex::new(Queue::default()),
            condition: Condvar::new(),
            stopped: AtomicBool::new(false),
            cemented_observers: RwLock::new(Vec::new()),
            already_cemented_observers: RwLock::new(Vec::new()),
            join_handle: Mutex::new(None),
        }
    }

    pub fn add_cemented_observer(&self, observer: BlockCementedObserver) {
        self.cemented_observers.write().unwrap().push(observer);
    }

    pub fn add_already_cemented_observer(&self, observer: AlreadyCementedObserver) {
        self.already_cemented_observers
            .write()
            .unwrap()
            .push(observer);
    }

    pub fn add(&self, block: Arc<Block>) {
        self.queue.lock().unwrap().pending.push_back(block);
        self.condition.notify_all();
    }

    /// Whether `hash` is queued or currently being cemented.
    pub fn is_processing_added_block(&self, hash: &BlockHash) -> bool {
        let queue = self.queue.lock().unwrap();
        queue.current.as_ref() == Some(hash) || queue.pending.iter().any(|b| b.hash() == *hash)
    }

    pub fn awaiting_processing_len(&self) -> usize {
        self.queue.lock().unwrap().pending.len()
    }

    pub fn current(&self) -> Option<BlockHash> {
        self.queue.lock().unwrap().current
    }

    /// Strategy for the next target under the configured mode.
    pub fn uses_unbounded(&self) -> bool {
        match self.config.mode {
            ConfirmationHeightMode::Unbounded => true,
            ConfirmationHeightMode::Bounded => false,
            ConfirmationHeightMode::Automatic => {
                let uncemented = self
                    .ledger
                    .block_count()
                    .saturating_sub(self.ledger.cemented_count());
                uncemented < self.config.unbounded_cutoff
            }
        }
    }

    /// Cement `target` and everything it depends on.
    pub fn process(&self, target: &BlockHash) -> Result<(), NodeError> {
        if !self.ledger.block_exists(target) {
            return Err(NodeError::Invariant(format!(
                "cementing target {target} is not in the ledger"
            )));
        }
        if self.ledger.block_confirmed(target) {
            self.stats.inc(Stat::AlreadyCemented);
            for observer in self.already_cemented_observers.read().unwrap().iter() {
                observer(target);
            }
            return Ok(());
        }

        let unbounded = self.uses_unbounded();
        let _span = cementation_span(target, unbounded).entered();
        if unbounded {
            let blocks = unbounded::collect(&*self.ledger, target)?;
            self.write_batch(blocks)
        } else {
            bounded::cement(&*self.ledger, target, self.config.batch_size, &mut |batch| {
                self.write_batch(batch)
            })
            .map(|_| ())
        }
    }

    /// Write one batch of blocks in emission order, then notify observers.
    fn write_batch(&self, blocks: Vec<Arc<Block>>) -> Result<(), NodeError> {
        if blocks.is_empty() {
            return Ok(());
        }

        {
            let _guard = self.write_queue.wait(Writer::ConfirmationHeight);
            // (account, lowest height, new height, new frontier) by first appearance
            let mut order: Vec<(Account, u64, u64, BlockHash)> = Vec::new();
            let mut index: HashMap<Account, usize> = HashMap::new();
            for block in &blocks {
                if !self.ledger.block_exists(&block.hash()) {
                    return Err(NodeError::Invariant(format!(
                        "block {} left the ledger before cementing",
                        block.hash()
                    )));
                }
                match index.get(&block.account()) {
                    Some(&i) => {
                        order[i].2 = block.height();
                        order[i].3 = block.hash();
                    }
                    None => {
                        index.insert(block.account(), order.len());
                        order.push((block.account(), block.height(), block.height(), block.hash()));
                    }
                }
            }

            for (account, bottom, top, frontier) in order {
                let current = self.ledger.confirmation_height(&account)?;
                if current.height + 1 != bottom {
                    return Err(NodeError::Invariant(format!(
                        "confirmation height of {account} is {} but cementing starts at {bottom}",
                        current.height
                    )));
                }
                self.ledger
                    .put_confirmation_height(&account, &ConfirmationHeightInfo::new(top, frontier))?;
                self.ledger.add_cemented(top - current.height);
            }
        }

        self.stats.add(Stat::BlocksCemented, blocks.len() as u64);
        self.stats.inc(Stat::CementBatch);
        tracing::debug!(blocks = blocks.len(), "cemented batch");

        let observers = self.cemented_observers.read().unwrap();
        for block in &blocks {
            for observer in observers.iter() {
                observer(block);
            }
        }
        Ok(())
    }

    /// Cement everything queued on the calling thread.
    pub fn flush(&self) -> Result<(), NodeError> {
        while let Some(block) = self.next_target() {
            let result = self.process(&block.hash());
            self.queue.lock().unwrap().current = None;
            result?;
        }
        Ok(())
    }

    fn next_target(&self) -> Option<Arc<Block>> {
        let mut queue = self.queue.lock().unwrap();
        let block = queue.pending.pop_front()?;
        queue.current = Some(block.hash());
        Some(block)
    }

    pub fn start(self: &Arc<Self>) -> Result<(), NodeError> {
        let processor = Arc::clone(self);
        let handle = std::thread::Builder::new()
            .name("Conf height".to_string())
            .spawn(move || processor.run())?;
        *self.join_handle.lock().unwrap() = Some(handle);
        Ok(())
    }

    fn run(&self) {
        let mut queue = self.queue.lock().unwrap();
        while !self.stopped.load(Ordering::SeqCst) {
            let Some(block) = queue.pending.pop_front() else {
                queue = self
                    .condition
                    .wait_while(queue, |q| {
                        q.pending.is_empty() && !self.stopped.load(Ordering::SeqCst)
                    })
                    .unwrap();
                continue;
            };
            queue.current = Some(block.hash());
            drop(queue);

            if let Err(error) = self.process(&block.hash()) {
                tracing::error!(hash = %block.hash(), %error, "cementing failed");
                panic!("cementing {} failed: {error}", block.hash());
            }

            queue = self.queue.lock().unwrap();
            queue.current = None;
        }
    }

    pub fn stop(&self) {
        {
            let _queue = self.queue.lock().unwrap();
            self.stopped.store(true, Ordering::SeqCst);
        }
        self.condition.notify_all();
        let handle = self.join_handle.lock().unwrap().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("confirmation height thread panicked");
            }
        }
    }
}

impl CementationQueue for ConfirmationHeightProcessor {
    fn add(&self, block: Arc<Block>) {
        ConfirmationHeightProcessor::add(self, block);
    }

    fn is_processing_added_block(&self, hash: &BlockHash) -> bool {
        ConfirmationHeightProcessor::is_processing_added_block(self, hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_ledger::LedgerContext;
    use lattice_utils::Stats;

    fn processor(ctx: &LedgerContext, mode: ConfirmationHeightMode) -> (Arc<Stats>, ConfirmationHeightProcessor) {
        let stats = Arc::new(Stats::new());
        let config = ConfirmationHeightConfig {
            mode,
            ..ConfirmationHeightConfig::default()
        };
        let processor = ConfirmationHeightProcessor::new(
            config,
            Arc::clone(&ctx.ledger),
            Arc::new(WriteQueue::new()),
            stats.clone(),
        );
        (stats, processor)
    }

    #[test]
    fn automatic_mode_follows_uncemented_count() {
        let ctx = LedgerContext::new();
        let (_, processor) = processor(&ctx, ConfirmationHeightMode::Automatic);
        assert!(processor.uses_unbounded());

        let stats = Arc::new(Stats::new());
        let config = ConfirmationHeightConfig {
            unbounded_cutoff: 1,
            ..ConfirmationHeightConfig::default()
        };
        let strict = ConfirmationHeightProcessor::new(
            config,
            Arc::clone(&ctx.ledger),
            Arc::new(WriteQueue::new()),
            stats,
        );
        assert!(strict.uses_unbounded());
        ctx.process(ctx.send(&ctx.genesis_account(), &LedgerContext::key(1), 1));
        assert!(!strict.uses_unbounded());
    }

    #[test]
    fn tracks_queued_and_current_blocks() {
        let ctx = LedgerContext::new();
        let (_, processor) = processor(&ctx, ConfirmationHeightMode::Bounded);
        let send = ctx.process(ctx.send(&ctx.genesis_account(), &LedgerContext::key(1), 1));

        processor.add(send.clone());
        assert!(processor.is_processing_added_block(&send.hash()));
        assert_eq!(processor.awaiting_processing_len(), 1);

        processor.flush().unwrap();
        assert!(!processor.is_processing_added_block(&send.hash()));
        assert_eq!(processor.current(), None);
        assert!(ctx.ledger.block_confirmed(&send.hash()));
    }

    #[test]
    fn already_cemented_target_notifies() {
        let ctx = LedgerContext::new();
        let (stats, processor) = processor(&ctx, ConfirmationHeightMode::Unbounded);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        processor.add_already_cemented_observer(Box::new(move |hash| {
            sink.lock().unwrap().push(*hash);
        }));

        let genesis = ctx.genesis().hash();
        processor.process(&genesis).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![genesis]);
        assert_eq!(stats.get(Stat::AlreadyCemented), 1);
        assert_eq!(stats.get(Stat::BlocksCemented), 0);
    }

    #[test]
    fn unknown_target_is_an_invariant_violation() {
        let ctx = LedgerContext::new();
        let (_, processor) = processor(&ctx, ConfirmationHeightMode::Bounded);
        let result = processor.process(&BlockHash::from_u64(77));
        assert!(matches!(result, Err(NodeError::Invariant(_))));
    }

    fn record_cemented(processor: &ConfirmationHeightProcessor) -> Arc<Mutex<Vec<BlockHash>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        processor.add_cemented_observer(Box::new(move |block| {
            sink.lock().unwrap().push(block.hash());
        }));
        seen
    }

    #[test]
    fn block_rolled_back_before_write_is_an_invariant_violation() {
        let ctx = LedgerContext::new();
        let (stats, processor) = processor(&ctx, ConfirmationHeightMode::Bounded);
        let seen = record_cemented(&processor);
        let send = ctx.process(ctx.send(&ctx.genesis_account(), &LedgerContext::key(1), 1));

        let result = bounded::cement(&*ctx.ledger, &send.hash(), 8, &mut |batch| {
            ctx.ledger.rollback(&send.hash()).unwrap();
            processor.write_batch(batch)
        });
        match result {
            Err(NodeError::Invariant(message)) => assert!(message.contains("left the ledger")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(ctx.ledger.confirmation_height(&ctx.genesis_account()).unwrap().height, 1);
        assert_eq!(ctx.ledger.cemented_count(), 1);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(stats.get(Stat::BlocksCemented), 0);
    }

    #[test]
    fn height_raised_between_collect_and_write_is_an_invariant_violation() {
        let ctx = LedgerContext::new();
        let (stats, processor) = processor(&ctx, ConfirmationHeightMode::Unbounded);
        let seen = record_cemented(&processor);
        let send = ctx.process(ctx.send(&ctx.genesis_account(), &LedgerContext::key(1), 1));

        let blocks = unbounded::collect(&*ctx.ledger, &send.hash()).unwrap();
        ctx.cement(&send);
        match processor.write_batch(blocks) {
            Err(NodeError::Invariant(message)) => assert!(message.contains("cementing starts at 2")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(ctx.ledger.cemented_count(), 2);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(stats.get(Stat::CementBatch), 0);
    }

    #[test]
    fn worker_thread_drains_the_queue() {
        let ctx = LedgerContext::new();
        let (_, processor) = processor(&ctx, ConfirmationHeightMode::Automatic);
        let processor = Arc::new(processor);
        let (tx, rx) = std::sync::mpsc::channel();
        let tx = Mutex::new(tx);
        processor.add_cemented_observer(Box::new(move |block| {
            let _ = tx.lock().unwrap().send(block.hash());
        }));
        processor.start().unwrap();

        let send = ctx.process(ctx.send(&ctx.genesis_account(), &LedgerContext::key(1), 1));
        processor.add(send.clone());
        let cemented = rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("block cemented");
        assert_eq!(cemented, send.hash());

        processor.stop();
        assert!(ctx.ledger.block_confirmed(&send.hash()));
    }
}
