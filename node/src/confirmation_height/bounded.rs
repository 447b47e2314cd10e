//! Bounded cementing: one block at a time, written in fixed-size batches.
//!
//! Only the per-account planned heights and a stack of pending tops are kept
//! in memory, whatever the length of the uncemented chains.

use std::sync::Arc;

use lattice_types::{Account, Block, BlockHash};

use super::{load, pending_source, ChainWalker, PlannedHeights};
use crate::NodeError;

/// Cement up to `top_height` on `account`.
#[derive(Clone, Copy)]
struct Frame {
    account: Account,
    top_height: u64,
}

impl Frame {
    fn of(block: &Block) -> Self {
        Self {
            account: block.account(),
            top_height: block.height(),
        }
    }
}

/// Walk everything `target` depends on in causal order, handing each full
/// batch to `flush`. Returns the number of blocks emitted.
pub fn cement(
    walker: &dyn ChainWalker,
    target: &BlockHash,
    batch_size: usize,
    flush: &mut dyn FnMut(Vec<Arc<Block>>) -> Result<(), NodeError>,
) -> Result<usize, NodeError> {
    let batch_size = batch_size.max(1);
    let top = load(walker, target)?;
    let mut planned = PlannedHeights::default();
    let mut batch = Vec::with_capacity(batch_size);
    let mut emitted = 0;
    let mut stack = vec![Frame::of(&top)];

    while let Some(frame) = stack.last().copied() {
        let (height, frontier) = planned.get(walker, &frame.account)?;
        if height >= frame.top_height {
            stack.pop();
            continue;
        }
        let next = if height == 0 {
            walker.open_block(&frame.account)
        } else {
            walker.successor(&frontier)
        };
        let next = next.ok_or_else(|| {
            NodeError::Invariant(format!(
                "chain of {} ends at height {height}, below {}",
                frame.account, frame.top_height
            ))
        })?;
        let block = load(walker, &next)?;
        if let Some(source) = pending_source(walker, &mut planned, &block)? {
            stack.push(Frame::of(&source));
            continue;
        }
        planned.emit(&block);
        batch.push(block);
        emitted += 1;
        if batch.len() >= batch_size {
            flush(std::mem::replace(&mut batch, Vec::with_capacity(batch_size)))?;
        }
    }
    if !batch.is_empty() {
        flush(batch)?;
    }
    Ok(emitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_ledger::LedgerContext;

    #[test]
    fn flushes_in_batches() {
        let ctx = LedgerContext::new();
        let genesis = ctx.genesis_account();
        let mut last = None;
        for seed in 1..=5 {
            last = Some(ctx.process(ctx.send(&genesis, &LedgerContext::key(seed), 1)));
        }
        let target = last.unwrap().hash();

        let mut batches = Vec::new();
        let emitted = cement(&*ctx.ledger, &target, 2, &mut |batch| {
            batches.push(batch.len());
            Ok(())
        })
        .unwrap();
        assert_eq!(emitted, 5);
        assert_eq!(batches, vec![2, 2, 1]);
    }

    #[test]
    fn flush_error_stops_the_walk() {
        let ctx = LedgerContext::new();
        let genesis = ctx.genesis_account();
        ctx.process(ctx.send(&genesis, &LedgerContext::key(1), 1));
        let target = ctx.process(ctx.send(&genesis, &LedgerContext::key(2), 1));

        let result = cement(&*ctx.ledger, &target.hash(), 1, &mut |_| {
            Err(NodeError::Invariant("stop".into()))
        });
        assert!(matches!(result, Err(NodeError::Invariant(_))));
    }
}
