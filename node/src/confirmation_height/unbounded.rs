//! Unbounded cementing: every uncemented segment is loaded before writing.

use std::sync::Arc;

use lattice_types::{Block, BlockHash};

use super::{load, pending_source, ChainWalker, PlannedHeights};
use crate::NodeError;

/// Uncemented blocks of one account, ascending, ending at a chosen top.
struct Segment {
    blocks: Vec<Arc<Block>>,
    next: usize,
}

impl Segment {
    fn load(
        walker: &dyn ChainWalker,
        planned: &mut PlannedHeights,
        top: Arc<Block>,
    ) -> Result<Self, NodeError> {
        let (height, _) = planned.get(walker, &top.account())?;
        let mut blocks = Vec::new();
        let mut current = top;
        while current.height() > height {
            let previous = current.previous();
            let bottom = current.height() == height + 1;
            blocks.push(current);
            if bottom {
                break;
            }
            current = load(walker, &previous)?;
        }
        blocks.reverse();
        Ok(Self { blocks, next: 0 })
    }
}

/// Every uncemented block `target` depends on, oldest dependency first and
/// `target` last.
pub fn collect(walker: &dyn ChainWalker, target: &BlockHash) -> Result<Vec<Arc<Block>>, NodeError> {
    let top = load(walker, target)?;
    let mut planned = PlannedHeights::default();
    let mut ordered = Vec::new();
    let mut stack = vec![Segment::load(walker, &mut planned, top)?];

    while let Some(segment) = stack.last() {
        let Some(block) = segment.blocks.get(segment.next).cloned() else {
            stack.pop();
            continue;
        };
        let (height, _) = planned.get(walker, &block.account())?;
        if block.height() > height {
            if let Some(source) = pending_source(walker, &mut planned, &block)? {
                stack.push(Segment::load(walker, &mut planned, source)?);
                continue;
            }
            planned.emit(&block);
            ordered.push(block);
        }
        if let Some(segment) = stack.last_mut() {
            segment.next += 1;
        }
    }
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lattice_ledger::LedgerContext;

    fn hashes(blocks: &[Arc<Block>]) -> Vec<BlockHash> {
        blocks.iter().map(|b| b.hash()).collect()
    }

    #[test]
    fn single_chain_ascending() {
        let ctx = LedgerContext::new();
        let genesis = ctx.genesis_account();
        let a = ctx.process(ctx.send(&genesis, &LedgerContext::key(1), 1));
        let b = ctx.process(ctx.send(&genesis, &LedgerContext::key(2), 1));
        let c = ctx.process(ctx.send(&genesis, &LedgerContext::key(3), 1));

        let blocks = collect(&*ctx.ledger, &c.hash()).unwrap();
        assert_eq!(hashes(&blocks), vec![a.hash(), b.hash(), c.hash()]);
    }

    #[test]
    fn stops_at_cemented_frontier() {
        let ctx = LedgerContext::new();
        let genesis = ctx.genesis_account();
        let a = ctx.process(ctx.send(&genesis, &LedgerContext::key(1), 1));
        let b = ctx.process(ctx.send(&genesis, &LedgerContext::key(2), 1));
        ctx.cement(&a);

        let blocks = collect(&*ctx.ledger, &b.hash()).unwrap();
        assert_eq!(hashes(&blocks), vec![b.hash()]);
    }

    #[test]
    fn sources_come_before_receives() {
        let ctx = LedgerContext::new();
        let genesis = ctx.genesis_account();
        let key = LedgerContext::key(1);
        let send = ctx.process(ctx.send(&genesis, &key, 10));
        let open = ctx.process(ctx.open(&key, &send));
        let change = ctx.process(ctx.change(&key, &genesis));

        let blocks = collect(&*ctx.ledger, &change.hash()).unwrap();
        assert_eq!(hashes(&blocks), vec![send.hash(), open.hash(), change.hash()]);
    }
}
