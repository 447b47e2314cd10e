//! The running node: interval loops and the cementing thread together.

use std::sync::Arc;
use std::time::Duration;

use lattice_consensus::{RecordingPublishFilter, RecordingSolicitor, VoteCode, VoteSource};
use lattice_ledger::{LedgerContext, ProcessResult};
use lattice_node::{LatticeNode, NodeConfig};
use lattice_nullables::NullClock;
use lattice_types::Vote;

async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn local_block_is_solicited_confirmed_and_cemented() {
    let ctx = LedgerContext::new();
    let solicitor = Arc::new(RecordingSolicitor::new());
    let config = NodeConfig {
        confirmation_request_interval_ms: 10,
        dependency_activation_interval_ms: 10,
        ..NodeConfig::dev()
    };
    let node = LatticeNode::new(
        config,
        Arc::clone(&ctx.ledger),
        Arc::new(NullClock::new(1_000)),
        solicitor.clone(),
        Arc::new(RecordingPublishFilter::new()),
    );
    node.start().unwrap();

    let genesis = ctx.genesis_account();
    let send = ctx.send(&genesis, &LedgerContext::key(1), 100);
    let hash = send.hash();
    let root = send.qualified_root();
    assert_eq!(node.process_local(send).unwrap(), ProcessResult::Progress);

    assert!(wait_until(|| solicitor.requests().contains(&root)).await);

    let code = node.vote(&Vote::new_final(genesis, vec![hash]), VoteSource::Live);
    assert_eq!(code, VoteCode::Vote);
    assert!(wait_until(|| ctx.ledger.block_confirmed(&hash)).await);
    assert!(wait_until(|| node.active.is_empty()).await);

    let text = node.metrics.encode().unwrap();
    assert!(text.contains("lattice_block_count"));

    node.stop().await;
    assert!(node.shutdown.is_triggered());
}

#[tokio::test]
async fn stop_without_work_returns_promptly() {
    let node = LatticeNode::new_dev(NodeConfig::dev()).unwrap();
    node.start().unwrap();
    tokio::time::timeout(Duration::from_secs(5), node.stop())
        .await
        .expect("node stops");
    assert!(node.active.is_stopped());
}

#[tokio::test]
async fn confirmed_fork_is_resolved_and_cemented_by_the_running_node() {
    let ctx = LedgerContext::new();
    let node = LatticeNode::new(
        NodeConfig::dev(),
        Arc::clone(&ctx.ledger),
        Arc::new(NullClock::new(1_000)),
        Arc::new(RecordingSolicitor::new()),
        Arc::new(RecordingPublishFilter::new()),
    );
    node.start().unwrap();

    let genesis = ctx.genesis();
    let applied = ctx.send_from(&genesis, &LedgerContext::key(1), 10);
    let applied_hash = applied.hash();
    let fork = Arc::new(ctx.send_from(&genesis, &LedgerContext::key(2), 20));
    assert_eq!(node.process_local(applied).unwrap(), ProcessResult::Progress);
    node.active.insert(&fork);

    let code = node.vote(
        &Vote::new_final(ctx.genesis_account(), vec![fork.hash()]),
        VoteSource::Live,
    );
    assert_eq!(code, VoteCode::Vote);
    assert!(wait_until(|| ctx.ledger.block_confirmed(&fork.hash())).await);
    assert!(!ctx.ledger.block_exists(&applied_hash));
    assert_eq!(node.active.forced_winners_len(), 0);

    node.stop().await;
}
