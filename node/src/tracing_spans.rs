//! Named [`tracing::Span`] constructors for the node's hot paths.
//!
//! Consistent span names and fields make traces easy to filter and to
//! correlate across the cementing worker and the network-facing loops.

use lattice_types::{Account, BlockHash};
use tracing::{debug_span, info_span, Span};

/// One cementing pass for a confirmed target block.
pub fn cementation_span(target: &BlockHash, unbounded: bool) -> Span {
    info_span!("cementation", target = %target, unbounded)
}

/// A vote routed through the election manager.
pub fn vote_span(voter: &Account, hashes: usize) -> Span {
    debug_span!("vote", voter = %voter, hashes)
}

/// One pass of the confirmation request loop.
pub fn request_loop_span(elections: usize) -> Span {
    debug_span!("confirmation_request_loop", elections)
}
