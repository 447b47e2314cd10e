//! Consensus: fork resolution by representative voting.
//!
//! - Each account delegates its balance to a representative.
//! - When two blocks claim the same chain position an election runs for
//!   that qualified root, and representatives vote on the candidates.
//! - A candidate is confirmed once its tally reaches the quorum share of
//!   online voting weight; the winner is then handed to cementing.
//!
//! ## Module overview
//!
//! - [`active_elections`]: the election manager (insertion, vote routing,
//!   scheduling, cementing callbacks).
//! - [`election`]: one election's candidates, votes and confirmation.
//! - [`ordered_elections`]: elections indexed by root and by priority.
//! - [`priority`]: adjusted multipliers for scheduling.
//! - [`vote_cache`]: votes that arrived before their election.
//! - [`recently_confirmed`], [`recently_cemented`]: bounded history.
//! - [`online_weight`]: which representatives are currently voting.
//! - [`collaborators`]: interfaces to the network and cementing layers.

pub mod active_elections;
pub mod collaborators;
pub mod config;
pub mod election;
pub mod error;
pub mod online_weight;
pub mod ordered_elections;
pub mod priority;
pub mod recently_cemented;
pub mod recently_confirmed;
pub mod vote_cache;
pub mod vote_info;

pub use active_elections::{
    ActiveElections, BlockConfirmed, Collaborators, ConfirmationObserver, InsertResult,
    PendingDependency,
};
pub use collaborators::{
    CementationQueue, ConfirmationSolicitor, PublishFilter, RecordingCementationQueue,
    RecordingPublishFilter, RecordingSolicitor,
};
pub use config::ActiveElectionsConfig;
pub use election::{Election, ElectionState, ElectionStatus, ElectionStatusType};
pub use error::ConsensusError;
pub use online_weight::OnlineWeightSampler;
pub use ordered_elections::OrderedElections;
pub use recently_cemented::RecentlyCemented;
pub use recently_confirmed::{RecentlyConfirmed, RecentlyDropped};
pub use vote_cache::VoteCache;
pub use vote_info::{VoteCode, VoteSource};
