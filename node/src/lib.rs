//! Lattice node: cements consensus winners and drives the election manager.
//!
//! The node owns:
//! - The ledger and the write turn arbiter shared by every writer
//! - The election manager from `lattice-consensus`
//! - The confirmation height processor, a dedicated thread that raises
//!   per-account confirmation heights in causal order
//! - Periodic loops for confirmation requests and dependency activation
//! - Configuration, logging, metrics and shutdown

pub mod config;
pub mod confirmation_height;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod shutdown;
pub mod tracing_spans;

pub use config::{ConfirmationHeightConfig, NodeConfig};
pub use confirmation_height::{
    AlreadyCementedObserver, BlockCementedObserver, ChainWalker, ConfirmationHeightMode,
    ConfirmationHeightProcessor,
};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::LatticeNode;
pub use shutdown::ShutdownController;
