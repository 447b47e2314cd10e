//! Block-lattice ledger.
//!
//! Each account has its own chain. Blocks are applied asynchronously per
//! account; consensus is only needed when two blocks claim the same
//! position. The ledger also owns the per-account confirmation heights that
//! the cementing worker advances.

pub mod error;
pub mod genesis;
pub mod ledger;
pub mod ledger_context;
pub mod process;
pub mod rep_weights;
pub mod rollback;

pub use error::LedgerError;
pub use genesis::LedgerConstants;
pub use ledger::{Ledger, LedgerSummary};
pub use ledger_context::LedgerContext;
pub use process::ProcessResult;
pub use rep_weights::{RepWeights, WeightOracle};
