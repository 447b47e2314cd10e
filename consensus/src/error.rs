use lattice_ledger::LedgerError;
use lattice_types::QualifiedRoot;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("no active election for root {0}")]
    ElectionNotFound(QualifiedRoot),

    #[error("election manager is stopped")]
    Stopped,

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
