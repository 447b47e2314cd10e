use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger error: {0}")]
    Ledger(#[from] lattice_ledger::LedgerError),

    #[error("consensus error: {0}")]
    Consensus(#[from] lattice_consensus::ConsensusError),

    #[error("store error: {0}")]
    Store(#[from] lattice_store::StoreError),

    #[error("metrics error: {0}")]
    Metrics(String),

    #[error("logging error: {0}")]
    Logging(String),

    /// Persisted state contradicts what the caller observed. Never recoverable.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl From<prometheus::Error> for NodeError {
    fn from(e: prometheus::Error) -> Self {
        NodeError::Metrics(e.to_string())
    }
}
