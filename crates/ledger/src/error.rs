use thiserror::Error;

/// Errors produced by [`Ledger`](crate::Ledger) operations. All of them are
/// fatal to a run.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A second commit for the same file name. Indicates an orchestration bug.
    #[error("file already recorded in ledger: {0}")]
    DuplicateRecord(String),
}
