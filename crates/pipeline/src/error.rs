use std::path::PathBuf;

use salesflow_core::ConfigError;
use salesflow_ingest::{ReadError, SourceError, TransformError};
use salesflow_ledger::LedgerError;
use salesflow_sink::SinkError;
use thiserror::Error;

use crate::outcome::RunReport;

/// Failures that stop the job before any file is touched.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("sink unavailable: {0}")]
    Sink(#[from] SinkError),

    #[error("ledger unavailable: {0}")]
    Ledger(#[from] LedgerError),

    #[error("folder sync failed: {0}")]
    Source(#[from] SourceError),

    #[error("cannot list {}: {source}", .path.display())]
    Listing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Why a single file could not be processed. Recorded in the file's
/// outcome; never escapes a continue-on-error run.
#[derive(Error, Debug)]
pub enum FileError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("read task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Startup(#[from] StartupError),

    #[error("listing task failed: {0}")]
    Task(#[source] tokio::task::JoinError),

    /// The ledger failed mid-run, including a duplicate commit.
    #[error("ledger failure: {0}")]
    Ledger(#[source] LedgerError),

    /// Fail-fast policy: the run stopped at the first failed file.
    #[error("run aborted after {file} failed: {reason}")]
    Aborted {
        file: String,
        reason: String,
        report: RunReport,
    },
}
