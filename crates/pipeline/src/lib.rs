//! Idempotent batch run: list candidate files, skip the ones the ledger
//! already knows, and push the rest through read → transform → sink →
//! ledger commit, one file at a time.

pub mod error;
pub mod job;
pub mod orchestrator;
pub mod outcome;

pub use error::{FileError, PipelineError, StartupError};
pub use job::{run_job, run_with_sink};
pub use orchestrator::Pipeline;
pub use outcome::{FileOutcome, FileStatus, RunReport};
