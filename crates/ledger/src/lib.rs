//! Durable record of which files have already been processed.
//!
//! Backed by a single-file SQLite database holding one append-only table,
//! `file_history`. The orchestrator checks it before touching a file and
//! commits to it only after the file reached the sink.

pub mod error;
pub mod store;

pub use error::LedgerError;
pub use store::{Ledger, ProcessedFileRecord};
