pub mod config;
pub mod error;
pub mod format;
pub mod table;

pub use config::Config;
pub use error::*;
pub use format::{CandidateFile, FileFormat};
pub use table::{Table, Value};
