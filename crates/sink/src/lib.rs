//! Append-only sinks for transformed tables.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod traits;

pub use error::SinkError;
pub use memory::MemorySink;
pub use postgres::PostgresSink;
pub use traits::TableSink;
