use async_trait::async_trait;
use salesflow_core::Table;

use crate::error::SinkError;

/// Destination for transformed tables.
///
/// Implementations must append: existing destination rows are never
/// updated, replaced or truncated. A failed append must leave no rows
/// behind.
#[async_trait]
pub trait TableSink: Send + Sync {
    /// Append all rows of `table` to `destination`, returning the number of
    /// rows written.
    async fn append(&self, table: &Table, destination: &str) -> Result<u64, SinkError>;

    /// Short identifier for logs.
    fn name(&self) -> &str;
}
