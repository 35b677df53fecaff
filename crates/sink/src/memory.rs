use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use salesflow_core::Table;

use crate::error::SinkError;
use crate::traits::TableSink;

/// In-process sink that keeps appended tables in memory.
///
/// Used for tests and local dry runs. Append calls can be made to fail by
/// index to exercise write-failure handling.
#[derive(Default)]
pub struct MemorySink {
    tables: Mutex<BTreeMap<String, Vec<Table>>>,
    calls: Mutex<usize>,
    fail_on: Vec<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the append calls with these zero-based indexes.
    pub fn failing_on(calls: impl IntoIterator<Item = usize>) -> Self {
        Self {
            fail_on: calls.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Tables appended to `destination`, in append order.
    pub fn appended(&self, destination: &str) -> Vec<Table> {
        self.tables
            .lock()
            .unwrap()
            .get(destination)
            .cloned()
            .unwrap_or_default()
    }

    pub fn row_count(&self, destination: &str) -> usize {
        self.appended(destination).iter().map(Table::num_rows).sum()
    }

    /// Number of append calls received, failed ones included.
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl TableSink for MemorySink {
    async fn append(&self, table: &Table, destination: &str) -> Result<u64, SinkError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls - 1
        };
        if self.fail_on.contains(&call) {
            return Err(SinkError::Rejected(format!("append #{call} configured to fail")));
        }

        self.tables
            .lock()
            .unwrap()
            .entry(destination.to_string())
            .or_default()
            .push(table.clone());
        Ok(table.num_rows() as u64)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
