use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{error, info};

use salesflow_core::config::LedgerConfig;

use crate::error::LedgerError;

/// One processed file. Created once at commit time and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedFileRecord {
    pub file_name: String,
    pub processing_time: DateTime<Utc>,
}

/// SQLite-backed ledger of processed file names.
///
/// `file_name` is the primary key, so a duplicate commit fails with
/// [`LedgerError::DuplicateRecord`] instead of silently adding a row.
pub struct Ledger {
    pool: SqlitePool,
    path: PathBuf,
}

impl Ledger {
    /// Open (creating if missing) the ledger database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        // Single writer.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        info!("Ledger opened: {}", path.display());
        Ok(Self { pool, path })
    }

    /// Open the ledger described by `config` and make sure its table exists.
    pub async fn from_config(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let ledger = Self::open(&config.path).await?;
        ledger.ensure_schema().await?;
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create `file_history` if absent. Safe to call on every startup.
    pub async fn ensure_schema(&self) -> Result<(), LedgerError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS file_history (
                file_name       TEXT NOT NULL PRIMARY KEY,
                processing_time TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// True iff `file_name` was committed by this or any earlier run.
    pub async fn has_processed(&self, file_name: &str) -> Result<bool, LedgerError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM file_history WHERE file_name = ?1")
                .bind(file_name)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    /// Commit `file_name` with the current time.
    pub async fn record(&self, file_name: &str) -> Result<ProcessedFileRecord, LedgerError> {
        let record = ProcessedFileRecord {
            file_name: file_name.to_string(),
            processing_time: Utc::now(),
        };

        sqlx::query("INSERT INTO file_history (file_name, processing_time) VALUES (?1, ?2)")
            .bind(&record.file_name)
            .bind(record.processing_time)
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique_violation(e, file_name))?;

        Ok(record)
    }

    /// Every recorded file name, for bulk lookups.
    pub async fn processed_files(&self) -> Result<BTreeSet<String>, LedgerError> {
        let names: Vec<String> = sqlx::query_scalar("SELECT file_name FROM file_history")
            .fetch_all(&self.pool)
            .await?;
        Ok(names.into_iter().collect())
    }

    /// All records, oldest commit first.
    pub async fn records(&self) -> Result<Vec<ProcessedFileRecord>, LedgerError> {
        let rows: Vec<(String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT file_name, processing_time FROM file_history ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(file_name, processing_time)| ProcessedFileRecord {
                file_name,
                processing_time,
            })
            .collect())
    }

    pub async fn count(&self) -> Result<u64, LedgerError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM file_history")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    /// Close the pool and wait for the connection to shut down.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// Map a unique-key violation to [`LedgerError::DuplicateRecord`].
fn map_unique_violation(e: sqlx::Error, file_name: &str) -> LedgerError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            return LedgerError::DuplicateRecord(file_name.to_string());
        }
    }
    error!("ledger database error: {}", e);
    LedgerError::Database(e)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_temp() -> (tempfile::TempDir, Ledger) {
        let tmp = tempfile::tempdir().unwrap();
        let ledger = Ledger::open(tmp.path().join("ledger.db")).await.unwrap();
        ledger.ensure_schema().await.unwrap();
        (tmp, ledger)
    }

    #[tokio::test]
    async fn ensure_schema_is_idempotent() {
        let (_tmp, ledger) = open_temp().await;
        ledger.ensure_schema().await.unwrap();
        ledger.ensure_schema().await.unwrap();
        assert_eq!(ledger.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn record_then_has_processed() {
        let (_tmp, ledger) = open_temp().await;
        assert!(!ledger.has_processed("a.csv").await.unwrap());

        let rec = ledger.record("a.csv").await.unwrap();
        assert_eq!(rec.file_name, "a.csv");
        assert!(ledger.has_processed("a.csv").await.unwrap());
        assert!(!ledger.has_processed("A.csv").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_record_is_rejected() {
        let (_tmp, ledger) = open_temp().await;
        ledger.record("a.csv").await.unwrap();
        match ledger.record("a.csv").await {
            Err(LedgerError::DuplicateRecord(name)) => assert_eq!(name, "a.csv"),
            other => panic!("expected DuplicateRecord, got {other:?}"),
        }
        assert_eq!(ledger.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("state").join("ledger.db");

        let first = Ledger::open(&path).await.unwrap();
        first.ensure_schema().await.unwrap();
        first.record("b.csv").await.unwrap();
        first.close().await;

        let second = Ledger::open(&path).await.unwrap();
        second.ensure_schema().await.unwrap();
        assert!(second.has_processed("b.csv").await.unwrap());
        assert_eq!(second.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn records_in_commit_order() {
        let (_tmp, ledger) = open_temp().await;
        ledger.record("z.json").await.unwrap();
        ledger.record("a.csv").await.unwrap();

        let names: Vec<String> = ledger
            .records()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.file_name)
            .collect();
        assert_eq!(names, vec!["z.json", "a.csv"]);

        let set = ledger.processed_files().await.unwrap();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec!["a.csv", "z.json"]);
    }

    #[tokio::test]
    async fn processing_time_round_trips() {
        let (_tmp, ledger) = open_temp().await;
        let before = Utc::now();
        let rec = ledger.record("c.parquet").await.unwrap();
        let stored = ledger.records().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].processing_time >= before - chrono::Duration::seconds(1));
        assert_eq!(stored[0].file_name, rec.file_name);
    }

    #[tokio::test]
    async fn from_config_creates_schema() {
        let tmp = tempfile::tempdir().unwrap();
        let config = LedgerConfig {
            path: tmp.path().join("ledger.db"),
        };
        let ledger = Ledger::from_config(&config).await.unwrap();
        assert!(!ledger.has_processed("x.csv").await.unwrap());
        assert!(ledger.path().exists());
    }
}
