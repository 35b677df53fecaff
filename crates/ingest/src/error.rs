use salesflow_core::TableError;
use thiserror::Error;

/// Errors reading a tabular file into a [`Table`](salesflow_core::Table).
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported JSON layout: {0}")]
    InvalidJsonShape(String),

    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("table error: {0}")]
    Table(#[from] TableError),
}

/// Errors deriving the computed column.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("table error: {0}")]
    Table(#[from] TableError),
}

/// Errors syncing the remote folder into the local directory.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("invalid folder locator '{0}'")]
    InvalidLocator(String),

    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
