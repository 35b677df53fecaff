//! Format dispatch: turn a file on disk into a [`Table`].
//!
//! Column names are kept exactly as they appear in the source and rows stay
//! in source order. Any renaming happens later, in the transformer.

mod csv;
mod json;
mod parquet;

use std::path::Path;

use salesflow_core::{FileFormat, Table};
use tracing::debug;

use crate::error::ReadError;

pub use self::csv::read_csv;
pub use self::json::read_json;
pub use self::parquet::read_parquet;

/// Read `path` as the given format.
pub fn read_file(path: &Path, format: FileFormat) -> Result<Table, ReadError> {
    let table = match format {
        FileFormat::Csv => read_csv(path)?,
        FileFormat::Json => read_json(path)?,
        FileFormat::Parquet => read_parquet(path)?,
    };
    debug!(
        path = %path.display(),
        format = %format,
        rows = table.num_rows(),
        columns = table.num_columns(),
        "read table"
    );
    Ok(table)
}

/// Read `path`, picking the format from its extension. Never falls back to a
/// default format.
pub fn read_path(path: &Path) -> Result<Table, ReadError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_default();
    let format: FileFormat = ext.parse().map_err(ReadError::UnsupportedFormat)?;
    read_file(path, format)
}
