use std::path::Path;

use salesflow_core::{Table, Value};

use crate::error::ReadError;

/// Read a comma-separated file with a header row.
///
/// Cell types are inferred per column: a column whose non-empty cells are
/// all integers stays integer, mixed integers and floats become floats, all
/// booleans stay boolean, and anything else keeps the raw text. Empty cells
/// are null.
pub fn read_csv(path: &Path) -> Result<Table, ReadError> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut raw_rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        raw_rows.push(record.iter().map(str::to_string).collect());
    }

    let kinds: Vec<ColumnKind> = (0..columns.len())
        .map(|i| ColumnKind::infer(raw_rows.iter().map(|r| r[i].as_str())))
        .collect();

    let mut table = Table::new(columns);
    for raw in raw_rows {
        let row = raw
            .iter()
            .zip(&kinds)
            .map(|(cell, kind)| kind.convert(cell))
            .collect();
        table.push_row(row)?;
    }
    Ok(table)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Text,
}

impl ColumnKind {
    fn infer<'a>(cells: impl Iterator<Item = &'a str>) -> Self {
        let mut kind: Option<ColumnKind> = None;
        for cell in cells {
            let cell_kind = match Value::infer(cell) {
                Value::Null => continue,
                Value::Integer(_) => ColumnKind::Integer,
                Value::Float(_) => ColumnKind::Float,
                Value::Boolean(_) => ColumnKind::Boolean,
                Value::Text(_) => return ColumnKind::Text,
            };
            kind = Some(match (kind, cell_kind) {
                (None, k) => k,
                (Some(a), b) if a == b => a,
                (Some(ColumnKind::Integer), ColumnKind::Float)
                | (Some(ColumnKind::Float), ColumnKind::Integer) => ColumnKind::Float,
                _ => return ColumnKind::Text,
            });
        }
        // An all-empty column carries no type information.
        kind.unwrap_or(ColumnKind::Text)
    }

    fn convert(self, cell: &str) -> Value {
        if cell.trim().is_empty() {
            return Value::Null;
        }
        match (self, Value::infer(cell)) {
            (ColumnKind::Float, Value::Integer(i)) => Value::Float(i as f64),
            (ColumnKind::Text, _) => Value::Text(cell.to_string()),
            (_, v) => v,
        }
    }
}
