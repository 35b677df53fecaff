use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use salesflow_core::{Table, Value};
use serde_json::{Map, Value as JsonValue};

use crate::error::ReadError;

/// Read a JSON file into a table.
///
/// Accepted layouts:
/// - an array of records: `[{"quantity": 1, "value": 2.5}, ...]`
/// - column-oriented objects: `{"quantity": {"0": 1, "1": 2}, ...}` or
///   `{"quantity": [1, 2], ...}`
/// - newline-delimited records, one object per line (a single object whose
///   values are all scalars is one record)
pub fn read_json(path: &Path) -> Result<Table, ReadError> {
    let text = std::fs::read_to_string(path)?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Table::default());
    }

    match serde_json::from_str::<JsonValue>(trimmed) {
        Ok(JsonValue::Array(items)) => records_to_table(items),
        // A lone record, e.g. a one-line NDJSON file.
        Ok(JsonValue::Object(map)) if !map.is_empty() && map.values().all(is_scalar) => {
            records_to_table(vec![JsonValue::Object(map)])
        }
        Ok(JsonValue::Object(map)) => columns_to_table(map),
        Ok(other) => Err(ReadError::InvalidJsonShape(format!(
            "expected array or object at top level, found {}",
            kind_name(&other)
        ))),
        // More than one top-level value: treat as one record per line.
        Err(_) if trimmed.starts_with('{') && trimmed.lines().count() > 1 => {
            let mut items = Vec::new();
            for line in trimmed.lines().map(str::trim).filter(|l| !l.is_empty()) {
                items.push(serde_json::from_str(line)?);
            }
            records_to_table(items)
        }
        Err(e) => Err(ReadError::Json(e)),
    }
}

fn records_to_table(items: Vec<JsonValue>) -> Result<Table, ReadError> {
    let mut records: Vec<Map<String, JsonValue>> = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        match item {
            JsonValue::Object(map) => records.push(map),
            other => {
                return Err(ReadError::InvalidJsonShape(format!(
                    "record {i} is {}, expected object",
                    kind_name(&other)
                )))
            }
        }
    }

    let columns: IndexSet<String> = records
        .iter()
        .flat_map(|r| r.keys().cloned())
        .collect();

    let mut table = Table::new(columns.iter().cloned().collect());
    for mut record in records {
        let row = columns
            .iter()
            .map(|c| record.remove(c).map(to_value).unwrap_or(Value::Null))
            .collect();
        table.push_row(row)?;
    }
    Ok(table)
}

fn columns_to_table(map: Map<String, JsonValue>) -> Result<Table, ReadError> {
    // Row labels in first-seen order, each column keyed by label.
    let mut labels: IndexSet<String> = IndexSet::new();
    let mut columns: IndexMap<String, IndexMap<String, JsonValue>> = IndexMap::new();

    for (name, cells) in map {
        let cells: IndexMap<String, JsonValue> = match cells {
            JsonValue::Object(inner) => inner.into_iter().collect(),
            JsonValue::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            other => {
                return Err(ReadError::InvalidJsonShape(format!(
                    "column '{name}' is {}, expected object or array",
                    kind_name(&other)
                )))
            }
        };
        labels.extend(cells.keys().cloned());
        columns.insert(name, cells);
    }

    let mut table = Table::new(columns.keys().cloned().collect());
    for label in &labels {
        let row = columns
            .values_mut()
            .map(|cells| cells.swap_remove(label).map(to_value).unwrap_or(Value::Null))
            .collect();
        table.push_row(row)?;
    }
    Ok(table)
}

fn to_value(json: JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Boolean(b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
        },
        JsonValue::String(s) => Value::Text(s),
        nested @ (JsonValue::Array(_) | JsonValue::Object(_)) => Value::Text(nested.to_string()),
    }
}

fn is_scalar(v: &JsonValue) -> bool {
    !matches!(v, JsonValue::Array(_) | JsonValue::Object(_))
}

fn kind_name(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
