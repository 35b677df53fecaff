use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TableError;

/// A single scalar cell. Source data arrives in several formats but every
/// reader lowers it to these variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Float cell, with NaN stored as null. NaN is how dataframe writers
    /// encode missing floats, and what `0 * inf` produces.
    pub fn float(v: f64) -> Value {
        if v.is_nan() {
            Value::Null
        } else {
            Value::Float(v)
        }
    }

    /// Numeric view of the cell. Numeric text is parsed; booleans and
    /// non-numeric text have no numeric value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) if f.is_nan() => None,
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|f| !f.is_nan()),
            Value::Boolean(_) | Value::Null => None,
        }
    }

    /// Infer a typed value from raw text, the way a dataframe reader would
    /// for a delimited file: empty is null, then integer, float, boolean,
    /// and finally text.
    pub fn infer(raw: &str) -> Value {
        let s = raw.trim();
        if s.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Value::float(f);
        }
        match s {
            "true" | "True" | "TRUE" => Value::Boolean(true),
            "false" | "False" | "FALSE" => Value::Boolean(false),
            _ => Value::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// In-memory relation: named columns and rows in source order.
///
/// Rows are stored positionally; every row has exactly one value per column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, TableError> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                expected: self.columns.len(),
                got: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Cell lookup by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// All values of one column, top to bottom.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |r| &r[idx]))
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<(), TableError> {
        if from == to {
            return Ok(());
        }
        if self.has_column(to) {
            return Err(TableError::DuplicateColumn(to.to_string()));
        }
        let idx = self
            .column_index(from)
            .ok_or_else(|| TableError::ColumnNotFound(from.to_string()))?;
        self.columns[idx] = to.to_string();
        Ok(())
    }

    /// Replace a column's values in place, or append it as the last column.
    pub fn set_column(&mut self, name: &str, values: Vec<Value>) -> Result<(), TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::ColumnLength {
                expected: self.rows.len(),
                got: values.len(),
            });
        }
        match self.column_index(name) {
            Some(idx) => {
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row[idx] = v;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, v) in self.rows.iter_mut().zip(values) {
                    row.push(v);
                }
            }
        }
        Ok(())
    }
}
