//! Derived column: `total_sales = quantity * value`.

use salesflow_core::config::{ColumnAliases, TransformConfig};
use salesflow_core::{Table, Value};
use tracing::debug;

use crate::error::TransformError;

/// Normalizes localized column names and appends the computed column.
#[derive(Debug, Clone)]
pub struct Transformer {
    quantity: String,
    value: String,
    output: String,
    aliases: ColumnAliases,
}

impl Transformer {
    pub fn new(config: &TransformConfig) -> Self {
        Self {
            quantity: config.quantity_column.clone(),
            value: config.value_column.clone(),
            output: config.output_column.clone(),
            aliases: config.aliases.clone(),
        }
    }

    pub fn output_column(&self) -> &str {
        &self.output
    }

    /// Rename aliased columns to their canonical names. An alias is left
    /// alone when the canonical column is already present.
    pub fn normalize(&self, table: &mut Table) -> Result<(), TransformError> {
        for (alias, canonical) in self.aliases.iter() {
            if !table.has_column(alias) {
                continue;
            }
            if table.has_column(canonical) {
                debug!(alias, canonical, "canonical column already present, alias kept as-is");
                continue;
            }
            table.rename_column(alias, canonical)?;
        }
        Ok(())
    }

    /// Normalize, then append (or overwrite) the output column. Rows where
    /// either operand is null or non-numeric get a null result.
    pub fn transform(&self, mut table: Table) -> Result<Table, TransformError> {
        self.normalize(&mut table)?;

        let q_idx = table
            .column_index(&self.quantity)
            .ok_or_else(|| TransformError::MissingColumn(self.quantity.clone()))?;
        let v_idx = table
            .column_index(&self.value)
            .ok_or_else(|| TransformError::MissingColumn(self.value.clone()))?;

        let totals: Vec<Value> = table
            .rows()
            .iter()
            .map(|row| multiply(&row[q_idx], &row[v_idx]))
            .collect();

        table.set_column(&self.output, totals)?;
        Ok(table)
    }
}

/// Integer times integer stays integer unless it overflows.
fn multiply(quantity: &Value, value: &Value) -> Value {
    if let (Value::Integer(q), Value::Integer(v)) = (quantity, value) {
        if let Some(product) = q.checked_mul(*v) {
            return Value::Integer(product);
        }
    }
    match (quantity.as_f64(), value.as_f64()) {
        (Some(q), Some(v)) => Value::float(q * v),
        _ => Value::Null,
    }
}
