//! PostgreSQL sink: appends tables with batched multi-row INSERTs inside one
//! transaction per table.

use std::collections::HashMap;

use async_trait::async_trait;
use salesflow_core::config::SinkConfig;
use salesflow_core::{Table, Value};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::query_builder::Separated;
use sqlx::{Postgres, QueryBuilder};
use tracing::{debug, info};

use crate::error::SinkError;
use crate::traits::TableSink;

/// PostgreSQL caps a statement at 65535 bind parameters.
const MAX_BIND_PARAMS: usize = 65_535;

/// SQL type chosen for a destination column, inferred from the table's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    BigInt,
    Double,
    Boolean,
    Text,
}

impl ColumnType {
    /// Narrowest type covering every non-null value, or `None` when the
    /// column is entirely null.
    pub fn observe<'a>(values: impl IntoIterator<Item = &'a Value>) -> Option<Self> {
        let mut ty: Option<ColumnType> = None;
        for v in values {
            let vt = match v {
                Value::Null => continue,
                Value::Integer(_) => ColumnType::BigInt,
                Value::Float(_) => ColumnType::Double,
                Value::Boolean(_) => ColumnType::Boolean,
                Value::Text(_) => return Some(ColumnType::Text),
            };
            ty = Some(match ty {
                None => vt,
                Some(current) => current.widen(vt),
            });
            if ty == Some(ColumnType::Text) {
                break;
            }
        }
        ty
    }

    /// Smallest type holding values of both. Integers mixed with floats
    /// become doubles; any other mix becomes text.
    pub fn widen(self, other: ColumnType) -> ColumnType {
        match (self, other) {
            (a, b) if a == b => a,
            (ColumnType::BigInt, ColumnType::Double) | (ColumnType::Double, ColumnType::BigInt) => {
                ColumnType::Double
            }
            _ => ColumnType::Text,
        }
    }

    /// Map an `information_schema.columns.data_type` name. Types the sink
    /// never creates are handled as text.
    pub fn from_pg(data_type: &str) -> Self {
        match data_type {
            "bigint" | "integer" | "smallint" => ColumnType::BigInt,
            "double precision" | "real" | "numeric" => ColumnType::Double,
            "boolean" => ColumnType::Boolean,
            _ => ColumnType::Text,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            ColumnType::BigInt => "BIGINT",
            ColumnType::Double => "DOUBLE PRECISION",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Text => "TEXT",
        }
    }
}

/// Quote an SQL identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql(destination: &str, columns: &[String], types: &[ColumnType]) -> String {
    let defs: Vec<String> = columns
        .iter()
        .zip(types)
        .map(|(c, t)| format!("{} {}", quote_ident(c), t.sql()))
        .collect();
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(destination),
        defs.join(", ")
    )
}

fn add_column_sql(destination: &str, column: &str, ty: ColumnType) -> String {
    format!(
        "ALTER TABLE {} ADD COLUMN IF NOT EXISTS {} {}",
        quote_ident(destination),
        quote_ident(column),
        ty.sql()
    )
}

fn alter_column_sql(destination: &str, column: &str, ty: ColumnType) -> String {
    let col = quote_ident(column);
    format!(
        "ALTER TABLE {} ALTER COLUMN {col} TYPE {ty} USING {col}::{ty}",
        quote_ident(destination),
        ty = ty.sql()
    )
}

fn insert_prefix(destination: &str, columns: &[String]) -> String {
    let cols: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    format!("INSERT INTO {} ({}) ", quote_ident(destination), cols.join(", "))
}

fn push_typed(b: &mut Separated<'_, '_, Postgres, &'static str>, value: &Value, ty: ColumnType) {
    match ty {
        ColumnType::BigInt => {
            let v = match value {
                Value::Integer(i) => Some(*i),
                _ => None,
            };
            b.push_bind(v);
        }
        ColumnType::Double => {
            b.push_bind(value.as_f64());
        }
        ColumnType::Boolean => {
            let v = match value {
                Value::Boolean(x) => Some(*x),
                _ => None,
            };
            b.push_bind(v);
        }
        ColumnType::Text => {
            let v = (!value.is_null()).then(|| value.to_string());
            b.push_bind(v);
        }
    }
}

/// Appends tables to PostgreSQL. One pool per run.
pub struct PostgresSink {
    pool: PgPool,
    batch_size: usize,
}

impl PostgresSink {
    /// Validate the configuration, then connect. A missing connection
    /// string fails before any network activity.
    pub async fn connect(config: &SinkConfig) -> Result<Self, SinkError> {
        let url = Self::validate(config)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect(url)
            .await
            .map_err(SinkError::Connect)?;

        info!(
            "PostgreSQL sink connected: {}",
            config.redacted_url().unwrap_or_default()
        );
        Ok(Self {
            pool,
            batch_size: config.batch_size.max(1),
        })
    }

    /// Check that the configuration is usable and return the connection string.
    pub fn validate(config: &SinkConfig) -> Result<&str, SinkError> {
        let url = config
            .database_url
            .as_deref()
            .ok_or_else(|| SinkError::Configuration("DATABASE_URL is not set".into()))?;
        if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
            return Err(SinkError::Configuration(format!(
                "DATABASE_URL must be a postgres:// connection string, got '{}'",
                config.redacted_url().unwrap_or_default()
            )));
        }
        if config.table.trim().is_empty() {
            return Err(SinkError::Configuration("SINK_TABLE is empty".into()));
        }
        Ok(url)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn rows_per_statement(&self, num_columns: usize) -> usize {
        self.batch_size.min(MAX_BIND_PARAMS / num_columns.max(1)).max(1)
    }
}

#[async_trait]
impl TableSink for PostgresSink {
    async fn append(&self, table: &Table, destination: &str) -> Result<u64, SinkError> {
        let columns = table.columns();
        if columns.is_empty() {
            return Err(SinkError::Rejected("table has no columns".into()));
        }

        let observed: Vec<Option<ColumnType>> = (0..columns.len())
            .map(|i| ColumnType::observe(table.rows().iter().map(|r| &r[i])))
            .collect();
        let initial: Vec<ColumnType> = observed
            .iter()
            .map(|t| t.unwrap_or(ColumnType::Text))
            .collect();

        let mut tx = self.pool.begin().await?;

        sqlx::query(&create_table_sql(destination, columns, &initial))
            .execute(&mut *tx)
            .await?;

        let existing: HashMap<String, ColumnType> = sqlx::query_as::<_, (String, String)>(
            "SELECT column_name::text, data_type::text FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1",
        )
        .bind(destination)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(|(name, data_type)| (name, ColumnType::from_pg(&data_type)))
        .collect();

        // Final per-column type: the destination's, widened when this table
        // carries values it cannot hold.
        let mut types = Vec::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            let ty = match (existing.get(column), observed[i]) {
                (None, _) => {
                    sqlx::query(&add_column_sql(destination, column, initial[i]))
                        .execute(&mut *tx)
                        .await?;
                    initial[i]
                }
                (Some(&current), None) => current,
                (Some(&current), Some(seen)) => {
                    let widened = current.widen(seen);
                    if widened != current {
                        info!(
                            destination,
                            column = column.as_str(),
                            from = current.sql(),
                            to = widened.sql(),
                            "widening destination column"
                        );
                        sqlx::query(&alter_column_sql(destination, column, widened))
                            .execute(&mut *tx)
                            .await?;
                    }
                    widened
                }
            };
            types.push(ty);
        }

        let prefix = insert_prefix(destination, columns);
        let mut written = 0u64;
        for chunk in table.rows().chunks(self.rows_per_statement(columns.len())) {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(prefix.as_str());
            qb.push_values(chunk, |mut b, row| {
                for (value, ty) in row.iter().zip(&types) {
                    push_typed(&mut b, value, *ty);
                }
            });
            let result = qb.build().execute(&mut *tx).await?;
            written += result.rows_affected();
        }

        tx.commit().await?;
        debug!(destination, rows = written, "appended table");
        Ok(written)
    }

    fn name(&self) -> &str {
        "postgres"
    }
}
