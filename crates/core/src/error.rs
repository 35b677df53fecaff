use thiserror::Error;

/// Errors raised while building the job configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid column alias '{0}': expected alias=canonical")]
    InvalidAlias(String),

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

/// Errors raised by [`Table`](crate::Table) mutations.
#[derive(Error, Debug, PartialEq)]
pub enum TableError {
    #[error("row has {got} values but table has {expected} columns")]
    RowWidth { expected: usize, got: usize },

    #[error("column has {got} values but table has {expected} rows")]
    ColumnLength { expected: usize, got: usize },

    #[error("column already exists: {0}")]
    DuplicateColumn(String),

    #[error("column not found: {0}")]
    ColumnNotFound(String),
}
