use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    /// The sink cannot be used as configured. Raised before any row is sent.
    #[error("sink not configured: {0}")]
    Configuration(String),

    #[error("failed to connect to sink: {0}")]
    Connect(#[source] sqlx::Error),

    /// A write failed; the enclosing transaction was rolled back.
    #[error("sink write failed: {0}")]
    Write(#[from] sqlx::Error),

    #[error("sink rejected table: {0}")]
    Rejected(String),
}
