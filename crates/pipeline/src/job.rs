use salesflow_core::Config;
use salesflow_ingest::source::sync_configured;
use salesflow_ledger::Ledger;
use salesflow_sink::{PostgresSink, TableSink};
use tracing::info;

use crate::error::{PipelineError, StartupError};
use crate::orchestrator::Pipeline;
use crate::outcome::RunReport;

/// Full job against the configured Postgres sink.
///
/// Sink configuration is checked before anything is downloaded, read or
/// written, so a missing `DATABASE_URL` leaves no ledger behind.
pub async fn run_job(config: &Config) -> Result<RunReport, PipelineError> {
    PostgresSink::validate(&config.sink).map_err(StartupError::from)?;
    let sink = PostgresSink::connect(&config.sink)
        .await
        .map_err(StartupError::from)?;

    let result = run_with_sink(config, &sink).await;
    sink.close().await;
    result
}

/// Sync, open the ledger, run once and close the ledger, with any sink.
pub async fn run_with_sink(
    config: &Config,
    sink: &dyn TableSink,
) -> Result<RunReport, PipelineError> {
    let synced = sync_configured(&config.source)
        .await
        .map_err(StartupError::from)?;
    if !synced.is_empty() {
        info!(files = synced.len(), "folder synced");
    }

    let ledger = Ledger::from_config(&config.ledger)
        .await
        .map_err(StartupError::from)?;

    let result = Pipeline::new(config, &ledger, sink)
        .run(&config.source.local_directory)
        .await;
    ledger.close().await;
    result
}
