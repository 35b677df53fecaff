use std::path::Path;

use salesflow_core::config::ErrorPolicy;
use salesflow_core::{CandidateFile, Config, Table};
use salesflow_ingest::{list_candidates, read_file, Transformer};
use salesflow_ledger::Ledger;
use salesflow_sink::TableSink;
use tracing::{debug, info, warn};

use crate::error::{FileError, PipelineError, StartupError};
use crate::outcome::{FileOutcome, RunReport};

/// One pass over a local directory.
///
/// A file is recorded in the ledger only after the sink accepted its rows,
/// so a crash between the two leaves the file eligible for the next run.
pub struct Pipeline<'a> {
    ledger: &'a Ledger,
    sink: &'a dyn TableSink,
    transformer: Transformer,
    destination: String,
    policy: ErrorPolicy,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &Config, ledger: &'a Ledger, sink: &'a dyn TableSink) -> Self {
        Self {
            ledger,
            sink,
            transformer: Transformer::new(&config.transform),
            destination: config.sink.table.clone(),
            policy: config.pipeline.error_policy,
        }
    }

    /// List `directory` and process every candidate in name order.
    pub async fn run(&self, directory: &Path) -> Result<RunReport, PipelineError> {
        let dir = directory.to_path_buf();
        let candidates = tokio::task::spawn_blocking(move || list_candidates(&dir))
            .await
            .map_err(PipelineError::Task)?
            .map_err(|source| StartupError::Listing {
                path: directory.to_path_buf(),
                source,
            })?;
        self.run_candidates(&candidates).await
    }

    pub async fn run_candidates(
        &self,
        candidates: &[CandidateFile],
    ) -> Result<RunReport, PipelineError> {
        info!(
            files = candidates.len(),
            sink = self.sink.name(),
            destination = %self.destination,
            output = self.transformer.output_column(),
            "starting run"
        );

        let mut report = RunReport::default();
        for candidate in candidates {
            let file_name = candidate.file_name();

            if self
                .ledger
                .has_processed(&file_name)
                .await
                .map_err(PipelineError::Ledger)?
            {
                let outcome = FileOutcome::skipped(file_name);
                info!("{outcome}");
                report.push(outcome);
                continue;
            }

            match self.process(candidate).await {
                Ok(rows) => {
                    self.ledger
                        .record(&file_name)
                        .await
                        .map_err(PipelineError::Ledger)?;
                    let outcome = FileOutcome::processed(file_name, rows);
                    info!(rows, "{outcome}");
                    report.push(outcome);
                }
                Err(e) => {
                    let reason = e.to_string();
                    let outcome = FileOutcome::failed(file_name.clone(), reason.clone());
                    warn!("{outcome}");
                    report.push(outcome);
                    if self.policy == ErrorPolicy::FailFast {
                        return Err(PipelineError::Aborted {
                            file: file_name,
                            reason,
                            report,
                        });
                    }
                }
            }
        }

        info!(
            processed = report.processed(),
            skipped = report.skipped(),
            failed = report.failed(),
            rows = report.rows_written(),
            "run complete"
        );
        Ok(report)
    }

    async fn process(&self, candidate: &CandidateFile) -> Result<u64, FileError> {
        let path = candidate.path.clone();
        let format = candidate.format;
        let transformer = self.transformer.clone();
        let table = tokio::task::spawn_blocking(move || -> Result<Table, FileError> {
            let table = read_file(&path, format)?;
            debug!(
                file = %path.display(),
                rows = table.num_rows(),
                columns = table.num_columns(),
                "read table"
            );
            Ok(transformer.transform(table)?)
        })
        .await??;

        let rows = self.sink.append(&table, &self.destination).await?;
        Ok(rows)
    }
}
