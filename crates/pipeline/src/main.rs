use anyhow::Context;
use clap::Parser;
use salesflow_core::config::load_dotenv;
use salesflow_core::Config;
use salesflow_pipeline::{run_job, PipelineError};
use tracing_subscriber::EnvFilter;

/// Load csv/json/parquet sales files, compute total_sales and append them
/// to Postgres, skipping files already processed.
#[derive(Parser, Debug)]
#[command(name = "salesflow", version, about)]
struct Cli {}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _cli = Cli::parse();
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    config.log_summary();

    match run_job(&config).await {
        Ok(report) => {
            for line in report.log_lines() {
                println!("{line}");
            }
            Ok(())
        }
        Err(PipelineError::Aborted {
            file,
            reason,
            report,
        }) => {
            for line in report.log_lines() {
                println!("{line}");
            }
            anyhow::bail!("run aborted at {file}: {reason}")
        }
        Err(e) => Err(e).context("sales job failed"),
    }
}
