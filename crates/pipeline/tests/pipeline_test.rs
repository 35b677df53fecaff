use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use salesflow_core::config::ErrorPolicy;
use salesflow_core::{Config, Value};
use salesflow_ledger::Ledger;
use salesflow_pipeline::{
    run_job, run_with_sink, FileStatus, Pipeline, PipelineError, StartupError,
};
use salesflow_sink::{MemorySink, SinkError};
use tempfile::TempDir;

const TABLE: &str = "calculated_sales";

struct Fixture {
    _tmp: TempDir,
    config: Config,
}

impl Fixture {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.source.local_directory = tmp.path().join("input");
        config.ledger.path = tmp.path().join("state").join("ledger.db");
        std::fs::create_dir_all(&config.source.local_directory).unwrap();
        Self { _tmp: tmp, config }
    }

    fn dir(&self) -> &Path {
        &self.config.source.local_directory
    }

    fn write(&self, name: &str, contents: &str) {
        std::fs::write(self.dir().join(name), contents).unwrap();
    }

    async fn ledger(&self) -> Ledger {
        Ledger::from_config(&self.config.ledger).await.unwrap()
    }
}

fn write_parquet(path: &Path) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("quantity", DataType::Int64, true),
        Field::new("value", DataType::Float64, true),
    ]));
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(vec![Some(2), None])),
            Arc::new(Float64Array::from(vec![Some(4.25), Some(1.0)])),
        ],
    )
    .unwrap();
    let mut writer = ArrowWriter::try_new(File::create(path).unwrap(), schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();
}

#[tokio::test]
async fn second_run_skips_everything() {
    let fx = Fixture::new();
    fx.write("a.csv", "quantity,value\n3,10.5\n1,2\n");
    fx.write("b.json", r#"[{"quantity": 2, "value": 5}]"#);

    let ledger = fx.ledger().await;
    let sink = MemorySink::new();
    let pipeline = Pipeline::new(&fx.config, &ledger, &sink);

    let first = pipeline.run(fx.dir()).await.unwrap();
    assert_eq!(first.processed(), 2);
    assert_eq!(sink.row_count(TABLE), 3);

    let second = pipeline.run(fx.dir()).await.unwrap();
    assert_eq!(second.skipped(), 2);
    assert_eq!(second.processed(), 0);
    assert_eq!(sink.row_count(TABLE), 3);
    assert_eq!(sink.calls(), 2);
    assert_eq!(ledger.count().await.unwrap(), 2);
}

#[tokio::test]
async fn ledgered_file_never_reaches_the_sink() {
    let fx = Fixture::new();
    fx.write("a.csv", "quantity,value\n1,1\n");
    fx.write("old.csv", "quantity,value\n9,9\n");

    let ledger = fx.ledger().await;
    ledger.record("old.csv").await.unwrap();
    let sink = MemorySink::new();

    let report = Pipeline::new(&fx.config, &ledger, &sink)
        .run(fx.dir())
        .await
        .unwrap();

    assert_eq!(
        report.log_lines(),
        vec![
            "File a.csv processed and saved.",
            "File old.csv has already been processed previously.",
        ]
    );
    assert_eq!(sink.calls(), 1);
    assert_eq!(sink.row_count(TABLE), 1);
}

#[tokio::test]
async fn computes_total_sales_with_nulls() {
    let fx = Fixture::new();
    fx.write("sales.csv", "quantity,value\n3,10.5\n,4\n");

    let ledger = fx.ledger().await;
    let sink = MemorySink::new();
    Pipeline::new(&fx.config, &ledger, &sink)
        .run(fx.dir())
        .await
        .unwrap();

    let tables = sink.appended(TABLE);
    assert_eq!(tables.len(), 1);
    let table = &tables[0];
    assert_eq!(table.columns(), &["quantity", "value", "total_sales"]);
    assert_eq!(table.get(0, "total_sales"), Some(&Value::Float(31.5)));
    assert_eq!(table.get(1, "total_sales"), Some(&Value::Null));
}

#[tokio::test]
async fn localized_columns_and_parquet() {
    let fx = Fixture::new();
    fx.write("br.csv", "quantidade,valor\n4,2\n");
    write_parquet(&fx.dir().join("p.parquet"));

    let ledger = fx.ledger().await;
    let sink = MemorySink::new();
    let report = Pipeline::new(&fx.config, &ledger, &sink)
        .run(fx.dir())
        .await
        .unwrap();
    assert_eq!(report.processed(), 2);

    let tables = sink.appended(TABLE);
    // br.csv sorts before p.parquet
    assert_eq!(tables[0].columns(), &["quantity", "value", "total_sales"]);
    assert_eq!(tables[0].get(0, "total_sales"), Some(&Value::Integer(8)));
    assert_eq!(tables[1].get(0, "total_sales"), Some(&Value::Float(8.5)));
    assert_eq!(tables[1].get(1, "total_sales"), Some(&Value::Null));
}

#[tokio::test]
async fn unrecognized_extensions_are_ignored() {
    let fx = Fixture::new();
    fx.write("data.xlsx", "not a spreadsheet");
    fx.write("a.csv", "quantity,value\n1,1\n");

    let ledger = fx.ledger().await;
    let sink = MemorySink::new();
    let report = Pipeline::new(&fx.config, &ledger, &sink)
        .run(fx.dir())
        .await
        .unwrap();

    assert_eq!(report.outcomes.len(), 1);
    assert!(report.log_lines().iter().all(|l| !l.contains("data.xlsx")));
    assert!(!ledger.has_processed("data.xlsx").await.unwrap());
}

#[tokio::test]
async fn missing_column_fails_only_that_file() {
    let fx = Fixture::new();
    fx.write("a.csv", "price,amount\n1,2\n");
    fx.write("b.csv", "quantity,value\n2,3\n");

    let ledger = fx.ledger().await;
    let sink = MemorySink::new();
    let report = Pipeline::new(&fx.config, &ledger, &sink)
        .run(fx.dir())
        .await
        .unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(report.processed(), 1);
    match &report.outcomes[0].status {
        FileStatus::Failed { reason } => assert!(reason.contains("quantity")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(!ledger.has_processed("a.csv").await.unwrap());
    assert!(ledger.has_processed("b.csv").await.unwrap());
    assert_eq!(sink.calls(), 1);
}

#[tokio::test]
async fn malformed_file_is_reported_and_retried() {
    let fx = Fixture::new();
    fx.write("broken.json", "{ not json");

    let ledger = fx.ledger().await;
    let sink = MemorySink::new();
    let pipeline = Pipeline::new(&fx.config, &ledger, &sink);

    let first = pipeline.run(fx.dir()).await.unwrap();
    assert_eq!(first.failed(), 1);
    assert!(first.log_lines()[0].starts_with("File broken.json failed:"));

    // Not ledgered, so the next run tries again.
    let second = pipeline.run(fx.dir()).await.unwrap();
    assert_eq!(second.failed(), 1);
    assert_eq!(ledger.count().await.unwrap(), 0);
}

#[tokio::test]
async fn sink_failure_leaves_file_unrecorded() {
    let fx = Fixture::new();
    fx.write("a.csv", "quantity,value\n1,1\n");
    fx.write("b.csv", "quantity,value\n2,2\n");

    let ledger = fx.ledger().await;
    let sink = MemorySink::failing_on([0]);
    let report = Pipeline::new(&fx.config, &ledger, &sink)
        .run(fx.dir())
        .await
        .unwrap();

    assert_eq!(report.failed(), 1);
    assert_eq!(report.processed(), 1);
    assert!(!ledger.has_processed("a.csv").await.unwrap());
    assert!(ledger.has_processed("b.csv").await.unwrap());
    assert_eq!(sink.row_count(TABLE), 1);
}

#[tokio::test]
async fn fail_fast_stops_at_first_failure() {
    let mut fx = Fixture::new();
    fx.config.pipeline.error_policy = ErrorPolicy::FailFast;
    fx.write("a.csv", "quantity,value\n1,1\n");
    fx.write("b.csv", "nothing,useful\n1,1\n");
    fx.write("c.csv", "quantity,value\n3,3\n");

    let ledger = fx.ledger().await;
    let sink = MemorySink::new();
    let err = Pipeline::new(&fx.config, &ledger, &sink)
        .run(fx.dir())
        .await
        .unwrap_err();

    match err {
        PipelineError::Aborted { file, report, .. } => {
            assert_eq!(file, "b.csv");
            assert_eq!(report.outcomes.len(), 2);
            assert_eq!(report.processed(), 1);
        }
        other => panic!("expected abort, got {other:?}"),
    }
    assert!(ledger.has_processed("a.csv").await.unwrap());
    assert!(!ledger.has_processed("c.csv").await.unwrap());
}

#[tokio::test]
async fn missing_database_url_aborts_before_any_work() {
    let fx = Fixture::new();
    fx.write("a.csv", "quantity,value\n1,1\n");
    assert!(fx.config.sink.database_url.is_none());

    let err = run_job(&fx.config).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Startup(StartupError::Sink(SinkError::Configuration(_)))
    ));
    assert!(!fx.config.ledger.path.exists());
}

#[tokio::test]
async fn missing_directory_is_a_startup_error() {
    let mut fx = Fixture::new();
    fx.config.source.local_directory = fx.dir().join("does-not-exist");

    let sink = MemorySink::new();
    let err = run_with_sink(&fx.config, &sink).await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Startup(StartupError::Listing { .. })
    ));
}

#[tokio::test]
async fn end_to_end_with_local_folder() {
    let remote = tempfile::tempdir().unwrap();
    std::fs::write(remote.path().join("a.csv"), "quantity,value\n3,10.5\n").unwrap();
    std::fs::write(remote.path().join("b.csv"), "quantity,value\n1,1\n").unwrap();
    std::fs::write(remote.path().join("data.xlsx"), "x").unwrap();

    let mut fx = Fixture::new();
    fx.config.source.folder_locator = Some(remote.path().display().to_string());

    // b.csv was handled by an earlier run.
    let ledger = fx.ledger().await;
    ledger.record("b.csv").await.unwrap();
    ledger.close().await;

    let sink = MemorySink::new();
    let report = run_with_sink(&fx.config, &sink).await.unwrap();

    assert_eq!(
        report.log_lines(),
        vec![
            "File a.csv processed and saved.",
            "File b.csv has already been processed previously.",
        ]
    );
    assert!(fx.dir().join("a.csv").exists());
    assert!(!fx.dir().join("data.xlsx").exists());

    let ledger = fx.ledger().await;
    let names: Vec<String> = ledger.processed_files().await.unwrap().into_iter().collect();
    assert_eq!(names, vec!["a.csv", "b.csv"]);
    assert_eq!(sink.row_count(TABLE), 1);
}
