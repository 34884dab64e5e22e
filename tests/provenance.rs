// tests/provenance.rs

use std::error::Error;
use std::fs;
use std::sync::Arc;

use serde_json::{Value, json};

use tooldag::fs::mock::MockFileSystem;
use tooldag::{NodeStatus, Orchestrator, ProvenanceRecord, ToolRegistry};
use tooldag_test_utils::tools::{CallLog, FailingTool, RecordingTool};
use tooldag_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

async fn run_pipeline(log: &CallLog) -> Result<tooldag::ExecutionReport, Box<dyn Error>> {
    let registry = ToolRegistry::new()
        .with(RecordingTool::new("ok", log))
        .with(FailingTool::new("fail", "no entities", log));
    let mut orch = Orchestrator::new(Arc::new(registry), Default::default());
    orch.add_node("load", "ok", &[])?;
    orch.add_node("ner", "fail", &["load"])?;
    orch.add_node("rel", "ok", &["load"])?;
    orch.add_node("merge", "ok", &["ner", "rel"])?;
    Ok(with_timeout(orch.execute(json!(null))).await?)
}

#[tokio::test]
async fn provenance_lists_every_node_in_level_order() -> TestResult {
    init_tracing();
    let log = CallLog::new();
    let report = run_pipeline(&log).await?;

    let records = report.provenance();
    let ids: Vec<&str> = records.iter().map(|r| r.node_id.as_str()).collect();
    assert_eq!(ids, vec!["load", "ner", "rel", "merge"]);

    let load = &records[0];
    assert_eq!(load.tool_id, "ok");
    assert_eq!(load.status, NodeStatus::Succeeded);
    assert!(load.error.is_none());
    let start = load.start_time.expect("load was started");
    assert!(start <= load.end_time);

    let ner = &records[1];
    assert_eq!(ner.status, NodeStatus::Failed);
    assert!(ner.error.as_deref().unwrap().contains("no entities"));

    let merge = &records[3];
    assert_eq!(merge.status, NodeStatus::Skipped);
    assert!(merge.start_time.is_none());
    assert!(merge.error.as_deref().unwrap().contains("ner"));
    Ok(())
}

#[tokio::test]
async fn save_provenance_writes_json_array_and_overwrites() -> TestResult {
    init_tracing();
    let log = CallLog::new();
    let report = run_pipeline(&log).await?;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested").join("provenance.json");

    report.save_provenance(&path)?;
    let first: Vec<ProvenanceRecord> = serde_json::from_str(&fs::read_to_string(&path)?)?;
    assert_eq!(first, report.provenance());

    // A second save replaces the file rather than appending.
    report.save_provenance(&path)?;
    let raw: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
    let array = raw.as_array().expect("top-level JSON array");
    assert_eq!(array.len(), 4);
    assert_eq!(array[0]["node_id"], "load");
    assert_eq!(array[0]["status"], "succeeded");
    assert_eq!(array[3]["status"], "skipped");
    assert!(array[3]["start_time"].is_null());
    Ok(())
}

#[tokio::test]
async fn save_provenance_through_mock_filesystem() -> TestResult {
    init_tracing();
    let log = CallLog::new();
    let report = run_pipeline(&log).await?;
    let fs = MockFileSystem::new();
    fs.add_file("/out/prov.json", "stale contents");

    report.save_provenance_with(&fs, "/out/prov.json")?;

    let bytes = fs.contents("/out/prov.json").expect("file written");
    let records: Vec<ProvenanceRecord> = serde_json::from_slice(&bytes)?;
    assert_eq!(records.len(), 4);
    assert_eq!(records[2].node_id, "rel");
    Ok(())
}
