// tests/execution.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use tooldag::engine::TraceEventKind;
use tooldag::errors::OrchestratorError;
use tooldag::{
    JoinTool, Node, NodeStatus, Orchestrator, OrchestratorOptions, ToolError, ToolRegistry,
    ToolRequest, tool_fn,
};
use tooldag_test_utils::tools::{CallLog, RecordingTool};
use tooldag_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn recording_registry(log: &CallLog, ids: &[&str]) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    for id in ids {
        registry.register(RecordingTool::new(id, log));
    }
    Arc::new(registry)
}

#[tokio::test]
async fn chain_runs_in_dependency_order() -> TestResult {
    init_tracing();
    let log = CallLog::new();
    let mut orch = Orchestrator::new(recording_registry(&log, &["rec"]), Default::default());
    orch.add_node("A", "rec", &[])?;
    orch.add_node("B", "rec", &["A"])?;
    orch.add_node("C", "rec", &["B"])?;

    let report = with_timeout(orch.execute(json!({ "doc": "paper.pdf" }))).await?;

    assert!(report.all_succeeded());
    assert_eq!(log.start_order(), vec!["A", "B", "C"]);
    assert_eq!(report.metrics.level_count, 3);
    assert_eq!(report.results.len(), 3);

    // B saw A's output, and only A's.
    let b_call = log.call("B").expect("B was invoked");
    assert_eq!(b_call.upstream.len(), 1);
    assert_eq!(b_call.upstream["A"], json!({ "node": "A", "upstream": [] }));
    assert_eq!(b_call.input, json!({ "doc": "paper.pdf" }));
    assert_eq!(b_call.tool_id, "rec");

    assert_eq!(
        report.output("C"),
        Some(&json!({ "node": "C", "upstream": ["B"] }))
    );
    Ok(())
}

#[tokio::test]
async fn diamond_sink_waits_for_both_branches() -> TestResult {
    init_tracing();
    let log = CallLog::new();
    let mut registry = ToolRegistry::new();
    registry.register(RecordingTool::new("fast", &log));
    registry.register(RecordingTool::new("slow", &log).with_delay(Duration::from_millis(50)));
    let mut orch = Orchestrator::new(Arc::new(registry), Default::default());

    orch.add_node("A", "fast", &[])?;
    orch.add_node("B", "slow", &["A"])?;
    orch.add_node("C", "fast", &["A"])?;
    orch.add_node("D", "fast", &["B", "C"])?;

    let report = with_timeout(orch.execute(json!(null))).await?;
    assert!(report.all_succeeded());

    let b = log.call("B").unwrap();
    let c = log.call("C").unwrap();
    let d = log.call("D").unwrap();
    assert!(d.started >= b.finished, "D started before B finished");
    assert!(d.started >= c.finished, "D started before C finished");
    assert_eq!(
        d.upstream.keys().cloned().collect::<Vec<_>>(),
        vec!["B".to_string(), "C".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn nodes_in_one_level_run_concurrently() -> TestResult {
    init_tracing();
    let log = CallLog::new();
    let mut registry = ToolRegistry::new();
    registry.register(RecordingTool::new("slow", &log).with_delay(Duration::from_millis(100)));
    let mut orch = Orchestrator::new(Arc::new(registry), Default::default());

    for id in ["a", "b", "c", "d"] {
        orch.add_node(id, "slow", &[])?;
    }

    let report = with_timeout(orch.execute(json!(null))).await?;

    assert!(report.all_succeeded());
    assert_eq!(report.metrics.level_count, 1);
    assert_eq!(log.peak_concurrency(), 4);
    assert_eq!(report.metrics.max_concurrency, 4);
    // Four 100ms tools in parallel, not 400ms in series.
    assert!(report.metrics.total_duration < Duration::from_millis(350));
    Ok(())
}

#[tokio::test]
async fn max_concurrency_bounds_parallel_tools() -> TestResult {
    init_tracing();
    let log = CallLog::new();
    let mut registry = ToolRegistry::new();
    registry.register(RecordingTool::new("slow", &log).with_delay(Duration::from_millis(30)));
    let options = OrchestratorOptions {
        max_concurrency: Some(2),
        ..Default::default()
    };
    let mut orch = Orchestrator::new(Arc::new(registry), options);

    for i in 0..6 {
        orch.add_node(format!("n{i}"), "slow", &[])?;
    }

    let report = with_timeout(orch.execute(json!(null))).await?;

    assert!(report.all_succeeded());
    assert_eq!(log.len(), 6);
    assert!(log.peak_concurrency() <= 2);
    assert!(report.metrics.max_concurrency <= 2);
    Ok(())
}

#[tokio::test]
async fn zero_max_concurrency_is_rejected_before_running() -> TestResult {
    init_tracing();
    let log = CallLog::new();
    let options = OrchestratorOptions {
        node_timeout: Some(Duration::from_millis(50)),
        max_concurrency: Some(0),
    };
    let mut orch = Orchestrator::new(recording_registry(&log, &["rec"]), options);
    orch.add_node("A", "rec", &[])?;

    assert!(matches!(
        orch.validate(),
        Err(OrchestratorError::ConfigError(ref msg)) if msg.contains("max_concurrency")
    ));

    let result = with_timeout(orch.execute(json!(null))).await;

    assert!(matches!(result, Err(OrchestratorError::ConfigError(_))));
    assert!(log.is_empty());
    Ok(())
}

#[tokio::test]
async fn zero_default_timeout_is_rejected() -> TestResult {
    let log = CallLog::new();
    let options = OrchestratorOptions {
        node_timeout: Some(Duration::ZERO),
        ..Default::default()
    };
    let mut orch = Orchestrator::new(recording_registry(&log, &["rec"]), options);
    orch.add_node("A", "rec", &[])?;

    let result = with_timeout(orch.execute(json!(null))).await;

    assert!(matches!(result, Err(OrchestratorError::ConfigError(_))));
    assert!(log.is_empty());
    Ok(())
}

#[tokio::test]
async fn params_and_closure_tools_are_passed_through() -> TestResult {
    init_tracing();
    let registry = ToolRegistry::new()
        .with(tool_fn("upper", |req: ToolRequest| async move {
            let text = req.input["text"].as_str().unwrap_or_default().to_string();
            let suffix = req.params["suffix"].as_str().unwrap_or_default().to_string();
            Ok::<_, ToolError>(json!(format!("{}{}", text.to_uppercase(), suffix)))
        }))
        .with(tool_fn("count", |req: ToolRequest| async move {
            let upstream = req.upstream_output("up").cloned().unwrap_or_default();
            let len = upstream.as_str().map(str::len).unwrap_or(0);
            Ok::<_, ToolError>(json!(len))
        }))
        .with(JoinTool);

    let mut orch = Orchestrator::new(Arc::new(registry), Default::default());
    orch.add(Node::new("up", "upper").with_params(json!({ "suffix": "!" })))?;
    orch.add_node("count", "count", &["up"])?;
    orch.add_node("merge", JoinTool::ID, &["up", "count"])?;

    let report = with_timeout(orch.execute(json!({ "text": "abc" }))).await?;

    assert!(report.all_succeeded());
    assert_eq!(report.output("up"), Some(&json!("ABC!")));
    assert_eq!(report.output("count"), Some(&json!(4)));
    assert_eq!(
        report.output("merge"),
        Some(&json!({ "up": "ABC!", "count": 4 }))
    );
    Ok(())
}

#[tokio::test]
async fn unknown_tool_aborts_before_any_tool_runs() -> TestResult {
    init_tracing();
    let log = CallLog::new();
    let mut orch = Orchestrator::new(recording_registry(&log, &["rec"]), Default::default());
    orch.add_node("A", "rec", &[])?;
    orch.add_node("B", "nonexistent", &["A"])?;

    match orch.validate() {
        Err(OrchestratorError::UnknownTool { node, tool }) => {
            assert_eq!(node, "B");
            assert_eq!(tool, "nonexistent");
        }
        other => panic!("expected UnknownTool, got {other:?}"),
    }

    let result = with_timeout(orch.execute(json!(null))).await;
    assert!(matches!(result, Err(OrchestratorError::UnknownTool { .. })));
    assert!(log.is_empty());
    Ok(())
}

#[tokio::test]
async fn cyclic_graph_aborts_before_any_tool_runs() -> TestResult {
    init_tracing();
    let log = CallLog::new();
    let mut orch = Orchestrator::new(recording_registry(&log, &["rec"]), Default::default());
    orch.add_node("root", "rec", &[])?;
    orch.add_node("A", "rec", &["C"])?;
    orch.add_node("B", "rec", &["A"])?;
    orch.add_node("C", "rec", &["B"])?;

    let result = with_timeout(orch.execute(json!(null))).await;

    assert!(matches!(result, Err(OrchestratorError::CyclicGraph(_))));
    assert!(log.is_empty(), "no tool may run for a cyclic graph");
    Ok(())
}

#[tokio::test]
async fn duplicate_add_node_leaves_graph_unchanged() -> TestResult {
    let log = CallLog::new();
    let mut orch = Orchestrator::new(recording_registry(&log, &["rec"]), Default::default());
    orch.add_node("A", "rec", &[])?;

    let err = orch.add_node("A", "other", &[]).unwrap_err();

    assert!(matches!(err, OrchestratorError::DuplicateNode(ref id) if id == "A"));
    assert_eq!(orch.graph().len(), 1);
    assert_eq!(orch.graph().get("A").unwrap().tool, "rec");
    assert_eq!(orch.compute_execution_order()?, vec!["A".to_string()]);
    Ok(())
}

#[tokio::test]
async fn empty_workflow_yields_empty_report() -> TestResult {
    let orch = Orchestrator::new(Arc::new(ToolRegistry::new()), Default::default());

    let report = orch.execute(json!(null)).await?;

    assert!(report.results.is_empty());
    assert!(report.all_succeeded());
    assert_eq!(report.metrics.level_count, 0);
    assert!(report.trace.is_empty());
    Ok(())
}

#[tokio::test]
async fn report_carries_metrics_and_trace() -> TestResult {
    init_tracing();
    let log = CallLog::new();
    let mut orch = Orchestrator::new(recording_registry(&log, &["rec"]), Default::default());
    orch.add_node("load", "rec", &[])?;
    orch.add_node("chunk", "rec", &["load"])?;
    orch.add_node("ner", "rec", &["chunk"])?;
    orch.add_node("rel", "rec", &["chunk"])?;
    orch.add_node("merge", "rec", &["ner", "rel"])?;

    let report = with_timeout(orch.execute(json!(null))).await?;

    assert!(!report.execution_id.is_empty());
    assert!(!report.cancelled);
    assert_eq!(report.metrics.level_count, 4);
    assert_eq!(report.levels.len(), 4);
    assert_eq!(report.metrics.node_durations.len(), 5);

    // One started and one finished event per node.
    assert_eq!(report.trace.len(), 10);
    let merge_events: Vec<_> = report.trace.for_node("merge").map(|e| e.kind).collect();
    assert_eq!(
        merge_events,
        vec![TraceEventKind::Started, TraceEventKind::Finished]
    );

    for result in report.results.values() {
        assert_eq!(result.status, NodeStatus::Succeeded);
        assert!(result.started_at.is_some());
        assert!(result.error.is_none());
    }

    // A second run gets a fresh id and fresh state.
    let again = with_timeout(orch.execute(json!(null))).await?;
    assert_ne!(again.execution_id, report.execution_id);
    assert!(again.all_succeeded());
    Ok(())
}

#[tokio::test]
async fn independent_orchestrators_do_not_share_state() -> TestResult {
    init_tracing();
    let log = CallLog::new();
    let registry = recording_registry(&log, &["rec"]);

    let mut first = Orchestrator::new(Arc::clone(&registry), Default::default());
    first.add_node("A", "rec", &[])?;
    let mut second = Orchestrator::new(registry, Default::default());
    second.add_node("X", "rec", &[])?;
    second.add_node("Y", "rec", &["X"])?;

    let (r1, r2) = with_timeout(async {
        tokio::join!(first.execute(json!(1)), second.execute(json!(2)))
    })
    .await;
    let (r1, r2) = (r1?, r2?);

    assert_eq!(r1.results.keys().collect::<Vec<_>>(), vec!["A"]);
    assert_eq!(r2.results.keys().collect::<Vec<_>>(), vec!["X", "Y"]);
    assert_eq!(log.call("A").unwrap().input, json!(1));
    assert_eq!(log.call("Y").unwrap().input, json!(2));
    Ok(())
}
