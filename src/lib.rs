// src/lib.rs

//! `tooldag`: run a DAG of tool invocations level by level.
//!
//! A workflow is a set of nodes, each bound to a tool id and a list of
//! upstream nodes. The [`Orchestrator`] validates the graph, groups nodes
//! into levels of mutually independent work, and runs each level's nodes
//! concurrently, feeding every node the outputs of its dependencies.
//!
//! ```ignore
//! let mut registry = ToolRegistry::new();
//! registry.register(tool_fn("load", |_req| async { Ok(json!("text")) }));
//! registry.register(JoinTool);
//!
//! let mut orch = Orchestrator::new(Arc::new(registry), OrchestratorOptions::default());
//! orch.add_node("load", "load", &[])?;
//! orch.add_node("merge", "join", &["load"])?;
//!
//! let report = orch.execute(json!({ "doc": "paper.pdf" })).await?;
//! assert!(report.all_succeeded());
//! ```

pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod tool;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

pub use crate::dag::{DagGraph, Level, Node};
pub use crate::engine::{
    ExecutionMetrics, ExecutionReport, NodeResult, Orchestrator, OrchestratorOptions,
    ProvenanceRecord,
};
pub use crate::errors::{NodeError, OrchestratorError, Result};
pub use crate::tool::{JoinTool, Tool, ToolError, ToolOutcome, ToolRegistry, ToolRequest, tool_fn};
pub use crate::types::{NodeId, NodeStatus};
pub use tokio_util::sync::CancellationToken;

use crate::config::loader::load_and_validate;

/// Load a workflow file, execute it with `registry`, and write provenance if
/// `[config].provenance_path` is set.
pub async fn run_workflow(
    path: impl AsRef<Path>,
    registry: Arc<ToolRegistry>,
    initial_input: serde_json::Value,
) -> Result<ExecutionReport> {
    let path = path.as_ref();
    let cfg = load_and_validate(path)?;
    info!(
        workflow = %path.display(),
        nodes = cfg.graph().len(),
        "workflow loaded"
    );

    let orchestrator = Orchestrator::from_config(&cfg, registry);
    let report = orchestrator.execute(initial_input).await?;

    if let Some(target) = cfg.provenance_path.as_deref() {
        report.save_provenance(resolve_against(path, target))?;
    }

    Ok(report)
}

/// Resolve `target` relative to the directory holding `config_path`.
///
/// - Absolute targets are returned unchanged.
/// - A bare config filename (parent = "") leaves `target` relative to the
///   current working directory.
fn resolve_against(config_path: &Path, target: &Path) -> PathBuf {
    if target.is_absolute() {
        return target.to_path_buf();
    }
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(target),
        _ => target.to_path_buf(),
    }
}
