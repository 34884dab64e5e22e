// src/engine/report.rs

//! Per-node results and the aggregate report returned by an execution.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dag::Level;
use crate::engine::trace::{ExecutionTrace, ProvenanceRecord};
use crate::errors::{NodeError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::{NodeId, NodeStatus};

/// Outcome of a single node. Always in a terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
    pub node_id: NodeId,
    pub tool_id: String,
    pub status: NodeStatus,
    /// Tool output; only present when the node succeeded.
    pub output: Option<serde_json::Value>,
    pub error: Option<NodeError>,
    /// When the tool was invoked; `None` for skipped nodes.
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: DateTime<Utc>,
    /// Wall-clock time spent in the tool (zero for skipped nodes).
    pub duration: Duration,
}

impl NodeResult {
    pub(crate) fn skipped(node_id: &str, tool_id: &str, error: NodeError) -> Self {
        Self {
            node_id: node_id.to_string(),
            tool_id: tool_id.to_string(),
            status: NodeStatus::Skipped,
            output: None,
            error: Some(error),
            started_at: None,
            finished_at: Utc::now(),
            duration: Duration::ZERO,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == NodeStatus::Succeeded
    }

    /// Human-readable error, if the node did not succeed.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }
}

/// Aggregate timing for one execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetrics {
    /// Wall-clock time of the whole execution.
    pub total_duration: Duration,
    /// Wall-clock time per node.
    pub node_durations: BTreeMap<NodeId, Duration>,
    pub level_count: usize,
    /// Peak number of tools observed running at the same time.
    pub max_concurrency: usize,
}

/// Everything an execution produced.
///
/// `execute` succeeding says nothing about the nodes: check
/// [`ExecutionReport::all_succeeded`] or the individual statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub execution_id: String,
    /// One entry per node.
    pub results: BTreeMap<NodeId, NodeResult>,
    pub levels: Vec<Level>,
    pub metrics: ExecutionMetrics,
    pub trace: ExecutionTrace,
    /// Whether the cancellation token fired during the run.
    pub cancelled: bool,
}

impl ExecutionReport {
    pub fn get(&self, node_id: &str) -> Option<&NodeResult> {
        self.results.get(node_id)
    }

    pub fn output(&self, node_id: &str) -> Option<&serde_json::Value> {
        self.results.get(node_id).and_then(|r| r.output.as_ref())
    }

    pub fn status(&self, node_id: &str) -> Option<NodeStatus> {
        self.results.get(node_id).map(|r| r.status)
    }

    pub fn all_succeeded(&self) -> bool {
        self.results.values().all(NodeResult::succeeded)
    }

    pub fn failed_nodes(&self) -> Vec<&str> {
        self.nodes_with_status(NodeStatus::Failed)
    }

    pub fn skipped_nodes(&self) -> Vec<&str> {
        self.nodes_with_status(NodeStatus::Skipped)
    }

    fn nodes_with_status(&self, status: NodeStatus) -> Vec<&str> {
        self.results
            .values()
            .filter(|r| r.status == status)
            .map(|r| r.node_id.as_str())
            .collect()
    }

    /// Provenance records in level order (ids sorted within a level).
    pub fn provenance(&self) -> Vec<ProvenanceRecord> {
        self.levels
            .iter()
            .flatten()
            .filter_map(|id| self.results.get(id))
            .map(ProvenanceRecord::from)
            .collect()
    }

    /// Write the provenance records to `path` as a JSON array, overwriting
    /// any existing file.
    pub fn save_provenance(&self, path: impl AsRef<Path>) -> Result<()> {
        self.save_provenance_with(&RealFileSystem, path)
    }

    pub fn save_provenance_with(&self, fs: &dyn FileSystem, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let records = self.provenance();
        let json = serde_json::to_vec_pretty(&records)?;
        fs.write(path, &json)?;

        info!(
            execution_id = %self.execution_id,
            path = %path.display(),
            records = records.len(),
            "provenance written"
        );
        Ok(())
    }
}
