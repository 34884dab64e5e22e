// src/engine/orchestrator.rs

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument};

use crate::config::ConfigFile;
use crate::dag::{DagGraph, Level, Node};
use crate::engine::OrchestratorOptions;
use crate::engine::executor::{RunContext, run_levels};
use crate::engine::report::{ExecutionMetrics, ExecutionReport};
use crate::errors::{OrchestratorError, Result};
use crate::tool::{Tool, ToolRegistry};
use crate::types::NodeId;

/// Sequences interdependent tool invocations.
///
/// The orchestrator owns its graph and receives the tool registry and options
/// explicitly; it keeps no state between executions.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    graph: DagGraph,
    registry: Arc<ToolRegistry>,
    options: OrchestratorOptions,
}

impl Orchestrator {
    pub fn new(registry: Arc<ToolRegistry>, options: OrchestratorOptions) -> Self {
        Self::with_graph(DagGraph::new(), registry, options)
    }

    pub fn with_graph(
        graph: DagGraph,
        registry: Arc<ToolRegistry>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            graph,
            registry,
            options,
        }
    }

    /// Build an orchestrator from a validated workflow config.
    pub fn from_config(cfg: &ConfigFile, registry: Arc<ToolRegistry>) -> Self {
        Self::with_graph(cfg.graph().clone(), registry, cfg.options)
    }

    /// Register a node bound to `tool_id` that runs after `deps`.
    ///
    /// Tool ids are resolved later, by [`Orchestrator::validate`].
    pub fn add_node(
        &mut self,
        node_id: impl Into<NodeId>,
        tool_id: impl Into<String>,
        deps: &[&str],
    ) -> Result<()> {
        self.add(Node::new(node_id, tool_id).after(deps.iter().copied()))
    }

    /// Register a fully specified node.
    pub fn add(&mut self, node: Node) -> Result<()> {
        self.graph.add(node)
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    /// Check the options, that dependencies exist, the graph is acyclic and
    /// every tool id is registered.
    pub fn validate(&self) -> Result<()> {
        self.options.validate()?;
        self.graph.validate()?;
        self.resolve_tools().map(|_| ())
    }

    pub fn compute_execution_order(&self) -> Result<Vec<NodeId>> {
        self.graph.execution_order()
    }

    pub fn compute_levels(&self) -> Result<Vec<Level>> {
        self.graph.compute_levels()
    }

    /// Run every level in order. See [`Orchestrator::execute_with_cancel`].
    pub async fn execute(&self, initial_input: serde_json::Value) -> Result<ExecutionReport> {
        self.execute_with_cancel(initial_input, CancellationToken::new())
            .await
    }

    /// Run every level in order, stopping early if `cancel` fires.
    ///
    /// Invalid options and structural problems (cycle, unknown dependency,
    /// unknown tool) are returned as errors before any tool runs. Node failures are not errors:
    /// they are recorded in the report.
    #[instrument(name = "workflow_execute", skip_all, fields(nodes = self.graph.len()))]
    pub async fn execute_with_cancel(
        &self,
        initial_input: serde_json::Value,
        cancel: CancellationToken,
    ) -> Result<ExecutionReport> {
        let execution_id = uuid::Uuid::new_v4().to_string();

        self.options.validate().inspect_err(|e| {
            error!(execution_id = %execution_id, error = %e, "workflow rejected");
        })?;
        let levels = self.compute_levels().inspect_err(|e| {
            error!(execution_id = %execution_id, error = %e, "workflow rejected");
        })?;
        let tools = self.resolve_tools().inspect_err(|e| {
            error!(execution_id = %execution_id, error = %e, "workflow rejected");
        })?;

        info!(
            execution_id = %execution_id,
            levels = levels.len(),
            "workflow_started"
        );

        let clock = Instant::now();
        let ctx = RunContext {
            execution_id: &execution_id,
            graph: &self.graph,
            tools: &tools,
            options: &self.options,
            cancel: &cancel,
        };
        let output = run_levels(&ctx, &levels, initial_input).await;
        let total_duration = clock.elapsed();

        let metrics = ExecutionMetrics {
            total_duration,
            node_durations: output
                .results
                .iter()
                .map(|(id, r)| (id.clone(), r.duration))
                .collect(),
            level_count: levels.len(),
            max_concurrency: output.max_concurrency,
        };

        let report = ExecutionReport {
            execution_id,
            results: output.results,
            levels,
            metrics,
            trace: output.trace,
            cancelled: cancel.is_cancelled(),
        };

        info!(
            execution_id = %report.execution_id,
            elapsed_ms = total_duration.as_millis() as u64,
            failed = ?report.failed_nodes(),
            skipped = ?report.skipped_nodes(),
            cancelled = report.cancelled,
            "workflow_completed"
        );

        Ok(report)
    }

    /// Map every node to its tool, failing on the first unregistered id.
    fn resolve_tools(&self) -> Result<HashMap<NodeId, Arc<dyn Tool>>> {
        self.graph
            .nodes()
            .map(|node| {
                self.registry
                    .get(&node.tool)
                    .map(|tool| (node.id.clone(), tool))
                    .ok_or_else(|| OrchestratorError::UnknownTool {
                        node: node.id.clone(),
                        tool: node.tool.clone(),
                    })
            })
            .collect()
    }
}
