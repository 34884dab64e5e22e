// src/engine/executor.rs

//! Level-by-level execution.
//!
//! Each level is a barrier: every node of level N reaches a terminal state
//! before any node of level N+1 is dispatched. Within a level, nodes run as
//! independent Tokio tasks.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dag::{DagGraph, Level, RunStates};
use crate::engine::OrchestratorOptions;
use crate::engine::report::NodeResult;
use crate::engine::trace::{ExecutionTrace, TraceRecorder};
use crate::errors::NodeError;
use crate::tool::{Tool, ToolRequest};
use crate::types::{NodeId, NodeStatus};

/// Borrowed inputs shared by every level of one execution.
pub(crate) struct RunContext<'a> {
    pub execution_id: &'a str,
    pub graph: &'a DagGraph,
    /// Tool resolved for each node before the run started.
    pub tools: &'a HashMap<NodeId, Arc<dyn Tool>>,
    pub options: &'a OrchestratorOptions,
    pub cancel: &'a CancellationToken,
}

/// Raw output of [`run_levels`], assembled into a report by the orchestrator.
pub(crate) struct RunOutput {
    pub results: BTreeMap<NodeId, NodeResult>,
    pub trace: ExecutionTrace,
    pub max_concurrency: usize,
}

/// Run every level in order and return one terminal result per node.
pub(crate) async fn run_levels(
    ctx: &RunContext<'_>,
    levels: &[Level],
    input: serde_json::Value,
) -> RunOutput {
    let mut states = RunStates::new(ctx.graph);
    let mut results: BTreeMap<NodeId, NodeResult> = BTreeMap::new();
    let recorder = TraceRecorder::default();
    let gauge = ConcurrencyGauge::default();
    let semaphore = ctx
        .options
        .max_concurrency
        .map(|limit| Arc::new(Semaphore::new(limit)));

    for (index, level) in levels.iter().enumerate() {
        if ctx.cancel.is_cancelled() {
            warn!(
                execution_id = %ctx.execution_id,
                level = index,
                "execution cancelled; skipping remaining levels"
            );
            for id in levels[index..].iter().flatten() {
                let result = NodeResult::skipped(id, tool_id_of(ctx.graph, id), NodeError::Cancelled);
                states.transition(id, NodeStatus::Skipped);
                recorder.finished(&result);
                results.insert(id.clone(), result);
            }
            break;
        }

        let plan = states.plan_level(ctx.graph, level);

        for (id, dependencies) in plan.blocked {
            let result = NodeResult::skipped(
                &id,
                tool_id_of(ctx.graph, &id),
                NodeError::DependencyFailed { dependencies },
            );
            recorder.finished(&result);
            results.insert(id, result);
        }

        info!(
            execution_id = %ctx.execution_id,
            level = index,
            ready = ?plan.ready,
            "dispatching level"
        );

        let mut handles = Vec::with_capacity(plan.ready.len());

        for id in plan.ready {
            let Some(tool) = ctx.tools.get(&id).cloned() else {
                // Resolution covers every node, so this only trips on a bug.
                error!(node = %id, "no tool resolved for node; skipping");
                let result = NodeResult::skipped(
                    &id,
                    tool_id_of(ctx.graph, &id),
                    NodeError::execution("no tool resolved for node"),
                );
                states.transition(&id, NodeStatus::Skipped);
                recorder.finished(&result);
                results.insert(id, result);
                continue;
            };

            let request = build_request(ctx, &id, &input, &results);
            let timeout = ctx
                .graph
                .get(&id)
                .and_then(|n| n.timeout)
                .or(ctx.options.node_timeout);

            states.transition(&id, NodeStatus::Running);

            let task = NodeTask {
                request,
                tool,
                timeout,
                cancel: ctx.cancel.clone(),
                recorder: recorder.clone(),
                gauge: gauge.clone(),
                semaphore: semaphore.clone(),
            };

            let tool_id = task.request.tool_id.clone();
            handles.push((id, tool_id, tokio::spawn(task.run())));
        }

        // Barrier: wait for every node of this level.
        let joined = futures::future::join_all(
            handles
                .into_iter()
                .map(|(id, tool_id, handle)| async move { (id, tool_id, handle.await) }),
        )
        .await;

        for (id, tool_id, joined) in joined {
            let result = match joined {
                Ok(result) => result,
                Err(join_err) => {
                    // Panics are caught inside the task; this covers aborts.
                    let now = Utc::now();
                    let result = NodeResult {
                        node_id: id.clone(),
                        tool_id,
                        status: NodeStatus::Failed,
                        output: None,
                        error: Some(NodeError::Panicked {
                            message: join_err.to_string(),
                        }),
                        started_at: None,
                        finished_at: now,
                        duration: Duration::ZERO,
                    };
                    recorder.finished(&result);
                    result
                }
            };

            states.transition(&id, result.status);
            results.insert(id, result);
        }
    }

    if !states.all_terminal() {
        warn!(
            execution_id = %ctx.execution_id,
            unfinished = ?states.unfinished(),
            "execution ended with non-terminal nodes"
        );
    }

    RunOutput {
        results,
        trace: recorder.snapshot(),
        max_concurrency: gauge.peak(),
    }
}

fn tool_id_of<'a>(graph: &'a DagGraph, id: &str) -> &'a str {
    graph.get(id).map(|n| n.tool.as_str()).unwrap_or_default()
}

/// Gather upstream outputs for `id` from the results collected so far.
fn build_request(
    ctx: &RunContext<'_>,
    id: &str,
    input: &serde_json::Value,
    results: &BTreeMap<NodeId, NodeResult>,
) -> ToolRequest {
    let (tool_id, params) = match ctx.graph.get(id) {
        Some(node) => (node.tool.clone(), node.params.clone()),
        None => (String::new(), serde_json::Value::Null),
    };

    let upstream = ctx
        .graph
        .dependencies_of(id)
        .iter()
        .filter_map(|dep| {
            results
                .get(dep)
                .and_then(|r| r.output.clone())
                .map(|output| (dep.clone(), output))
        })
        .collect();

    ToolRequest {
        execution_id: ctx.execution_id.to_string(),
        node_id: id.to_string(),
        tool_id,
        params,
        input: input.clone(),
        upstream,
    }
}

/// One node invocation, owned so it can be spawned.
struct NodeTask {
    request: ToolRequest,
    tool: Arc<dyn Tool>,
    timeout: Option<Duration>,
    cancel: CancellationToken,
    recorder: TraceRecorder,
    gauge: ConcurrencyGauge,
    semaphore: Option<Arc<Semaphore>>,
}

impl NodeTask {
    async fn run(self) -> NodeResult {
        let node_id = self.request.node_id.clone();
        let tool_id = self.request.tool_id.clone();

        let _permit = match &self.semaphore {
            Some(sem) => Arc::clone(sem).acquire_owned().await.ok(),
            None => None,
        };

        if self.cancel.is_cancelled() {
            debug!(node = %node_id, "cancelled before the tool was invoked");
            let result = NodeResult {
                node_id,
                tool_id,
                status: NodeStatus::Failed,
                output: None,
                error: Some(NodeError::Cancelled),
                started_at: None,
                finished_at: Utc::now(),
                duration: Duration::ZERO,
            };
            self.recorder.finished(&result);
            return result;
        }

        let started_at = Utc::now();
        let clock = Instant::now();
        self.recorder.started(&node_id, &tool_id, started_at);
        info!(
            execution_id = %self.request.execution_id,
            node = %node_id,
            tool = %tool_id,
            upstream = ?self.request.upstream.keys().collect::<Vec<_>>(),
            "node started"
        );

        let outcome = {
            let _active = self.gauge.enter();
            self.invoke().await
        };

        let finished_at = Utc::now();
        let duration = clock.elapsed();

        let result = match outcome {
            Ok(output) => {
                info!(
                    node = %node_id,
                    elapsed_ms = duration.as_millis() as u64,
                    "node succeeded"
                );
                NodeResult {
                    node_id,
                    tool_id,
                    status: NodeStatus::Succeeded,
                    output: Some(output),
                    error: None,
                    started_at: Some(started_at),
                    finished_at,
                    duration,
                }
            }
            Err(err) => {
                error!(
                    node = %node_id,
                    elapsed_ms = duration.as_millis() as u64,
                    error = %err,
                    "node failed"
                );
                NodeResult {
                    node_id,
                    tool_id,
                    status: NodeStatus::Failed,
                    output: None,
                    error: Some(err),
                    started_at: Some(started_at),
                    finished_at,
                    duration,
                }
            }
        };

        self.recorder.finished(&result);
        result
    }

    /// Call the tool, honouring the timeout and the cancellation token and
    /// containing panics.
    async fn invoke(&self) -> Result<serde_json::Value, NodeError> {
        // A tool may panic while building its future as well as while polling it.
        let call = match std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.tool.execute(self.request.clone())
        })) {
            Ok(future) => AssertUnwindSafe(future).catch_unwind(),
            Err(panic) => {
                return Err(NodeError::Panicked {
                    message: panic_message(panic.as_ref()),
                });
            }
        };

        let bounded = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .map_err(|_| NodeError::Timeout { after: limit }),
                None => Ok(call.await),
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(NodeError::Cancelled),
            outcome = bounded => outcome?,
        };

        match outcome {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(tool_err)) => {
                let message = if tool_err.message.trim().is_empty() {
                    "tool reported failure without a message".to_string()
                } else {
                    tool_err.message
                };
                Err(NodeError::Execution { message })
            }
            Err(panic) => Err(NodeError::Panicked {
                message: panic_message(panic.as_ref()),
            }),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Tracks how many tools are running right now and the peak seen.
#[derive(Debug, Clone, Default)]
struct ConcurrencyGauge {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ConcurrencyGauge {
    fn enter(&self) -> ActiveGuard {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ActiveGuard {
            current: Arc::clone(&self.current),
        }
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct ActiveGuard {
    current: Arc<AtomicUsize>,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}
