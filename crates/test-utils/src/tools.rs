use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use serde_json::json;
use tooldag::{NodeId, Tool, ToolError, ToolOutcome, ToolRequest};

/// One observed tool invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub node_id: NodeId,
    pub tool_id: String,
    pub params: serde_json::Value,
    pub input: serde_json::Value,
    pub upstream: BTreeMap<NodeId, serde_json::Value>,
    pub started: Instant,
    pub finished: Instant,
}

/// Shared log of invocations plus a live concurrency counter.
///
/// Clones share the same log, so one `CallLog` can be handed to several
/// tools and inspected after the run.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<Call>>>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call(&self, node_id: &str) -> Option<Call> {
        self.calls().into_iter().find(|c| c.node_id == node_id)
    }

    pub fn was_called(&self, node_id: &str) -> bool {
        self.call(node_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Node ids ordered by the moment their tool was entered.
    pub fn start_order(&self) -> Vec<NodeId> {
        let mut calls = self.calls();
        calls.sort_by_key(|c| c.started);
        calls.into_iter().map(|c| c.node_id).collect()
    }

    /// Highest number of recorded tools running at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Instant {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        Instant::now()
    }

    fn exit(&self, request: &ToolRequest, started: Instant) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(Call {
            node_id: request.node_id.clone(),
            tool_id: request.tool_id.clone(),
            params: request.params.clone(),
            input: request.input.clone(),
            upstream: request.upstream.clone(),
            started,
            finished: Instant::now(),
        });
    }
}

/// A tool that records each invocation, optionally sleeps, then succeeds.
///
/// Output is `{ "node": <node id>, "upstream": [<dependency ids>] }`.
#[derive(Debug, Clone)]
pub struct RecordingTool {
    id: String,
    delay: Option<Duration>,
    log: CallLog,
}

impl RecordingTool {
    pub fn new(id: &str, log: &CallLog) -> Self {
        Self {
            id: id.to_string(),
            delay: None,
            log: log.clone(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

impl Tool for RecordingTool {
    fn id(&self) -> &str {
        &self.id
    }

    fn execute(&self, request: ToolRequest) -> BoxFuture<'_, ToolOutcome> {
        Box::pin(async move {
            let started = self.log.enter();
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.log.exit(&request, started);

            let upstream: Vec<&NodeId> = request.upstream.keys().collect();
            Ok(json!({ "node": request.node_id, "upstream": upstream }))
        })
    }
}

/// A tool that always reports failure with a fixed message.
#[derive(Debug, Clone)]
pub struct FailingTool {
    id: String,
    message: String,
    log: CallLog,
}

impl FailingTool {
    pub fn new(id: &str, message: &str, log: &CallLog) -> Self {
        Self {
            id: id.to_string(),
            message: message.to_string(),
            log: log.clone(),
        }
    }
}

impl Tool for FailingTool {
    fn id(&self) -> &str {
        &self.id
    }

    fn execute(&self, request: ToolRequest) -> BoxFuture<'_, ToolOutcome> {
        Box::pin(async move {
            let started = self.log.enter();
            self.log.exit(&request, started);
            Err(ToolError::new(self.message.clone()))
        })
    }
}

/// A tool that sleeps, then succeeds. Records nothing; used to exercise
/// timeouts and cancellation.
#[derive(Debug, Clone)]
pub struct SleepTool {
    id: String,
    duration: Duration,
}

impl SleepTool {
    pub fn new(id: &str, duration: Duration) -> Self {
        Self {
            id: id.to_string(),
            duration,
        }
    }
}

impl Tool for SleepTool {
    fn id(&self) -> &str {
        &self.id
    }

    fn execute(&self, _request: ToolRequest) -> BoxFuture<'_, ToolOutcome> {
        Box::pin(async move {
            tokio::time::sleep(self.duration).await;
            Ok(json!("woke up"))
        })
    }
}

/// A tool that panics on every call.
#[derive(Debug, Clone)]
pub struct PanicTool {
    id: String,
}

impl PanicTool {
    pub fn new(id: &str) -> Self {
        Self { id: id.to_string() }
    }
}

impl Tool for PanicTool {
    fn id(&self) -> &str {
        &self.id
    }

    fn execute(&self, request: ToolRequest) -> BoxFuture<'_, ToolOutcome> {
        Box::pin(explode(request.node_id))
    }
}

async fn explode(node_id: NodeId) -> ToolOutcome {
    panic!("tool blew up on node {node_id}")
}
