// src/engine/trace.rs

//! Execution trace and provenance records.
//!
//! The trace is an append-only log of node events, kept for debugging and
//! audit. Provenance is the flat per-node summary that gets written to disk.
//! Neither is consulted for scheduling decisions.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::report::NodeResult;
use crate::types::{NodeId, NodeStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceEventKind {
    Started,
    Finished,
    Skipped,
}

/// A single entry in the execution trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub node_id: NodeId,
    pub tool_id: String,
    pub kind: TraceEventKind,
    pub timestamp: DateTime<Utc>,
    /// Terminal status; `None` for `Started`.
    pub status: Option<NodeStatus>,
    pub error: Option<String>,
}

/// Ordered log of node events for one execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    events: Vec<TraceEvent>,
}

impl ExecutionTrace {
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events for one node, in order.
    pub fn for_node<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a TraceEvent> {
        self.events.iter().filter(move |e| e.node_id == node_id)
    }
}

/// Shared, append-only sink that concurrently running nodes push into.
#[derive(Debug, Clone, Default)]
pub(crate) struct TraceRecorder {
    events: Arc<Mutex<Vec<TraceEvent>>>,
}

impl TraceRecorder {
    pub(crate) fn started(&self, node_id: &str, tool_id: &str, at: DateTime<Utc>) {
        self.push(TraceEvent {
            node_id: node_id.to_string(),
            tool_id: tool_id.to_string(),
            kind: TraceEventKind::Started,
            timestamp: at,
            status: None,
            error: None,
        });
    }

    /// Record the terminal event for a node result.
    pub(crate) fn finished(&self, result: &NodeResult) {
        let kind = if result.status == NodeStatus::Skipped {
            TraceEventKind::Skipped
        } else {
            TraceEventKind::Finished
        };

        self.push(TraceEvent {
            node_id: result.node_id.clone(),
            tool_id: result.tool_id.clone(),
            kind,
            timestamp: result.finished_at,
            status: Some(result.status),
            error: result.error.as_ref().map(|e| e.to_string()),
        });
    }

    fn push(&self, event: TraceEvent) {
        // Pushes are single appends, so a poisoned log is still consistent.
        let mut guard = self.events.lock().unwrap_or_else(|e| e.into_inner());
        guard.push(event);
    }

    pub(crate) fn snapshot(&self) -> ExecutionTrace {
        let guard = self.events.lock().unwrap_or_else(|e| e.into_inner());
        ExecutionTrace {
            events: guard.clone(),
        }
    }
}

/// Flat per-node provenance record, as persisted to JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    pub node_id: NodeId,
    pub tool_id: String,
    /// `None` if the node was never started.
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: DateTime<Utc>,
    pub status: NodeStatus,
    pub error: Option<String>,
}

impl From<&NodeResult> for ProvenanceRecord {
    fn from(result: &NodeResult) -> Self {
        Self {
            node_id: result.node_id.clone(),
            tool_id: result.tool_id.clone(),
            start_time: result.started_at,
            end_time: result.finished_at,
            status: result.status,
            error: result.error.as_ref().map(|e| e.to_string()),
        }
    }
}
