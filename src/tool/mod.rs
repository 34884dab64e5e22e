// src/tool/mod.rs

//! The tool interface consumed by the orchestrator.
//!
//! A tool is an opaque async callable: it receives a [`ToolRequest`] and
//! returns an explicit [`ToolOutcome`]. The orchestrator never inspects what
//! went wrong beyond success vs failure.
//!
//! - [`registry`] maps tool ids to implementations.
//! - [`func`] adapts async closures into tools.
//! - [`join`] is a built-in tool that merges upstream outputs.

use std::collections::BTreeMap;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::NodeId;

pub mod func;
pub mod join;
pub mod registry;

pub use func::{FnTool, tool_fn};
pub use join::JoinTool;
pub use registry::ToolRegistry;

/// Everything a tool gets to see for one node invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    pub execution_id: String,
    pub node_id: NodeId,
    pub tool_id: String,
    /// Static parameters declared on the node.
    pub params: serde_json::Value,
    /// The initial input passed to `execute`.
    pub input: serde_json::Value,
    /// Outputs of the node's dependencies, keyed by dependency id.
    pub upstream: BTreeMap<NodeId, serde_json::Value>,
}

impl ToolRequest {
    /// Output of a single dependency.
    pub fn upstream_output(&self, node_id: &str) -> Option<&serde_json::Value> {
        self.upstream.get(node_id)
    }
}

/// Failure reported by a tool.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ToolError {
    pub message: String,
}

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ToolError {
    fn from(err: anyhow::Error) -> Self {
        // `{:#}` keeps the context chain on one line.
        ToolError::new(format!("{err:#}"))
    }
}

/// Result of a tool invocation.
pub type ToolOutcome = Result<serde_json::Value, ToolError>;

/// Extensible tool execution.
pub trait Tool: Send + Sync + 'static {
    /// Identifier nodes use to refer to this tool.
    fn id(&self) -> &str;

    /// Run the tool for one node.
    fn execute(&self, request: ToolRequest) -> BoxFuture<'_, ToolOutcome>;
}
