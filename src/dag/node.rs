// src/dag/node.rs

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::NodeId;

/// One unit of work in the DAG, bound to a single tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Identifier of the tool in the [`crate::tool::ToolRegistry`].
    pub tool: String,
    /// Direct dependencies, deduplicated, in declaration order.
    pub deps: Vec<NodeId>,
    /// Static parameters handed to the tool on every invocation.
    #[serde(default)]
    pub params: serde_json::Value,
    /// Per-node timeout; overrides the orchestrator-wide default.
    #[serde(default)]
    pub timeout: Option<Duration>,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, tool: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool: tool.into(),
            deps: Vec::new(),
            params: serde_json::Value::Null,
            timeout: None,
        }
    }

    pub fn after<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<NodeId>,
    {
        for dep in deps {
            let dep = dep.into();
            if !self.deps.contains(&dep) {
                self.deps.push(dep);
            }
        }
        self
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
