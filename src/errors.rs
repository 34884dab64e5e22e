// src/errors.rs

//! Crate-wide error types.
//!
//! Two families:
//! - [`OrchestratorError`]: structural problems with a workflow (duplicate
//!   node, cycle, unknown dependency/tool) plus IO/config failures. These
//!   abort a run before any node executes.
//! - [`NodeError`]: what went wrong for a single node. These are captured
//!   into that node's result and never abort the run.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::NodeId;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Duplicate node: '{0}' is already defined")]
    DuplicateNode(NodeId),

    #[error("Unknown dependency: node '{node}' depends on '{dependency}', which does not exist")]
    UnknownDependency { node: NodeId, dependency: NodeId },

    #[error("Cycle detected in DAG: {0}")]
    CyclicGraph(String),

    #[error("Unknown tool: node '{node}' is bound to '{tool}', which is not registered")]
    UnknownTool { node: NodeId, tool: String },

    #[error("Level computation made no progress with {} node(s) left: {remaining:?}", .remaining.len())]
    Deadlock { remaining: Vec<NodeId> },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Per-node failure detail recorded in a node result.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeError {
    /// The tool ran and reported a failure.
    #[error("tool execution failed: {message}")]
    Execution { message: String },

    /// The tool did not finish within the node's timeout.
    #[error("tool timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    /// The run was cancelled before or while this node ran.
    #[error("execution cancelled")]
    Cancelled,

    /// The tool panicked; the panic was contained to this node.
    #[error("tool panicked: {message}")]
    Panicked { message: String },

    /// At least one dependency did not succeed, so the tool was never invoked.
    #[error("dependency failed: {}", .dependencies.join(", "))]
    DependencyFailed { dependencies: Vec<NodeId> },
}

impl NodeError {
    pub fn execution(message: impl Into<String>) -> Self {
        NodeError::Execution {
            message: message.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, OrchestratorError>;
