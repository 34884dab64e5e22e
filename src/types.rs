// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical node identifier type used throughout the crate.
pub type NodeId = String;

/// Lifecycle state of a node within one execution.
///
/// ```text
/// Pending -> Ready -> Running -> Succeeded | Failed
///    \         \
///     +---------+--> Skipped
/// ```
///
/// `Succeeded`, `Failed` and `Skipped` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Waiting for an earlier level to finish.
    Pending,
    /// All dependencies succeeded; about to be dispatched.
    Ready,
    /// The tool is executing.
    Running,
    Succeeded,
    Failed,
    /// Never invoked (failed dependency or cancellation).
    Skipped,
}

impl NodeStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeStatus::Succeeded | NodeStatus::Failed | NodeStatus::Skipped
        )
    }

    /// Whether moving from `self` to `next` is a legal state transition.
    pub fn can_transition_to(self, next: NodeStatus) -> bool {
        use NodeStatus::*;
        matches!(
            (self, next),
            (Pending, Ready)
                | (Pending, Skipped)
                | (Ready, Running)
                | (Ready, Skipped)
                | (Running, Succeeded)
                | (Running, Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeStatus::Pending => "pending",
            NodeStatus::Ready => "ready",
            NodeStatus::Running => "running",
            NodeStatus::Succeeded => "succeeded",
            NodeStatus::Failed => "failed",
            NodeStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(NodeStatus::Pending),
            "ready" => Ok(NodeStatus::Ready),
            "running" => Ok(NodeStatus::Running),
            "succeeded" => Ok(NodeStatus::Succeeded),
            "failed" => Ok(NodeStatus::Failed),
            "skipped" => Ok(NodeStatus::Skipped),
            other => Err(format!("invalid node status: {other}")),
        }
    }
}

/// Log verbosity accepted by [`crate::logging::init_logging`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!(
                "invalid log level: {other} (expected error, warn, info, debug or trace)"
            )),
        }
    }
}
