// src/engine/mod.rs

//! Orchestration engine.
//!
//! - [`orchestrator`] is the public entry point: build a graph, validate it,
//!   compute its levels and execute it.
//! - [`executor`] runs levels with barrier semantics and concurrent nodes.
//! - [`report`] holds per-node results, metrics and the aggregate report.
//! - [`trace`] records node events and produces provenance records.

use std::time::Duration;

use crate::errors::{OrchestratorError, Result};

pub mod executor;
pub mod orchestrator;
pub mod report;
pub mod trace;

pub use orchestrator::Orchestrator;
pub use report::{ExecutionMetrics, ExecutionReport, NodeResult};
pub use trace::{ExecutionTrace, ProvenanceRecord, TraceEvent, TraceEventKind};

/// Knobs that apply to a whole execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestratorOptions {
    /// Default timeout for every node; a node's own timeout wins.
    pub node_timeout: Option<Duration>,
    /// Upper bound on tools running at once within a level.
    pub max_concurrency: Option<usize>,
}

impl OrchestratorOptions {
    /// Reject settings under which no node could ever run or finish.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == Some(0) {
            return Err(OrchestratorError::ConfigError(
                "max_concurrency must be >= 1 (got 0)".to_string(),
            ));
        }
        if self.node_timeout.is_some_and(|t| t.is_zero()) {
            return Err(OrchestratorError::ConfigError(
                "node_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
