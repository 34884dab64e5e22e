// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::dag::DagGraph;
use crate::engine::OrchestratorOptions;
use crate::types::NodeId;

/// Top-level workflow file as read from TOML, before validation.
///
/// ```toml
/// [config]
/// node_timeout = "30s"
/// max_concurrency = 4
/// provenance_path = "provenance.json"
///
/// [node.load]
/// tool = "pdf_loader"
/// params = { path = "paper.pdf" }
///
/// [node.chunk]
/// tool = "chunker"
/// after = ["load"]
/// timeout = "5s"
/// ```
///
/// All sections are optional at the parsing stage; validation requires at
/// least one node.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// Run-wide settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All nodes from `[node.<id>]`, keyed by node id.
    #[serde(default)]
    pub node: BTreeMap<NodeId, NodeConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigSection {
    /// Default per-node timeout, e.g. `"500ms"`, `"30s"`, `"2m"`.
    #[serde(default)]
    pub node_timeout: Option<String>,

    /// Maximum number of tools running at once within a level.
    #[serde(default)]
    pub max_concurrency: Option<usize>,

    /// Where [`crate::run_workflow`] writes provenance records. Relative
    /// paths are resolved against the workflow file's directory.
    #[serde(default)]
    pub provenance_path: Option<PathBuf>,
}

/// `[node.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Tool id in the registry.
    pub tool: String,

    /// Dependencies: this node waits for all nodes listed here.
    #[serde(default)]
    pub after: Vec<NodeId>,

    /// Static parameters passed to the tool.
    #[serde(default)]
    pub params: Option<serde_json::Value>,

    /// Per-node timeout; overrides `[config].node_timeout`.
    #[serde(default)]
    pub timeout: Option<String>,
}

/// A validated workflow: the graph is acyclic, every dependency exists and
/// all durations parsed.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `config::validate`).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub options: OrchestratorOptions,
    pub provenance_path: Option<PathBuf>,
    graph: DagGraph,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        options: OrchestratorOptions,
        provenance_path: Option<PathBuf>,
        graph: DagGraph,
    ) -> Self {
        Self {
            options,
            provenance_path,
            graph,
        }
    }

    pub fn graph(&self) -> &DagGraph {
        &self.graph
    }
}
