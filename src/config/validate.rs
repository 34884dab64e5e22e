// src/config/validate.rs

use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::model::{ConfigFile, ConfigSection, NodeConfig, RawConfigFile};
use crate::dag::{DagGraph, Node};
use crate::engine::OrchestratorOptions;
use crate::errors::{OrchestratorError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = OrchestratorError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_nodes(&raw)?;
        let options = validate_global_config(&raw.config)?;
        let graph = build_graph(&raw)?;
        Ok(ConfigFile::new_unchecked(
            options,
            raw.config.provenance_path,
            graph,
        ))
    }
}

fn ensure_has_nodes(cfg: &RawConfigFile) -> Result<()> {
    if cfg.node.is_empty() {
        return Err(OrchestratorError::ConfigError(
            "workflow must contain at least one [node.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &ConfigSection) -> Result<OrchestratorOptions> {
    if cfg.max_concurrency == Some(0) {
        return Err(OrchestratorError::ConfigError(
            "[config].max_concurrency must be >= 1 (got 0)".to_string(),
        ));
    }

    let node_timeout = cfg
        .node_timeout
        .as_deref()
        .map(|s| parse_timeout("[config].node_timeout", s))
        .transpose()?;

    Ok(OrchestratorOptions {
        node_timeout,
        max_concurrency: cfg.max_concurrency,
    })
}

/// Convert node sections into a graph, then check dependencies and cycles
/// with the same rules the programmatic API uses.
fn build_graph(cfg: &RawConfigFile) -> Result<DagGraph> {
    let mut graph = DagGraph::new();

    for (id, node_cfg) in cfg.node.iter() {
        graph.add(node_from_config(id, node_cfg)?)?;
    }

    graph.validate()?;
    Ok(graph)
}

fn node_from_config(id: &str, cfg: &NodeConfig) -> Result<Node> {
    if cfg.tool.trim().is_empty() {
        return Err(OrchestratorError::ConfigError(format!(
            "node '{}' has an empty `tool`",
            id
        )));
    }

    let mut node = Node::new(id, cfg.tool.trim()).after(cfg.after.iter().cloned());

    if let Some(params) = &cfg.params {
        node = node.with_params(params.clone());
    }

    if let Some(timeout) = cfg.timeout.as_deref() {
        node = node.with_timeout(parse_timeout(&format!("node '{}' timeout", id), timeout)?);
    }

    Ok(node)
}

fn parse_timeout(what: &str, value: &str) -> Result<Duration> {
    let duration = parse_duration(value)
        .map_err(|e| OrchestratorError::ConfigError(format!("{}: {}", what, e)))?;

    if duration.is_zero() {
        return Err(OrchestratorError::ConfigError(format!(
            "{}: timeout must be greater than zero",
            what
        )));
    }

    Ok(duration)
}
