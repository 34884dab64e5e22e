#![allow(dead_code)]

use std::path::PathBuf;

use tooldag::config::{ConfigFile, NodeConfig, RawConfigFile};
use tooldag::errors::Result;

/// Builder for `ConfigFile` to simplify test setup.
pub struct WorkflowBuilder {
    config: RawConfigFile,
}

impl WorkflowBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_node(mut self, id: &str, node: NodeConfig) -> Self {
        self.config.node.insert(id.to_string(), node);
        self
    }

    pub fn node_timeout(mut self, duration: &str) -> Self {
        self.config.config.node_timeout = Some(duration.to_string());
        self
    }

    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.config.config.max_concurrency = Some(limit);
        self
    }

    pub fn provenance_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.config.provenance_path = Some(path.into());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for WorkflowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `NodeConfig`.
pub struct NodeConfigBuilder {
    node: NodeConfig,
}

impl NodeConfigBuilder {
    pub fn new(tool: &str) -> Self {
        Self {
            node: NodeConfig {
                tool: tool.to_string(),
                after: vec![],
                params: None,
                timeout: None,
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.node.after.push(dep.to_string());
        self
    }

    pub fn params(mut self, params: serde_json::Value) -> Self {
        self.node.params = Some(params);
        self
    }

    pub fn timeout(mut self, duration: &str) -> Self {
        self.node.timeout = Some(duration.to_string());
        self
    }

    pub fn build(self) -> NodeConfig {
        self.node
    }
}
