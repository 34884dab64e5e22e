// src/tool/registry.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::tool::Tool;

/// Registry of available tools, keyed by [`Tool::id`].
///
/// Orchestrators receive a registry explicitly (usually behind an `Arc`), so
/// two orchestrators only share tools when the caller hands them the same one.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids = self.ids();
        ids.sort_unstable();
        f.debug_struct("ToolRegistry").field("tools", &ids).finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its own id, replacing any previous registration.
    pub fn register(&mut self, tool: impl Tool) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        let id = tool.id().to_string();
        self.tools.insert(id, tool);
    }

    /// Builder-style variant of [`ToolRegistry::register`].
    pub fn with(mut self, tool: impl Tool) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tools.contains_key(id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
