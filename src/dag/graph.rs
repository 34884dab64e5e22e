// src/dag/graph.rs

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::levels::{Level, extract_levels};
use crate::dag::node::Node;
use crate::errors::{OrchestratorError, Result};
use crate::types::NodeId;

/// In-memory DAG of nodes keyed by id.
///
/// Nodes can be added in any order, so dependencies are only checked by
/// [`DagGraph::validate`]. Every query that needs a well-formed graph
/// validates first.
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    nodes: BTreeMap<NodeId, Node>,
    /// Insertion order, used to keep topological output stable.
    order: Vec<NodeId>,
    /// Reverse edges: dependency -> nodes that list it. May mention ids that
    /// have not been added (yet).
    dependents: HashMap<NodeId, Vec<NodeId>>,
}

impl DagGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node.
    ///
    /// Fails with [`OrchestratorError::DuplicateNode`] if the id is taken; the
    /// existing definition is left untouched.
    pub fn add(&mut self, node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Err(OrchestratorError::DuplicateNode(node.id));
        }

        for dep in &node.deps {
            self.dependents
                .entry(dep.clone())
                .or_default()
                .push(node.id.clone());
        }

        self.order.push(node.id.clone());
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Immediate dependencies of a node.
    pub fn dependencies_of(&self, id: &str) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a node (nodes that list it as a dependency).
    pub fn dependents_of(&self, id: &str) -> &[NodeId] {
        self.dependents
            .get(id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Check that every dependency exists and the graph is acyclic.
    pub fn validate(&self) -> Result<()> {
        self.check_dependencies()?;
        self.topological_order().map(|_| ())
    }

    /// Topologically sorted node ids.
    pub fn execution_order(&self) -> Result<Vec<NodeId>> {
        self.check_dependencies()?;
        self.topological_order()
    }

    /// Group nodes into levels of mutually independent nodes.
    pub fn compute_levels(&self) -> Result<Vec<Level>> {
        self.validate()?;
        extract_levels(self.nodes().map(|n| (n.id.as_str(), n.deps.as_slice())))
    }

    fn check_dependencies(&self) -> Result<()> {
        for node in self.nodes() {
            for dep in &node.deps {
                if dep == &node.id {
                    return Err(OrchestratorError::CyclicGraph(format!(
                        "node '{}' depends on itself",
                        node.id
                    )));
                }
                if !self.nodes.contains_key(dep) {
                    return Err(OrchestratorError::UnknownDependency {
                        node: node.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn topological_order(&self) -> Result<Vec<NodeId>> {
        // Edge direction: dep -> node, so dependencies sort first.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

        for id in &self.order {
            graph.add_node(id.as_str());
        }

        for node in self.nodes() {
            for dep in &node.deps {
                graph.add_edge(dep.as_str(), node.id.as_str(), ());
            }
        }

        match toposort(&graph, None) {
            Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
            Err(cycle) => Err(OrchestratorError::CyclicGraph(format!(
                "cycle detected in DAG involving node '{}'",
                cycle.node_id()
            ))),
        }
    }
}
