// src/dag/state.rs

//! Per-run node state tracking.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::dag::graph::DagGraph;
use crate::dag::levels::Level;
use crate::types::{NodeId, NodeStatus};

/// What to do with the nodes of one level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LevelPlan {
    /// Nodes whose dependencies all succeeded; now `Ready`.
    pub ready: Vec<NodeId>,
    /// Nodes that must not run, with the dependencies that did not succeed.
    pub blocked: Vec<(NodeId, Vec<NodeId>)>,
}

/// Status of every node for a single execution.
///
/// All transitions go through [`RunStates::transition`], which refuses moves
/// the node lifecycle does not allow.
#[derive(Debug, Clone)]
pub struct RunStates {
    states: HashMap<NodeId, NodeStatus>,
}

impl RunStates {
    /// Every node of `graph` starts out `Pending`.
    pub fn new(graph: &DagGraph) -> Self {
        let states = graph
            .nodes()
            .map(|n| (n.id.clone(), NodeStatus::Pending))
            .collect();
        Self { states }
    }

    pub fn status(&self, id: &str) -> Option<NodeStatus> {
        self.states.get(id).copied()
    }

    /// Move `id` to `next`. Returns `false` (and leaves the state alone) if the
    /// node is unknown or the transition is illegal.
    pub fn transition(&mut self, id: &str, next: NodeStatus) -> bool {
        let Some(current) = self.states.get_mut(id) else {
            warn!(node = %id, "state transition for unknown node; ignoring");
            return false;
        };

        if !current.can_transition_to(next) {
            warn!(
                node = %id,
                from = %current,
                to = %next,
                "illegal node state transition; ignoring"
            );
            return false;
        }

        debug!(node = %id, from = %current, to = %next, "node state transition");
        *current = next;
        true
    }

    /// Dependencies of `id` that have not succeeded in this run.
    pub fn unsatisfied_dependencies(&self, graph: &DagGraph, id: &str) -> Vec<NodeId> {
        graph
            .dependencies_of(id)
            .iter()
            .filter(|dep| self.status(dep) != Some(NodeStatus::Succeeded))
            .cloned()
            .collect()
    }

    /// Decide which nodes of `level` run and which are blocked by a
    /// dependency that did not succeed. Ready nodes move to `Ready`; blocked
    /// ones move straight to `Skipped`.
    pub fn plan_level(&mut self, graph: &DagGraph, level: &Level) -> LevelPlan {
        let mut plan = LevelPlan::default();

        for id in level {
            let unsatisfied = self.unsatisfied_dependencies(graph, id);
            if unsatisfied.is_empty() {
                self.transition(id, NodeStatus::Ready);
                plan.ready.push(id.clone());
            } else {
                debug!(
                    node = %id,
                    failed_deps = ?unsatisfied,
                    "dependency did not succeed; skipping node"
                );
                self.transition(id, NodeStatus::Skipped);
                plan.blocked.push((id.clone(), unsatisfied));
            }
        }

        plan
    }

    /// Nodes that have not reached a terminal state.
    pub fn unfinished(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .states
            .iter()
            .filter(|(_, s)| !s.is_terminal())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn all_terminal(&self) -> bool {
        self.states.values().all(|s| s.is_terminal())
    }
}
