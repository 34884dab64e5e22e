// src/dag/mod.rs

//! DAG representation and per-run state.
//!
//! - [`node`] defines a single unit of work bound to a tool.
//! - [`graph`] holds the nodes, validates them (petgraph) and computes
//!   topological order and levels.
//! - [`levels`] contains the level extraction algorithm.
//! - [`state`] tracks node statuses during one execution and decides which
//!   nodes of a level may run.

pub mod graph;
pub mod levels;
pub mod node;
pub mod state;

pub use graph::DagGraph;
pub use levels::{Level, extract_levels};
pub use node::Node;
pub use state::{LevelPlan, RunStates};
