// src/dag/levels.rs

//! Level extraction: grouping nodes into maximal sets that can run together.

use std::collections::{BTreeSet, HashSet};

use tracing::debug;

use crate::errors::{OrchestratorError, Result};
use crate::types::NodeId;

/// A set of mutually independent nodes whose dependencies are all satisfied
/// by earlier levels.
pub type Level = BTreeSet<NodeId>;

/// Repeatedly extract every not-yet-scheduled node whose dependencies are
/// already scheduled. Each extraction is one level.
///
/// Expects a validated graph. If a pass extracts nothing while nodes remain
/// (a cycle, or a dependency that is not in the input), this returns
/// [`OrchestratorError::Deadlock`] instead of guessing a partial order.
pub fn extract_levels<'a, I>(nodes: I) -> Result<Vec<Level>>
where
    I: IntoIterator<Item = (&'a str, &'a [NodeId])>,
{
    let mut remaining: Vec<(&str, &[NodeId])> = nodes.into_iter().collect();
    let mut scheduled: HashSet<&str> = HashSet::with_capacity(remaining.len());
    let mut levels = Vec::new();

    while !remaining.is_empty() {
        let (ready, blocked): (Vec<_>, Vec<_>) = remaining
            .into_iter()
            .partition(|(_, deps)| deps.iter().all(|d| scheduled.contains(d.as_str())));

        if ready.is_empty() {
            let mut stuck: Vec<NodeId> = blocked.iter().map(|(id, _)| id.to_string()).collect();
            stuck.sort();
            return Err(OrchestratorError::Deadlock { remaining: stuck });
        }

        let level: Level = ready.iter().map(|(id, _)| id.to_string()).collect();
        debug!(level = levels.len(), nodes = ?level, "extracted level");

        scheduled.extend(ready.iter().map(|(id, _)| *id));
        levels.push(level);
        remaining = blocked;
    }

    Ok(levels)
}
