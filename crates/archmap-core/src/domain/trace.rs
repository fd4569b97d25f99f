//! Workflow trace types
//!
//! A trace is the ordered set of nodes visited by a bounded breadth-first
//! walk from a workflow entity along `HAS_PHASE`/`TRIGGERS`/`MUTATES` edges.

use super::entity::EntityType;
use serde::{Deserialize, Serialize};

/// Maximum hop count for a workflow trace. Guarantees termination when the
/// phase graph contains cycles.
pub const MAX_TRACE_DEPTH: i64 = 10;

/// The result of tracing a workflow
///
/// An unknown workflow name yields an empty trace, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTrace {
    /// The workflow name that was traced
    pub workflow: String,
    /// Visited nodes ordered by `(depth, path)`; the workflow entity itself
    /// is the depth-0 step
    pub steps: Vec<TraceStep>,
}

impl WorkflowTrace {
    /// Whether the trace found no workflow entity at all
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Deepest hop level reached, or 0 for an empty trace
    pub fn max_depth(&self) -> i64 {
        self.steps.iter().map(|s| s.depth).max().unwrap_or(0)
    }
}

/// One visited node in a workflow trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceStep {
    /// Visited entity id
    pub entity_id: String,
    /// Visited entity name
    pub name: String,
    /// Visited entity type
    pub entity_type: EntityType,
    /// Hop distance from the workflow root
    pub depth: i64,
    /// Ids along the route taken, joined with `" -> "`
    pub path: String,
}
