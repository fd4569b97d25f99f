//! Domain types for the knowledge graph
//!
//! Plain serde-serializable types shared between the store and its callers:
//!
//! - **Entity**: a typed, named node with an open JSON data payload
//! - **Relation**: a typed, directed edge between two entities
//! - **Observation**: a free-text fact attached to an entity
//! - query results: search hits, workflow traces, impact reports, state
//!   mutations, similarity rankings and generated pattern output
//!
//! Every type here round-trips through JSON so the serving layer can pass
//! arguments and results straight through.

mod entity;
mod impact;
mod observation;
mod pattern;
mod relation;
mod search;
mod trace;

pub use entity::{Entity, EntityType, EntityUpdate, NewEntity};
pub use impact::{
    DirectImpact, ImpactReport, IndirectImpact, Severity, SeverityPolicy, MAX_IMPACT_DEPTH,
};
pub use observation::Observation;
pub use pattern::{
    render_template, unresolved_placeholders, GenerateRequest, GeneratedOutput, TEMPLATE_DATA_KEY,
};
pub use relation::{relation_types, NewRelation, Relation};
pub use search::{SearchResult, SimilarEntity, StateMutation};
pub use trace::{TraceStep, WorkflowTrace, MAX_TRACE_DEPTH};
