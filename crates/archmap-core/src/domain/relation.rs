//! Relations (edges) between graph entities
//!
//! A relation is a directed, typed edge. Relation types are an open string
//! vocabulary interpreted by the query engine; the well-known values used by
//! traversal live in [`relation_types`]. Endpoints are not validated against
//! the entities table at write time, and deleting an entity leaves its edges
//! in place — readers drop dangling edges lazily when they join back to the
//! entities table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known relation types recognized by the query engine.
///
/// Any other string is legal; these are the ones traversal filters on.
pub mod relation_types {
    /// Source consumes the target (component reads a store)
    pub const USES: &str = "USES";
    /// Source writes the target store's state
    pub const MUTATES: &str = "MUTATES";
    /// Workflow owns a phase
    pub const HAS_PHASE: &str = "HAS_PHASE";
    /// Source causes the target to run
    pub const TRIGGERS: &str = "TRIGGERS";
    /// Structural containment
    pub const CONTAINS: &str = "CONTAINS";
    /// Source implements the target pattern or contract
    pub const IMPLEMENTS: &str = "IMPLEMENTS";
}

/// A directed, typed edge between two entities
///
/// Multiple parallel edges with the same `(from_id, to_id, relation_type)`
/// are legal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    /// Unique identifier (UUID v4, generated at creation)
    pub id: String,
    /// Source entity id
    pub from_id: String,
    /// Target entity id
    pub to_id: String,
    /// Relation type (open vocabulary)
    pub relation_type: String,
    /// Open edge payload, stored as a JSON object
    pub properties: serde_json::Value,
    /// When the relation was created
    pub created_at: DateTime<Utc>,
}

impl Relation {
    /// Whether the given entity is one of this relation's endpoints
    pub fn touches(&self, entity_id: &str) -> bool {
        self.from_id == entity_id || self.to_id == entity_id
    }

    /// The opposite endpoint when viewed from `entity_id`, if it is an
    /// endpoint at all
    pub fn other_endpoint(&self, entity_id: &str) -> Option<&str> {
        if self.from_id == entity_id {
            Some(&self.to_id)
        } else if self.to_id == entity_id {
            Some(&self.from_id)
        } else {
            None
        }
    }
}

/// Input for creating a new relation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRelation {
    /// Source entity id
    pub from_id: String,
    /// Target entity id
    pub to_id: String,
    /// Relation type (open vocabulary)
    pub relation_type: String,
    /// Open edge payload; defaults to an empty object
    pub properties: serde_json::Value,
}

impl NewRelation {
    /// Create a relation draft with empty properties
    pub fn new(
        from_id: impl Into<String>,
        to_id: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            relation_type: relation_type.into(),
            properties: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the edge properties
    pub fn with_properties(mut self, properties: serde_json::Value) -> Self {
        self.properties = properties;
        self
    }
}
