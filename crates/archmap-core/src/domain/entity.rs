//! Entity types for the knowledge graph
//!
//! Entities are the nodes of the graph: stores, components, workflows and the
//! other architectural facts the graph documents. Each entity carries an open
//! JSON `data` map whose shape is agreed per entity type by the producers
//! (analyzers) and consumers (serving layer); the store treats it as opaque.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A node in the knowledge graph
///
/// `(entity_type, name)` is a secondary key used for lookups but not enforced
/// unique; duplicates are legal and lookups return the first match in
/// insertion order. `version` starts at 1 and increments on every update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier (UUID v4, generated at creation)
    pub id: String,
    /// Type of the entity
    pub entity_type: EntityType,
    /// Human-readable name
    pub name: String,
    /// Open per-type payload, stored as a JSON object
    pub data: serde_json::Value,
    /// When the entity was created
    pub created_at: DateTime<Utc>,
    /// When the entity was last written
    pub updated_at: DateTime<Utc>,
    /// Monotonically increasing update counter, 1 on creation
    pub version: i64,
}

/// Input for creating a new entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEntity {
    /// Type of the entity
    pub entity_type: EntityType,
    /// Human-readable name
    pub name: String,
    /// Open per-type payload; defaults to an empty object
    pub data: serde_json::Value,
}

impl NewEntity {
    /// Create a new entity draft with an empty data payload
    pub fn new(entity_type: EntityType, name: impl Into<String>) -> Self {
        Self {
            entity_type,
            name: name.into(),
            data: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the data payload
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// Partial update applied to an existing entity
///
/// `None` fields are left untouched. Every update bumps `version` and
/// refreshes `updated_at`, even when both fields are `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityUpdate {
    /// New name, if renaming
    pub name: Option<String>,
    /// Replacement data payload, if changing
    pub data: Option<serde_json::Value>,
}

impl EntityUpdate {
    /// Update that renames the entity
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            data: None,
        }
    }

    /// Update that replaces the data payload
    pub fn data(data: serde_json::Value) -> Self {
        Self {
            name: None,
            data: Some(data),
        }
    }

    /// Set the name on an existing update
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the data payload on an existing update
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Types of graph entities
///
/// The vocabulary is fixed: the graph documents one project's architecture,
/// not arbitrary domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    /// A state store (e.g. a Zustand/Redux-style store)
    Store,
    /// A UI or system component
    Component,
    /// A multi-phase workflow
    Workflow,
    /// A phase within a workflow
    Phase,
    /// A user or system action
    Action,
    /// A stored code-generation template
    Pattern,
}

impl EntityType {
    /// Convert to the string stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Component => "component",
            Self::Workflow => "workflow",
            Self::Phase => "phase",
            Self::Action => "action",
            Self::Pattern => "pattern",
        }
    }

    /// Parse from the stored string representation
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "store" => Some(Self::Store),
            "component" => Some(Self::Component),
            "workflow" => Some(Self::Workflow),
            "phase" => Some(Self::Phase),
            "action" => Some(Self::Action),
            "pattern" => Some(Self::Pattern),
            _ => None,
        }
    }

    /// All entity types
    pub fn all() -> Vec<Self> {
        vec![
            Self::Store,
            Self::Component,
            Self::Workflow,
            Self::Phase,
            Self::Action,
            Self::Pattern,
        ]
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
