//! Observations: free-text facts attached to entities
//!
//! Observations are the full-text-searchable layer of the graph. Many
//! observations may exist per entity, `(entity_id, key)` is not unique, and
//! the whole set for an entity is wiped at once when it is replaced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A free-text fact attached to an entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Unique identifier (UUID v4, generated at creation)
    pub id: String,
    /// Owning entity id
    pub entity_id: String,
    /// Fact category (e.g. "purpose", "dependency", "caveat")
    pub key: String,
    /// Free-text value, full-text indexed
    pub value: String,
    /// When the observation was recorded
    pub created_at: DateTime<Utc>,
}
