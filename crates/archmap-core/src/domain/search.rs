//! Result types for full-text search and exact-match graph queries

use super::entity::EntityType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A ranked full-text search hit
///
/// One result per matching observation, joined back to its owning entity.
/// `score` is the absolute bm25 relevance (higher is better); ties keep
/// observation insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Owning entity id
    pub entity_id: String,
    /// Owning entity name
    pub entity_name: String,
    /// Owning entity type
    pub entity_type: EntityType,
    /// Matching observation id
    pub observation_id: String,
    /// Matching observation key
    pub key: String,
    /// Context window around the match, with `[`/`]` highlight markers
    pub snippet: String,
    /// Relevance score (absolute bm25, higher is better)
    pub score: f64,
}

/// A recorded state mutation of a named store
///
/// Derived from incoming `MUTATES` edges into a `Store` entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateMutation {
    /// The store being mutated
    pub store: String,
    /// Id of the entity performing the mutation
    pub source_id: String,
    /// Name of the entity performing the mutation
    pub source_name: String,
    /// Type of the entity performing the mutation
    pub source_type: EntityType,
    /// Edge properties recorded on the MUTATES relation
    pub properties: serde_json::Value,
    /// When the mutation fact was recorded
    pub created_at: DateTime<Utc>,
}

/// An entity ranked by similarity to a reference entity
///
/// Similarity is approximate: the number of relation types the two entities
/// share, with a bonus for matching entity type. It is a ranking signal, not
/// an equivalence test.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarEntity {
    /// Candidate entity id
    pub entity_id: String,
    /// Candidate entity name
    pub name: String,
    /// Candidate entity type
    pub entity_type: EntityType,
    /// How many relation types the candidate shares with the reference
    pub shared_relation_types: u32,
    /// Combined similarity score (shared types plus same-type bonus)
    pub score: f64,
}
