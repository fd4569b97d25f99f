//! Impact analysis types
//!
//! Impact analysis computes the set of entities transitively affected by a
//! change to a given entity: the direct one-hop dependents plus an indirect
//! set discovered by a bounded recursive walk.

use super::entity::EntityType;
use serde::{Deserialize, Serialize};

/// Maximum hop count for indirect impact expansion.
pub const MAX_IMPACT_DEPTH: i64 = 3;

/// Full impact analysis result for one entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactReport {
    /// The entity that was analyzed
    pub entity: String,
    /// One-hop outgoing dependents
    pub direct: Vec<DirectImpact>,
    /// Entities first reached at hop 2 or 3, deduplicated by `(name, type)`
    pub indirect: Vec<IndirectImpact>,
    /// Derived severity classification
    pub severity: Severity,
}

impl ImpactReport {
    /// Total number of impacted entities (direct + indirect)
    pub fn impacted_count(&self) -> usize {
        self.direct.len() + self.indirect.len()
    }
}

/// A directly impacted entity (one outgoing edge away)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectImpact {
    /// Impacted entity name
    pub name: String,
    /// Impacted entity type
    pub entity_type: EntityType,
    /// The relation type connecting the analyzed entity to this one
    pub relation_type: String,
}

/// An indirectly impacted entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndirectImpact {
    /// Impacted entity name
    pub name: String,
    /// Impacted entity type
    pub entity_type: EntityType,
    /// Hop level at which the entity was first reached (2 or 3)
    pub level: i64,
}

/// Severity tiers for an impact report
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Few or no dependents
    Low,
    /// A handful of dependents
    Medium,
    /// A significant share of the graph is affected
    High,
    /// Change ripples across most of the documented architecture
    Critical,
}

impl Severity {
    /// Convert to the string exposed to callers
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Policy mapping an impacted-entity count to a severity tier
///
/// Thresholds are an injection point rather than fixed constants. The
/// constructor normalizes threshold ordering, so classification is always
/// monotonic: a larger count never yields a lower tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SeverityPolicy {
    /// Counts at or above this are at least `Medium`
    pub medium_at: usize,
    /// Counts at or above this are at least `High`
    pub high_at: usize,
    /// Counts at or above this are `Critical`
    pub critical_at: usize,
}

impl SeverityPolicy {
    /// Create a policy, normalizing thresholds into non-decreasing order
    pub fn new(medium_at: usize, high_at: usize, critical_at: usize) -> Self {
        let high_at = high_at.max(medium_at);
        let critical_at = critical_at.max(high_at);
        Self {
            medium_at,
            high_at,
            critical_at,
        }
    }

    /// Classify an impacted-entity count
    pub fn classify(&self, impacted: usize) -> Severity {
        if impacted >= self.critical_at {
            Severity::Critical
        } else if impacted >= self.high_at {
            Severity::High
        } else if impacted >= self.medium_at {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self::new(3, 6, 11)
    }
}
