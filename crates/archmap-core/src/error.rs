//! Error types for Archmap

use thiserror::Error;

/// Result type alias using Archmap's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Archmap error types
///
/// Lookup misses on keyed operations (unknown entity id, unknown statement
/// name) are errors; traversal and search roots that simply do not exist are
/// not — those paths return empty results instead.
#[derive(Error, Debug)]
pub enum Error {
    // Entity errors
    #[error("Entity '{0}' not found")]
    EntityNotFound(String),

    #[error("Relation '{0}' not found")]
    RelationNotFound(String),

    // Statement registry errors
    #[error("Unknown statement '{0}'. Statement names are fixed at compile time; this is a bug in the caller.")]
    StatementNotFound(String),

    // Query errors
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    // Schema errors
    #[error("Migration failed: {0}")]
    MigrationFailure(String),

    // Write validation errors
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    // Stored data that no longer parses (corrupt JSON blob, unknown type tag)
    #[error("Parse error: {0}")]
    Parse(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error is a lookup miss rather than a failure of the
    /// storage layer itself. The serving layer typically maps these to a
    /// not-found response instead of an internal error.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EntityNotFound(_) | Self::RelationNotFound(_) | Self::StatementNotFound(_)
        )
    }
}
