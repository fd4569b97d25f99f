//! Relation repository
//!
//! Edges are written without checking that their endpoints exist — the
//! cross-table check on every edge write is deliberately skipped, and
//! consistency after entity deletion is the caller's responsibility. Read
//! paths that need endpoint data join against the entities table and drop
//! dangling edges there.

use crate::domain::{NewRelation, Relation};
use crate::error::{Error, Result};
use crate::graph::entities::{to_json_text, validate_payload};
use crate::storage::{stmt, StatementRegistry};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

/// Repository for relation rows
#[derive(Debug, Clone)]
pub struct RelationStore {
    pool: SqlitePool,
    statements: StatementRegistry,
}

impl RelationStore {
    /// Create a repository over the given pool
    pub fn new(pool: SqlitePool, statements: StatementRegistry) -> Self {
        Self { pool, statements }
    }

    /// Create a directed edge between two entity ids
    pub async fn create(&self, new: NewRelation) -> Result<Relation> {
        let mut conn = self.pool.acquire().await?;
        self.create_in(&mut conn, new).await
    }

    /// Transaction-scoped variant of [`create`](Self::create)
    pub async fn create_in(
        &self,
        conn: &mut SqliteConnection,
        new: NewRelation,
    ) -> Result<Relation> {
        if new.from_id.trim().is_empty() || new.to_id.trim().is_empty() {
            return Err(Error::ConstraintViolation(
                "relation endpoints must not be empty".to_string(),
            ));
        }
        if new.relation_type.trim().is_empty() {
            return Err(Error::ConstraintViolation(
                "relation type must not be empty".to_string(),
            ));
        }
        validate_payload("relation properties", &new.properties)?;

        let relation = Relation {
            id: Uuid::new_v4().to_string(),
            from_id: new.from_id,
            to_id: new.to_id,
            relation_type: new.relation_type,
            properties: new.properties,
            created_at: Utc::now(),
        };
        let properties_json = to_json_text(&relation.properties)?;

        sqlx::query(self.statements.sql(stmt::RELATION_INSERT)?)
            .bind(&relation.id)
            .bind(&relation.from_id)
            .bind(&relation.to_id)
            .bind(&relation.relation_type)
            .bind(&properties_json)
            .bind(relation.created_at)
            .execute(&mut *conn)
            .await?;

        debug!(
            relation_id = %relation.id,
            from = %relation.from_id,
            to = %relation.to_id,
            relation_type = %relation.relation_type,
            "relation created"
        );
        Ok(relation)
    }

    /// Delete an edge by id
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        self.delete_in(&mut conn, id).await
    }

    /// Transaction-scoped variant of [`delete`](Self::delete)
    pub async fn delete_in(&self, conn: &mut SqliteConnection, id: &str) -> Result<()> {
        let result = sqlx::query(self.statements.sql(stmt::RELATION_DELETE)?)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::RelationNotFound(id.to_string()));
        }

        info!(relation_id = %id, "relation deleted");
        Ok(())
    }

    /// All edges where the entity is either endpoint, in one result set
    ///
    /// Callers distinguish direction by comparing `from_id`/`to_id` against
    /// the queried id (see [`Relation::other_endpoint`]).
    pub async fn for_entity(&self, entity_id: &str) -> Result<Vec<Relation>> {
        let rows: Vec<RelationRow> = sqlx::query_as(self.statements.sql(stmt::RELATION_FOR_ENTITY)?)
            .bind(entity_id)
            .bind(entity_id)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.into_relation()).collect()
    }

    /// Total number of relations
    pub async fn count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(self.statements.sql(stmt::RELATION_COUNT)?)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

/// Database row for a relation
#[derive(Debug, sqlx::FromRow)]
struct RelationRow {
    id: String,
    from_id: String,
    to_id: String,
    relation_type: String,
    properties: String,
    created_at: DateTime<Utc>,
}

impl RelationRow {
    fn into_relation(self) -> Result<Relation> {
        let properties = serde_json::from_str(&self.properties)
            .map_err(|e| Error::Parse(format!("invalid relation properties for {}: {e}", self.id)))?;

        Ok(Relation {
            id: self.id,
            from_id: self.from_id,
            to_id: self.to_id,
            relation_type: self.relation_type,
            properties,
            created_at: self.created_at,
        })
    }
}
