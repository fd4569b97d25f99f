//! Observation repository
//!
//! Free-text facts attached to entities. The FTS index over `value` is
//! maintained by schema triggers, so every insert and delete here updates it
//! transparently — there is no separate indexing step to forget.

use crate::domain::Observation;
use crate::error::{Error, Result};
use crate::storage::{stmt, StatementRegistry};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

/// Repository for observation rows
#[derive(Debug, Clone)]
pub struct ObservationStore {
    pool: SqlitePool,
    statements: StatementRegistry,
}

impl ObservationStore {
    /// Create a repository over the given pool
    pub fn new(pool: SqlitePool, statements: StatementRegistry) -> Self {
        Self { pool, statements }
    }

    /// Attach a free-text fact to an entity
    ///
    /// `(entity_id, key)` is not unique; repeated keys accumulate.
    pub async fn add(&self, entity_id: &str, key: &str, value: &str) -> Result<Observation> {
        let mut conn = self.pool.acquire().await?;
        self.add_in(&mut conn, entity_id, key, value).await
    }

    /// Transaction-scoped variant of [`add`](Self::add)
    pub async fn add_in(
        &self,
        conn: &mut SqliteConnection,
        entity_id: &str,
        key: &str,
        value: &str,
    ) -> Result<Observation> {
        if entity_id.trim().is_empty() {
            return Err(Error::ConstraintViolation(
                "observation entity id must not be empty".to_string(),
            ));
        }
        if key.trim().is_empty() {
            return Err(Error::ConstraintViolation(
                "observation key must not be empty".to_string(),
            ));
        }

        let observation = Observation {
            id: Uuid::new_v4().to_string(),
            entity_id: entity_id.to_string(),
            key: key.to_string(),
            value: value.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(self.statements.sql(stmt::OBSERVATION_INSERT)?)
            .bind(&observation.id)
            .bind(&observation.entity_id)
            .bind(&observation.key)
            .bind(&observation.value)
            .bind(observation.created_at)
            .execute(&mut *conn)
            .await?;

        debug!(entity_id = %entity_id, key = %key, "observation added");
        Ok(observation)
    }

    /// All observations for an entity, in insertion order
    pub async fn for_entity(&self, entity_id: &str) -> Result<Vec<Observation>> {
        let rows: Vec<ObservationRow> =
            sqlx::query_as(self.statements.sql(stmt::OBSERVATION_FOR_ENTITY)?)
                .bind(entity_id)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(|r| r.into_observation()).collect())
    }

    /// Remove every observation attached to an entity
    ///
    /// Used before replacing an entity's observation set. Wiping an entity
    /// with no observations is a no-op, not an error.
    pub async fn delete_for_entity(&self, entity_id: &str) -> Result<u64> {
        let mut conn = self.pool.acquire().await?;
        self.delete_for_entity_in(&mut conn, entity_id).await
    }

    /// Transaction-scoped variant of [`delete_for_entity`](Self::delete_for_entity)
    pub async fn delete_for_entity_in(
        &self,
        conn: &mut SqliteConnection,
        entity_id: &str,
    ) -> Result<u64> {
        let result = sqlx::query(self.statements.sql(stmt::OBSERVATION_DELETE_FOR_ENTITY)?)
            .bind(entity_id)
            .execute(&mut *conn)
            .await?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            info!(entity_id = %entity_id, deleted = deleted, "observations wiped");
        }
        Ok(deleted)
    }

    /// Replace an entity's observation set atomically
    ///
    /// Wipes the existing set and inserts `items` as one transaction; either
    /// the whole replacement lands or none of it does.
    pub async fn replace(
        &self,
        entity_id: &str,
        items: &[(String, String)],
    ) -> Result<Vec<Observation>> {
        let mut tx = self.pool.begin().await?;
        let replaced = self.replace_in(&mut *tx, entity_id, items).await?;
        tx.commit().await?;
        Ok(replaced)
    }

    /// Transaction-scoped variant of [`replace`](Self::replace)
    pub async fn replace_in(
        &self,
        conn: &mut SqliteConnection,
        entity_id: &str,
        items: &[(String, String)],
    ) -> Result<Vec<Observation>> {
        self.delete_for_entity_in(&mut *conn, entity_id).await?;

        let mut out = Vec::with_capacity(items.len());
        for (key, value) in items {
            out.push(self.add_in(&mut *conn, entity_id, key, value).await?);
        }
        Ok(out)
    }
}

/// Database row for an observation
#[derive(Debug, sqlx::FromRow)]
struct ObservationRow {
    id: String,
    entity_id: String,
    key: String,
    value: String,
    created_at: DateTime<Utc>,
}

impl ObservationRow {
    fn into_observation(self) -> Observation {
        Observation {
            id: self.id,
            entity_id: self.entity_id,
            key: self.key,
            value: self.value,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    async fn create_test_store() -> ObservationStore {
        let db = Database::in_memory().await.expect("open test database");
        ObservationStore::new(db.pool().clone(), StatementRegistry::new())
    }

    #[tokio::test]
    async fn test_add_and_list_in_insertion_order() {
        let store = create_test_store().await;

        store.add("e1", "purpose", "session handling").await.unwrap();
        store.add("e1", "caveat", "not thread safe").await.unwrap();
        store.add("e2", "purpose", "unrelated").await.unwrap();

        let observations = store.for_entity("e1").await.unwrap();
        assert_eq!(observations.len(), 2);
        assert_eq!(observations[0].key, "purpose");
        assert_eq!(observations[1].key, "caveat");
    }

    #[tokio::test]
    async fn test_repeated_keys_accumulate() {
        let store = create_test_store().await;
        store.add("e1", "dependency", "tokio").await.unwrap();
        store.add("e1", "dependency", "serde").await.unwrap();

        let observations = store.for_entity("e1").await.unwrap();
        assert_eq!(observations.len(), 2);
        assert!(observations.iter().all(|o| o.key == "dependency"));
    }

    #[tokio::test]
    async fn test_delete_for_entity() {
        let store = create_test_store().await;
        store.add("e1", "purpose", "a").await.unwrap();
        store.add("e1", "purpose", "b").await.unwrap();

        let deleted = store.delete_for_entity("e1").await.unwrap();
        assert_eq!(deleted, 2);
        assert!(store.for_entity("e1").await.unwrap().is_empty());

        // Wiping again is a no-op
        assert_eq!(store.delete_for_entity("e1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_replace_swaps_whole_set() {
        let store = create_test_store().await;
        store.add("e1", "purpose", "old fact").await.unwrap();

        let replaced = store
            .replace(
                "e1",
                &[
                    ("purpose".to_string(), "new fact".to_string()),
                    ("caveat".to_string(), "beta".to_string()),
                ],
            )
            .await
            .unwrap();
        assert_eq!(replaced.len(), 2);

        let observations = store.for_entity("e1").await.unwrap();
        assert_eq!(observations.len(), 2);
        assert!(observations.iter().all(|o| o.value != "old fact"));
    }

    #[tokio::test]
    async fn test_empty_key_is_rejected() {
        let store = create_test_store().await;
        let err = store.add("e1", " ", "value").await.unwrap_err();
        assert!(matches!(err, Error::ConstraintViolation(_)));
    }
}
