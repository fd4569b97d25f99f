//! Entity repository
//!
//! Owns the lifecycle of graph nodes. Deleting an entity removes only the
//! entity row: relations and observations survive and must be pruned by the
//! caller, in a scoped transaction when the removal has to be atomic.

use crate::domain::{Entity, EntityType, EntityUpdate, NewEntity};
use crate::error::{Error, Result};
use crate::storage::{stmt, StatementRegistry};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

/// Repository for entity rows
#[derive(Debug, Clone)]
pub struct EntityStore {
    pool: SqlitePool,
    statements: StatementRegistry,
}

impl EntityStore {
    /// Create a repository over the given pool
    pub fn new(pool: SqlitePool, statements: StatementRegistry) -> Self {
        Self { pool, statements }
    }

    /// Create a new entity with `version = 1`
    pub async fn create(&self, new: NewEntity) -> Result<Entity> {
        let mut conn = self.pool.acquire().await?;
        self.create_in(&mut conn, new).await
    }

    /// Transaction-scoped variant of [`create`](Self::create)
    pub async fn create_in(&self, conn: &mut SqliteConnection, new: NewEntity) -> Result<Entity> {
        validate_name(&new.name)?;
        validate_payload("entity data", &new.data)?;

        // One timestamp for both columns so a fresh entity always reads
        // created_at == updated_at.
        let now = Utc::now();
        let entity = Entity {
            id: Uuid::new_v4().to_string(),
            entity_type: new.entity_type,
            name: new.name,
            data: new.data,
            created_at: now,
            updated_at: now,
            version: 1,
        };
        let data_json = to_json_text(&entity.data)?;

        sqlx::query(self.statements.sql(stmt::ENTITY_INSERT)?)
            .bind(&entity.id)
            .bind(entity.entity_type.as_str())
            .bind(&entity.name)
            .bind(&data_json)
            .bind(entity.created_at)
            .bind(entity.updated_at)
            .execute(&mut *conn)
            .await?;

        debug!(entity_id = %entity.id, name = %entity.name, "entity created");
        Ok(entity)
    }

    /// Apply a partial update, bumping `version` and refreshing `updated_at`
    pub async fn update(&self, id: &str, update: EntityUpdate) -> Result<Entity> {
        let mut conn = self.pool.acquire().await?;
        self.update_in(&mut conn, id, update).await
    }

    /// Transaction-scoped variant of [`update`](Self::update)
    pub async fn update_in(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        update: EntityUpdate,
    ) -> Result<Entity> {
        if let Some(name) = &update.name {
            validate_name(name)?;
        }
        let data_json = match &update.data {
            Some(data) => {
                validate_payload("entity data", data)?;
                Some(to_json_text(data)?)
            }
            None => None,
        };

        let result = sqlx::query(self.statements.sql(stmt::ENTITY_UPDATE)?)
            .bind(update.name.as_deref())
            .bind(data_json.as_deref())
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::EntityNotFound(id.to_string()));
        }

        let row: EntityRow = sqlx::query_as(self.statements.sql(stmt::ENTITY_GET)?)
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
        row.into_entity()
    }

    /// Get an entity by id
    pub async fn get(&self, id: &str) -> Result<Option<Entity>> {
        let row: Option<EntityRow> = sqlx::query_as(self.statements.sql(stmt::ENTITY_GET)?)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_entity()).transpose()
    }

    /// Get the first entity with the given type and name, in insertion order
    ///
    /// Duplicate `(type, name)` pairs are legal but discouraged.
    pub async fn get_by_name(
        &self,
        entity_type: EntityType,
        name: &str,
    ) -> Result<Option<Entity>> {
        let row: Option<EntityRow> = sqlx::query_as(self.statements.sql(stmt::ENTITY_GET_BY_NAME)?)
            .bind(entity_type.as_str())
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.into_entity()).transpose()
    }

    /// Delete an entity row
    ///
    /// Does not cascade: relations and observations referencing the entity
    /// remain in place.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        self.delete_in(&mut conn, id).await
    }

    /// Transaction-scoped variant of [`delete`](Self::delete)
    pub async fn delete_in(&self, conn: &mut SqliteConnection, id: &str) -> Result<()> {
        let result = sqlx::query(self.statements.sql(stmt::ENTITY_DELETE)?)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::EntityNotFound(id.to_string()));
        }

        info!(entity_id = %id, "entity deleted");
        Ok(())
    }

    /// List all entities of a type, ordered by name
    pub async fn list_by_type(&self, entity_type: EntityType) -> Result<Vec<Entity>> {
        let rows: Vec<EntityRow> = sqlx::query_as(self.statements.sql(stmt::ENTITY_LIST_BY_TYPE)?)
            .bind(entity_type.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.into_entity()).collect()
    }

    /// Total number of entities
    pub async fn count(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(self.statements.sql(stmt::ENTITY_COUNT)?)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::ConstraintViolation(
            "entity name must not be empty".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_payload(what: &str, value: &serde_json::Value) -> Result<()> {
    if !value.is_object() {
        return Err(Error::ConstraintViolation(format!(
            "{what} must be a JSON object"
        )));
    }
    Ok(())
}

pub(crate) fn to_json_text(value: &serde_json::Value) -> Result<String> {
    serde_json::to_string(value).map_err(|e| Error::Parse(format!("unserializable payload: {e}")))
}

/// Database row for an entity
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EntityRow {
    pub id: String,
    pub entity_type: String,
    pub name: String,
    pub data: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

impl EntityRow {
    pub fn into_entity(self) -> Result<Entity> {
        let entity_type = EntityType::parse(&self.entity_type)
            .ok_or_else(|| Error::Parse(format!("invalid entity type: {}", self.entity_type)))?;
        let data = serde_json::from_str(&self.data)
            .map_err(|e| Error::Parse(format!("invalid entity data for {}: {e}", self.id)))?;

        Ok(Entity {
            id: self.id,
            entity_type,
            name: self.name,
            data,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        })
    }
}
