//! Top-level store handle
//!
//! [`GraphStore`] is the single explicit entry point to the knowledge graph:
//! constructed once at process start, passed by reference to collaborators,
//! closed on shutdown. There is no ambient global instance. It owns the
//! database plus the typed repositories and the query engine, and adds the
//! cross-cutting pieces: scoped transactions, the raw SQL escape hatch and
//! backup.

use crate::domain::SeverityPolicy;
use crate::error::{Error, Result};
use crate::graph::{EntityStore, ObservationStore, QueryEngine, RelationStore};
use crate::storage::{Database, DatabaseConfig, StatementRegistry};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, SqliteConnection, TypeInfo, ValueRef};
use std::path::{Path, PathBuf};
use tracing::info;

/// Store configuration
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Database location and pool settings
    pub database: DatabaseConfig,
    /// Policy mapping impact counts to severity tiers
    pub severity: SeverityPolicy,
}

impl StoreConfig {
    /// Config for a store at the given database path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            database: DatabaseConfig::with_path(path),
            ..Default::default()
        }
    }

    /// Config for an in-memory store (useful for testing)
    pub fn in_memory() -> Self {
        Self {
            database: DatabaseConfig::in_memory(),
            ..Default::default()
        }
    }

    /// Override the severity policy
    pub fn severity_policy(mut self, severity: SeverityPolicy) -> Self {
        self.severity = severity;
        self
    }
}

/// Handle to an open knowledge-graph store
#[derive(Debug, Clone)]
pub struct GraphStore {
    db: Database,
    entities: EntityStore,
    relations: RelationStore,
    observations: ObservationStore,
    query: QueryEngine,
}

impl GraphStore {
    /// Open (and migrate) the store described by `config`
    pub async fn open(config: StoreConfig) -> Result<Self> {
        let db = Database::new(config.database).await?;
        let pool = db.pool().clone();
        let statements = StatementRegistry::new();

        let store = Self {
            entities: EntityStore::new(pool.clone(), statements.clone()),
            relations: RelationStore::new(pool.clone(), statements.clone()),
            observations: ObservationStore::new(pool.clone(), statements.clone()),
            query: QueryEngine::new(pool, statements, config.severity),
            db,
        };

        info!(path = %store.db.path().display(), "knowledge graph store opened");
        Ok(store)
    }

    /// Open a store at the given database path with default settings
    pub async fn open_at(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open(StoreConfig::with_path(path)).await
    }

    /// Open an in-memory store (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        Self::open(StoreConfig::in_memory()).await
    }

    /// Entity repository
    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    /// Relation repository
    pub fn relations(&self) -> &RelationStore {
        &self.relations
    }

    /// Observation repository
    pub fn observations(&self) -> &ObservationStore {
        &self.observations
    }

    /// Graph query engine
    pub fn graph(&self) -> &QueryEngine {
        &self.query
    }

    /// Underlying database handle
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Run a unit of work inside one transaction
    ///
    /// Commits when the closure returns `Ok`, rolls back when it returns
    /// `Err`. If the future is dropped mid-flight the transaction guard
    /// rolls back on drop, so the boundary is released on every exit path.
    /// Use the repositories' `*_in` variants against the supplied
    /// connection:
    ///
    /// ```ignore
    /// let store = GraphStore::open_in_memory().await?;
    /// store
    ///     .transaction(async |conn| {
    ///         let entity = store.entities().create_in(conn, draft).await?;
    ///         store.observations().add_in(conn, &entity.id, "purpose", "…").await?;
    ///         Ok(entity)
    ///     })
    ///     .await?;
    /// ```
    pub async fn transaction<T, F>(&self, work: F) -> Result<T>
    where
        F: AsyncFnOnce(&mut SqliteConnection) -> Result<T>,
    {
        let mut tx = self.db.pool().begin().await?;
        match work(&mut *tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                tx.rollback().await?;
                Err(err)
            }
        }
    }

    /// Raw read escape hatch for ad hoc inspection
    ///
    /// Bypasses the typed operations: runs `sql` with positional JSON
    /// parameters and returns each row as a JSON object keyed by column
    /// name. Malformed or unsatisfiable SQL fails with
    /// [`Error::InvalidQuery`]. Tooling only — the store's own logic never
    /// goes through here.
    pub async fn query_raw(
        &self,
        sql: &str,
        params: &[serde_json::Value],
    ) -> Result<Vec<serde_json::Value>> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_json_param(query, param);
        }

        let rows = query
            .fetch_all(self.db.pool())
            .await
            .map_err(map_raw_error)?;

        rows.iter().map(row_to_json).collect()
    }

    /// Raw write escape hatch; returns the number of affected rows
    pub async fn execute_raw(&self, sql: &str, params: &[serde_json::Value]) -> Result<u64> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = bind_json_param(query, param);
        }

        let result = query
            .execute(self.db.pool())
            .await
            .map_err(map_raw_error)?;
        Ok(result.rows_affected())
    }

    /// Write a consistent point-in-time backup to `target`
    pub async fn backup(&self, target: &Path) -> Result<()> {
        self.db.backup(target).await
    }

    /// Close the store, releasing the connection pool
    pub async fn close(&self) {
        self.db.close().await;
    }
}

type SqliteQuery<'q> = sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>;

fn bind_json_param<'q>(query: SqliteQuery<'q>, value: &serde_json::Value) -> SqliteQuery<'q> {
    match value {
        serde_json::Value::Null => query.bind(None::<String>),
        serde_json::Value::Bool(b) => query.bind(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else {
                query.bind(n.as_f64().unwrap_or_default())
            }
        }
        serde_json::Value::String(s) => query.bind(s.clone()),
        // Arrays and objects pass through as their JSON text
        other => query.bind(other.to_string()),
    }
}

fn row_to_json(row: &SqliteRow) -> Result<serde_json::Value> {
    let mut object = serde_json::Map::new();
    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            serde_json::Value::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" => serde_json::Value::from(row.try_get::<i64, _>(index)?),
                "REAL" => serde_json::Value::from(row.try_get::<f64, _>(index)?),
                "BLOB" => serde_json::Value::Array(
                    row.try_get::<Vec<u8>, _>(index)?
                        .into_iter()
                        .map(serde_json::Value::from)
                        .collect(),
                ),
                _ => serde_json::Value::from(row.try_get::<String, _>(index)?),
            }
        };
        object.insert(column.name().to_string(), value);
    }
    Ok(serde_json::Value::Object(object))
}

/// Engine-level failures on the raw path are the caller's query, not ours.
fn map_raw_error(err: sqlx::Error) -> Error {
    match err {
        sqlx::Error::Database(db) => Error::InvalidQuery(db.message().to_string()),
        other => Error::DatabaseError(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntityType, NewEntity};

    #[tokio::test]
    async fn test_open_in_memory_and_accessors() {
        let store = GraphStore::open_in_memory().await.expect("open store");
        store.database().health_check().await.expect("healthy");
        assert_eq!(store.entities().count().await.unwrap(), 0);
        assert_eq!(store.relations().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_query_raw_returns_json_rows() {
        let store = GraphStore::open_in_memory().await.expect("open store");
        store
            .entities()
            .create(NewEntity::new(EntityType::Store, "UserStore"))
            .await
            .unwrap();

        let rows = store
            .query_raw(
                "SELECT name, version FROM entities WHERE entity_type = ?",
                &[serde_json::json!("store")],
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], "UserStore");
        assert_eq!(rows[0]["version"], 1);
    }

    #[tokio::test]
    async fn test_query_raw_rejects_malformed_sql() {
        let store = GraphStore::open_in_memory().await.expect("open store");
        let err = store.query_raw("SELEC nope", &[]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)), "got {err:?}");

        let err = store
            .query_raw("SELECT * FROM no_such_table", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_execute_raw_reports_affected_rows() {
        let store = GraphStore::open_in_memory().await.expect("open store");
        store
            .entities()
            .create(NewEntity::new(EntityType::Phase, "One"))
            .await
            .unwrap();
        store
            .entities()
            .create(NewEntity::new(EntityType::Phase, "Two"))
            .await
            .unwrap();

        let affected = store
            .execute_raw("DELETE FROM entities WHERE entity_type = ?", &[serde_json::json!("phase")])
            .await
            .unwrap();
        assert_eq!(affected, 2);
    }
}
