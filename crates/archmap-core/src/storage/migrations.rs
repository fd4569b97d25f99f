//! Database migrations
//!
//! Schema versions are applied forward-only on open. Each migration is a
//! named block of idempotent structural SQL (`CREATE ... IF NOT EXISTS`), so
//! a retry after a partial failure converges instead of erroring out. A
//! migration that still fails aborts startup with
//! [`Error::MigrationFailure`]; there is no partial-success continuation.

use crate::error::{Error, Result};
use sqlx::SqlitePool;

/// Current schema version
pub const CURRENT_VERSION: i32 = 2;

/// SQL for creating the migrations tracking table
const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        version INTEGER PRIMARY KEY NOT NULL,
        applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
"#;

/// Migration 1: Core graph tables
///
/// Relations and observations deliberately carry no foreign keys to
/// `entities`: endpoint existence is not checked on write, and deleting an
/// entity never cascades. Readers drop dangling references when they join.
const MIGRATION_V1: &str = r#"
    -- Graph nodes
    CREATE TABLE IF NOT EXISTS entities (
        id TEXT PRIMARY KEY NOT NULL,
        entity_type TEXT NOT NULL CHECK (entity_type IN (
            'store', 'component', 'workflow', 'phase', 'action', 'pattern'
        )),
        name TEXT NOT NULL CHECK (length(name) > 0),
        data TEXT NOT NULL DEFAULT '{}',
        created_at TIMESTAMP NOT NULL,
        updated_at TIMESTAMP NOT NULL,
        version INTEGER NOT NULL DEFAULT 1
    );

    CREATE INDEX IF NOT EXISTS idx_entities_type_name ON entities(entity_type, name);
    CREATE INDEX IF NOT EXISTS idx_entities_name ON entities(name);

    -- Directed edges; parallel duplicates are legal
    CREATE TABLE IF NOT EXISTS relations (
        id TEXT PRIMARY KEY NOT NULL,
        from_id TEXT NOT NULL,
        to_id TEXT NOT NULL,
        relation_type TEXT NOT NULL CHECK (length(relation_type) > 0),
        properties TEXT NOT NULL DEFAULT '{}',
        created_at TIMESTAMP NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_relations_from_id ON relations(from_id);
    CREATE INDEX IF NOT EXISTS idx_relations_to_id ON relations(to_id);
    CREATE INDEX IF NOT EXISTS idx_relations_type ON relations(relation_type);

    -- Free-text facts attached to entities
    CREATE TABLE IF NOT EXISTS observations (
        id TEXT PRIMARY KEY NOT NULL,
        entity_id TEXT NOT NULL,
        key TEXT NOT NULL CHECK (length(key) > 0),
        value TEXT NOT NULL,
        created_at TIMESTAMP NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_observations_entity_id ON observations(entity_id);
"#;

/// Migration 2: Full-text search over observation values
///
/// External-content FTS5 table kept in sync by triggers, so the index
/// updates as a side effect of every observation write; callers never touch
/// it directly. Observations are insert/delete only, so no UPDATE trigger is
/// needed.
const MIGRATION_V2: &str = r#"
    CREATE VIRTUAL TABLE IF NOT EXISTS observations_fts USING fts5(
        value,
        content='observations',
        content_rowid='rowid'
    );

    CREATE TRIGGER IF NOT EXISTS observations_ai AFTER INSERT ON observations BEGIN
        INSERT INTO observations_fts(rowid, value)
        VALUES (NEW.rowid, NEW.value);
    END;

    CREATE TRIGGER IF NOT EXISTS observations_ad AFTER DELETE ON observations BEGIN
        INSERT INTO observations_fts(observations_fts, rowid, value)
        VALUES ('delete', OLD.rowid, OLD.value);
    END;
"#;

/// Get the current schema version from the database
async fn get_current_version(pool: &SqlitePool) -> std::result::Result<i32, sqlx::Error> {
    sqlx::raw_sql(CREATE_MIGRATIONS_TABLE).execute(pool).await?;

    let row: Option<(i32,)> = sqlx::query_as("SELECT MAX(version) FROM _migrations")
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|(v,)| v).unwrap_or(0))
}

/// Record that a migration has been applied
async fn record_migration(pool: &SqlitePool, version: i32) -> std::result::Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO _migrations (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

async fn apply_pending(pool: &SqlitePool) -> std::result::Result<(), sqlx::Error> {
    let current_version = get_current_version(pool).await?;

    tracing::info!(
        current_version = current_version,
        target_version = CURRENT_VERSION,
        "Checking database migrations"
    );

    if current_version >= CURRENT_VERSION {
        tracing::debug!("Database is up to date");
        return Ok(());
    }

    if current_version < 1 {
        tracing::info!("Applying migration v1: Core graph tables");
        sqlx::raw_sql(MIGRATION_V1).execute(pool).await?;
        record_migration(pool, 1).await?;
    }

    if current_version < 2 {
        tracing::info!("Applying migration v2: Observation full-text index");
        sqlx::raw_sql(MIGRATION_V2).execute(pool).await?;
        record_migration(pool, 2).await?;
    }

    tracing::info!("Database migrations completed");
    Ok(())
}

/// Run all pending migrations
///
/// Any failure is fatal to startup and surfaces as
/// [`Error::MigrationFailure`] naming the underlying cause.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    apply_pending(pool)
        .await
        .map_err(|err| Error::MigrationFailure(err.to_string()))
}

/// Check if the database needs migrations
pub async fn needs_migration(pool: &SqlitePool) -> Result<bool> {
    let current_version = get_current_version(pool).await?;
    Ok(current_version < CURRENT_VERSION)
}

/// Get migration status information
pub async fn migration_status(pool: &SqlitePool) -> Result<MigrationStatus> {
    let current_version = get_current_version(pool).await?;
    Ok(MigrationStatus {
        current_version,
        target_version: CURRENT_VERSION,
        needs_migration: current_version < CURRENT_VERSION,
    })
}

/// Migration status information
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Current schema version in the database
    pub current_version: i32,
    /// Target schema version (latest)
    pub target_version: i32,
    /// Whether migrations need to be run
    pub needs_migration: bool,
}
