//! Named statement registry
//!
//! Every typed operation resolves its SQL here by name. The registry caches
//! query text only — never results — and the driver prepares each statement
//! once per connection and reuses the plan on subsequent executions.
//! Requesting a name that was never registered is a programmer error and
//! fails with [`Error::StatementNotFound`].

use crate::error::{Error, Result};
use std::collections::HashMap;

/// Statement names resolved through the registry.
pub mod stmt {
    pub const ENTITY_INSERT: &str = "entity.insert";
    pub const ENTITY_UPDATE: &str = "entity.update";
    pub const ENTITY_GET: &str = "entity.get";
    pub const ENTITY_GET_BY_NAME: &str = "entity.get_by_name";
    pub const ENTITY_GET_BY_NAME_ANY: &str = "entity.get_by_name_any";
    pub const ENTITY_DELETE: &str = "entity.delete";
    pub const ENTITY_LIST_BY_TYPE: &str = "entity.list_by_type";
    pub const ENTITY_COUNT: &str = "entity.count";

    pub const RELATION_INSERT: &str = "relation.insert";
    pub const RELATION_DELETE: &str = "relation.delete";
    pub const RELATION_FOR_ENTITY: &str = "relation.for_entity";
    pub const RELATION_COUNT: &str = "relation.count";

    pub const OBSERVATION_INSERT: &str = "observation.insert";
    pub const OBSERVATION_FOR_ENTITY: &str = "observation.for_entity";
    pub const OBSERVATION_DELETE_FOR_ENTITY: &str = "observation.delete_for_entity";

    pub const SEARCH_OBSERVATIONS: &str = "search.observations";
    pub const TRACE_WORKFLOW: &str = "trace.workflow";
    pub const IMPACT_DIRECT: &str = "impact.direct";
    pub const IMPACT_INDIRECT: &str = "impact.indirect";
    pub const MUTATIONS_FOR_STORE: &str = "mutations.for_store";
    pub const SIMILAR_ROOT_TYPES: &str = "similar.root_types";
    pub const SIMILAR_CANDIDATE_TYPES: &str = "similar.candidate_types";
}

const ENTITY_COLUMNS: &str = "id, entity_type, name, data, created_at, updated_at, version";

const ENTITY_INSERT_SQL: &str = "\
    INSERT INTO entities (id, entity_type, name, data, created_at, updated_at, version) \
    VALUES (?, ?, ?, ?, ?, ?, 1)";

// COALESCE keeps omitted fields; every update bumps version and updated_at.
const ENTITY_UPDATE_SQL: &str = "\
    UPDATE entities \
    SET name = COALESCE(?, name), \
        data = COALESCE(?, data), \
        version = version + 1, \
        updated_at = ? \
    WHERE id = ?";

const ENTITY_GET_SQL: &str = "\
    SELECT id, entity_type, name, data, created_at, updated_at, version \
    FROM entities WHERE id = ?";

// Duplicates are legal; first match in insertion order wins.
const ENTITY_GET_BY_NAME_SQL: &str = "\
    SELECT id, entity_type, name, data, created_at, updated_at, version \
    FROM entities WHERE entity_type = ? AND name = ? \
    ORDER BY rowid LIMIT 1";

// Name lookup across all types, used by query-engine roots where the caller
// supplies only a name.
const ENTITY_GET_BY_NAME_ANY_SQL: &str = "\
    SELECT id, entity_type, name, data, created_at, updated_at, version \
    FROM entities WHERE name = ? \
    ORDER BY rowid LIMIT 1";

const ENTITY_DELETE_SQL: &str = "DELETE FROM entities WHERE id = ?";

const ENTITY_LIST_BY_TYPE_SQL: &str = "\
    SELECT id, entity_type, name, data, created_at, updated_at, version \
    FROM entities WHERE entity_type = ? \
    ORDER BY name, rowid";

const ENTITY_COUNT_SQL: &str = "SELECT COUNT(*) FROM entities";

const RELATION_INSERT_SQL: &str = "\
    INSERT INTO relations (id, from_id, to_id, relation_type, properties, created_at) \
    VALUES (?, ?, ?, ?, ?, ?)";

const RELATION_DELETE_SQL: &str = "DELETE FROM relations WHERE id = ?";

// Both directions in one result set; the caller tells them apart by
// comparing from_id/to_id against the queried id.
const RELATION_FOR_ENTITY_SQL: &str = "\
    SELECT id, from_id, to_id, relation_type, properties, created_at \
    FROM relations WHERE from_id = ? OR to_id = ? \
    ORDER BY rowid";

const RELATION_COUNT_SQL: &str = "SELECT COUNT(*) FROM relations";

const OBSERVATION_INSERT_SQL: &str = "\
    INSERT INTO observations (id, entity_id, key, value, created_at) \
    VALUES (?, ?, ?, ?, ?)";

const OBSERVATION_FOR_ENTITY_SQL: &str = "\
    SELECT id, entity_id, key, value, created_at \
    FROM observations WHERE entity_id = ? \
    ORDER BY rowid";

const OBSERVATION_DELETE_FOR_ENTITY_SQL: &str = "DELETE FROM observations WHERE entity_id = ?";

// bm25() is smaller for better matches, so ascending order puts the most
// relevant hit first; rowid breaks ties in insertion order.
const SEARCH_OBSERVATIONS_SQL: &str = "\
    SELECT o.id AS observation_id, o.entity_id, o.key, \
           e.name AS entity_name, e.entity_type, \
           snippet(observations_fts, 0, '[', ']', '…', 12) AS snippet, \
           bm25(observations_fts) AS score \
    FROM observations_fts \
    JOIN observations o ON o.rowid = observations_fts.rowid \
    JOIN entities e ON e.id = o.entity_id \
    WHERE observations_fts MATCH ? \
    ORDER BY bm25(observations_fts), o.rowid \
    LIMIT ?";

// Breadth-first expansion from the named workflow. The accumulated id path
// doubles as the cycle guard; the depth bound guarantees termination even if
// the guard were defeated. Dangling edges drop out at the entities join.
const TRACE_WORKFLOW_SQL: &str = "\
    WITH RECURSIVE trace(entity_id, depth, path) AS ( \
        SELECT id, 0, id FROM entities \
        WHERE id = ( \
            SELECT id FROM entities \
            WHERE entity_type = 'workflow' AND name = ? \
            ORDER BY rowid LIMIT 1 \
        ) \
        UNION ALL \
        SELECT r.to_id, t.depth + 1, t.path || ' -> ' || r.to_id \
        FROM trace t \
        JOIN relations r ON r.from_id = t.entity_id \
        WHERE t.depth < ? \
          AND r.relation_type IN ('HAS_PHASE', 'TRIGGERS', 'MUTATES') \
          AND t.path NOT LIKE '%' || r.to_id || '%' \
    ) \
    SELECT t.entity_id, t.depth, t.path, e.name, e.entity_type \
    FROM trace t \
    JOIN entities e ON e.id = t.entity_id \
    ORDER BY t.depth ASC, t.path ASC";

const IMPACT_DIRECT_SQL: &str = "\
    SELECT e.name, e.entity_type, r.relation_type \
    FROM relations r \
    JOIN entities e ON e.id = r.to_id \
    WHERE r.from_id = (SELECT id FROM entities WHERE name = ? ORDER BY rowid LIMIT 1) \
    ORDER BY e.name, r.relation_type";

// Entities first reached at hop 2 or deeper; hop-1 entities belong to the
// direct set. MIN over all routes gives the level each was first reached at.
const IMPACT_INDIRECT_SQL: &str = "\
    WITH RECURSIVE reach(entity_id, depth, path) AS ( \
        SELECT id, 0, id FROM entities \
        WHERE id = (SELECT id FROM entities WHERE name = ? ORDER BY rowid LIMIT 1) \
        UNION ALL \
        SELECT r.to_id, rc.depth + 1, rc.path || ' -> ' || r.to_id \
        FROM reach rc \
        JOIN relations r ON r.from_id = rc.entity_id \
        WHERE rc.depth < ? \
          AND rc.path NOT LIKE '%' || r.to_id || '%' \
    ) \
    SELECT e.name, e.entity_type, MIN(rc.depth) AS level \
    FROM reach rc \
    JOIN entities e ON e.id = rc.entity_id \
    WHERE rc.depth >= 1 \
    GROUP BY e.name, e.entity_type \
    HAVING MIN(rc.depth) >= 2 \
    ORDER BY level ASC, e.name ASC";

const MUTATIONS_FOR_STORE_SQL: &str = "\
    SELECT src.id AS source_id, src.name AS source_name, src.entity_type AS source_type, \
           r.properties, r.created_at \
    FROM relations r \
    JOIN entities tgt ON tgt.id = r.to_id \
    JOIN entities src ON src.id = r.from_id \
    WHERE r.relation_type = 'MUTATES' \
      AND tgt.entity_type = 'store' \
      AND tgt.name = ? \
    ORDER BY src.name, r.rowid";

const SIMILAR_ROOT_TYPES_SQL: &str = "\
    SELECT DISTINCT relation_type FROM relations WHERE from_id = ? OR to_id = ?";

const SIMILAR_CANDIDATE_TYPES_SQL: &str = "\
    SELECT DISTINCT e.id, e.name, e.entity_type, r.relation_type \
    FROM entities e \
    JOIN relations r ON r.from_id = e.id OR r.to_id = e.id \
    WHERE e.id <> ?";

/// Registry of named, parameterized query templates
#[derive(Debug, Clone)]
pub struct StatementRegistry {
    statements: HashMap<&'static str, &'static str>,
}

impl StatementRegistry {
    /// Build the registry with every named statement
    pub fn new() -> Self {
        let mut statements = HashMap::new();

        statements.insert(stmt::ENTITY_INSERT, ENTITY_INSERT_SQL);
        statements.insert(stmt::ENTITY_UPDATE, ENTITY_UPDATE_SQL);
        statements.insert(stmt::ENTITY_GET, ENTITY_GET_SQL);
        statements.insert(stmt::ENTITY_GET_BY_NAME, ENTITY_GET_BY_NAME_SQL);
        statements.insert(stmt::ENTITY_GET_BY_NAME_ANY, ENTITY_GET_BY_NAME_ANY_SQL);
        statements.insert(stmt::ENTITY_DELETE, ENTITY_DELETE_SQL);
        statements.insert(stmt::ENTITY_LIST_BY_TYPE, ENTITY_LIST_BY_TYPE_SQL);
        statements.insert(stmt::ENTITY_COUNT, ENTITY_COUNT_SQL);

        statements.insert(stmt::RELATION_INSERT, RELATION_INSERT_SQL);
        statements.insert(stmt::RELATION_DELETE, RELATION_DELETE_SQL);
        statements.insert(stmt::RELATION_FOR_ENTITY, RELATION_FOR_ENTITY_SQL);
        statements.insert(stmt::RELATION_COUNT, RELATION_COUNT_SQL);

        statements.insert(stmt::OBSERVATION_INSERT, OBSERVATION_INSERT_SQL);
        statements.insert(stmt::OBSERVATION_FOR_ENTITY, OBSERVATION_FOR_ENTITY_SQL);
        statements.insert(
            stmt::OBSERVATION_DELETE_FOR_ENTITY,
            OBSERVATION_DELETE_FOR_ENTITY_SQL,
        );

        statements.insert(stmt::SEARCH_OBSERVATIONS, SEARCH_OBSERVATIONS_SQL);
        statements.insert(stmt::TRACE_WORKFLOW, TRACE_WORKFLOW_SQL);
        statements.insert(stmt::IMPACT_DIRECT, IMPACT_DIRECT_SQL);
        statements.insert(stmt::IMPACT_INDIRECT, IMPACT_INDIRECT_SQL);
        statements.insert(stmt::MUTATIONS_FOR_STORE, MUTATIONS_FOR_STORE_SQL);
        statements.insert(stmt::SIMILAR_ROOT_TYPES, SIMILAR_ROOT_TYPES_SQL);
        statements.insert(stmt::SIMILAR_CANDIDATE_TYPES, SIMILAR_CANDIDATE_TYPES_SQL);

        Self { statements }
    }

    /// Resolve a statement by name
    pub fn sql(&self, name: &str) -> Result<&'static str> {
        self.statements
            .get(name)
            .copied()
            .ok_or_else(|| Error::StatementNotFound(name.to_string()))
    }

    /// Names of all registered statements
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.statements.keys().copied()
    }

    /// Number of registered statements
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Whether the registry is empty (it never is after `new`)
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

impl Default for StatementRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_statement_resolves() {
        let registry = StatementRegistry::new();
        let sql = registry.sql(stmt::ENTITY_INSERT).unwrap();
        assert!(sql.contains("INSERT INTO entities"));
    }

    #[test]
    fn test_unknown_statement_fails_with_name() {
        let registry = StatementRegistry::new();
        let err = registry.sql("entity.upsert").unwrap_err();
        match err {
            Error::StatementNotFound(name) => assert_eq!(name, "entity.upsert"),
            other => panic!("expected StatementNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_every_name_constant_is_registered() {
        let registry = StatementRegistry::new();
        for name in [
            stmt::ENTITY_INSERT,
            stmt::ENTITY_UPDATE,
            stmt::ENTITY_GET,
            stmt::ENTITY_GET_BY_NAME,
            stmt::ENTITY_GET_BY_NAME_ANY,
            stmt::ENTITY_DELETE,
            stmt::ENTITY_LIST_BY_TYPE,
            stmt::ENTITY_COUNT,
            stmt::RELATION_INSERT,
            stmt::RELATION_DELETE,
            stmt::RELATION_FOR_ENTITY,
            stmt::RELATION_COUNT,
            stmt::OBSERVATION_INSERT,
            stmt::OBSERVATION_FOR_ENTITY,
            stmt::OBSERVATION_DELETE_FOR_ENTITY,
            stmt::SEARCH_OBSERVATIONS,
            stmt::TRACE_WORKFLOW,
            stmt::IMPACT_DIRECT,
            stmt::IMPACT_INDIRECT,
            stmt::MUTATIONS_FOR_STORE,
            stmt::SIMILAR_ROOT_TYPES,
            stmt::SIMILAR_CANDIDATE_TYPES,
        ] {
            assert!(registry.sql(name).is_ok(), "statement {name} missing");
        }
        assert_eq!(registry.len(), 22);
    }
}
