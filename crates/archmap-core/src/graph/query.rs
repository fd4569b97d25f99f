//! Graph query engine
//!
//! Read-side operations that compose multi-hop traversals and full-text
//! search over the same tables the repositories write:
//!
//! - full-text search over observation values (bm25-ranked, with snippets)
//! - workflow tracing (breadth-first, bounded to 10 hops)
//! - impact analysis (direct one-hop plus indirect expansion to 3 hops)
//! - state-mutation lookup for a named store
//! - similarity ranking by shared relation types
//! - pattern-based text generation
//!
//! Traversal roots that do not exist yield empty results, never errors.
//! Dangling edges (endpoint deleted after the edge was written) drop out at
//! the joins against the entities table.

use crate::domain::{
    render_template, unresolved_placeholders, DirectImpact, Entity, EntityType, GenerateRequest,
    GeneratedOutput, ImpactReport, IndirectImpact, SearchResult, SeverityPolicy, SimilarEntity,
    StateMutation, TraceStep, WorkflowTrace, MAX_IMPACT_DEPTH, MAX_TRACE_DEPTH, TEMPLATE_DATA_KEY,
};
use crate::error::{Error, Result};
use crate::graph::entities::EntityRow;
use crate::storage::{stmt, StatementRegistry};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};

/// Score bonus applied when a similarity candidate has the same entity type
/// as the reference entity.
const SAME_TYPE_BONUS: f64 = 0.5;

/// Read-side engine over the graph tables
#[derive(Debug, Clone)]
pub struct QueryEngine {
    pool: SqlitePool,
    statements: StatementRegistry,
    severity: SeverityPolicy,
}

impl QueryEngine {
    /// Create an engine over the given pool
    pub fn new(pool: SqlitePool, statements: StatementRegistry, severity: SeverityPolicy) -> Self {
        Self {
            pool,
            statements,
            severity,
        }
    }

    /// The severity policy used by [`analyze_impact`](Self::analyze_impact)
    pub fn severity_policy(&self) -> SeverityPolicy {
        self.severity
    }

    /// Full-text search over observation values
    ///
    /// Returns up to `limit` hits ranked best-first, each with a highlighted
    /// snippet around the match. Malformed match syntax fails with
    /// [`Error::InvalidQuery`].
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let rows: Vec<SearchRow> = sqlx::query_as(self.statements.sql(stmt::SEARCH_OBSERVATIONS)?)
            .bind(query)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(map_match_error)?;

        rows.into_iter().map(|r| r.into_result()).collect()
    }

    /// Trace a workflow's phase graph breadth-first
    ///
    /// Follows outgoing `HAS_PHASE`/`TRIGGERS`/`MUTATES` edges from the
    /// `Workflow` entity with the given name, to at most
    /// [`MAX_TRACE_DEPTH`] hops so cyclic phase graphs terminate. Steps are
    /// ordered by `(depth, path)`. An unknown workflow yields an empty trace.
    pub async fn trace_workflow(&self, workflow_name: &str) -> Result<WorkflowTrace> {
        let rows: Vec<TraceRow> = sqlx::query_as(self.statements.sql(stmt::TRACE_WORKFLOW)?)
            .bind(workflow_name)
            .bind(MAX_TRACE_DEPTH)
            .fetch_all(&self.pool)
            .await?;

        let steps = rows
            .into_iter()
            .map(|r| r.into_step())
            .collect::<Result<Vec<_>>>()?;

        Ok(WorkflowTrace {
            workflow: workflow_name.to_string(),
            steps,
        })
    }

    /// Compute direct and indirect impact of changing the named entity
    ///
    /// Direct impact is every one-hop outgoing edge; indirect impact is the
    /// recursive outgoing expansion bounded to [`MAX_IMPACT_DEPTH`] hops,
    /// deduplicated by `(name, type)` at the level each entity was first
    /// reached. Severity is derived from the total impacted count by the
    /// configured policy. An unknown entity yields an empty report.
    pub async fn analyze_impact(&self, entity_name: &str) -> Result<ImpactReport> {
        let direct_rows: Vec<DirectRow> = sqlx::query_as(self.statements.sql(stmt::IMPACT_DIRECT)?)
            .bind(entity_name)
            .fetch_all(&self.pool)
            .await?;

        let indirect_rows: Vec<IndirectRow> =
            sqlx::query_as(self.statements.sql(stmt::IMPACT_INDIRECT)?)
                .bind(entity_name)
                .bind(MAX_IMPACT_DEPTH)
                .fetch_all(&self.pool)
                .await?;

        let direct = direct_rows
            .into_iter()
            .map(|r| r.into_impact())
            .collect::<Result<Vec<_>>>()?;
        let indirect = indirect_rows
            .into_iter()
            .map(|r| r.into_impact())
            .collect::<Result<Vec<_>>>()?;

        let severity = self.severity.classify(direct.len() + indirect.len());

        Ok(ImpactReport {
            entity: entity_name.to_string(),
            direct,
            indirect,
            severity,
        })
    }

    /// Exact-match lookup of recorded state mutations for a named store
    ///
    /// Every incoming `MUTATES` edge into the `Store` entity with the given
    /// name, joined to its source entity. Missing store or no edges yields
    /// an empty list.
    pub async fn find_state_mutations(&self, store_name: &str) -> Result<Vec<StateMutation>> {
        let rows: Vec<MutationRow> = sqlx::query_as(self.statements.sql(stmt::MUTATIONS_FOR_STORE)?)
            .bind(store_name)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|r| r.into_mutation(store_name))
            .collect()
    }

    /// Rank other entities by similarity to the named one
    ///
    /// Similarity is the number of relation types the candidate shares with
    /// the reference entity, with a bonus for matching entity type. This is
    /// an approximate ranking signal, not an equivalence test. An unknown
    /// reference yields an empty list.
    pub async fn find_similar_patterns(
        &self,
        entity_name: &str,
        limit: usize,
    ) -> Result<Vec<SimilarEntity>> {
        let Some(root) = self.entity_by_name(entity_name).await? else {
            return Ok(Vec::new());
        };

        let root_types: HashSet<String> =
            sqlx::query_as::<_, (String,)>(self.statements.sql(stmt::SIMILAR_ROOT_TYPES)?)
                .bind(&root.id)
                .bind(&root.id)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .map(|(t,)| t)
                .collect();

        if root_types.is_empty() {
            return Ok(Vec::new());
        }

        let candidate_rows: Vec<CandidateRow> =
            sqlx::query_as(self.statements.sql(stmt::SIMILAR_CANDIDATE_TYPES)?)
                .bind(&root.id)
                .fetch_all(&self.pool)
                .await?;

        // Fold (entity, relation_type) pairs into per-candidate type sets,
        // then score the overlap in memory.
        let mut candidates: HashMap<String, Candidate> = HashMap::new();
        for row in candidate_rows {
            let entity_type = EntityType::parse(&row.entity_type)
                .ok_or_else(|| Error::Parse(format!("invalid entity type: {}", row.entity_type)))?;
            candidates
                .entry(row.id)
                .or_insert_with(|| Candidate {
                    name: row.name,
                    entity_type,
                    relation_types: HashSet::new(),
                })
                .relation_types
                .insert(row.relation_type);
        }

        let mut scored: Vec<SimilarEntity> = candidates
            .into_iter()
            .filter_map(|(id, candidate)| {
                let shared = candidate.relation_types.intersection(&root_types).count();
                if shared == 0 {
                    return None;
                }
                let mut score = shared as f64;
                if candidate.entity_type == root.entity_type {
                    score += SAME_TYPE_BONUS;
                }
                Some(SimilarEntity {
                    entity_id: id,
                    name: candidate.name,
                    entity_type: candidate.entity_type,
                    shared_relation_types: shared as u32,
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        scored.truncate(limit);
        Ok(scored)
    }

    /// Render a stored `Pattern` entity's template with the given variables
    ///
    /// Every `{{name}}` placeholder with a matching variable is substituted;
    /// the rest stay verbatim (templates may be filled in stages). The
    /// pattern entity must exist and carry a string under the `"template"`
    /// data key.
    pub async fn generate_from_pattern(&self, request: GenerateRequest) -> Result<GeneratedOutput> {
        let row: Option<EntityRow> = sqlx::query_as(self.statements.sql(stmt::ENTITY_GET_BY_NAME)?)
            .bind(EntityType::Pattern.as_str())
            .bind(&request.pattern_name)
            .fetch_optional(&self.pool)
            .await?;

        let pattern = row
            .map(|r| r.into_entity())
            .transpose()?
            .ok_or_else(|| Error::EntityNotFound(request.pattern_name.clone()))?;

        let template = pattern
            .data
            .get(TEMPLATE_DATA_KEY)
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                Error::Parse(format!(
                    "pattern '{}' has no string '{}' field",
                    pattern.name, TEMPLATE_DATA_KEY
                ))
            })?;

        let content = render_template(template, &request.variables);
        let unresolved = unresolved_placeholders(&content);

        Ok(GeneratedOutput {
            pattern: pattern.name,
            content,
            unresolved,
        })
    }

    async fn entity_by_name(&self, name: &str) -> Result<Option<Entity>> {
        let row: Option<EntityRow> =
            sqlx::query_as(self.statements.sql(stmt::ENTITY_GET_BY_NAME_ANY)?)
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        row.map(|r| r.into_entity()).transpose()
    }
}

struct Candidate {
    name: String,
    entity_type: EntityType,
    relation_types: HashSet<String>,
}

/// Classify driver errors from MATCH queries: full-text syntax problems are
/// the caller's malformed query, everything else is a database failure.
fn map_match_error(err: sqlx::Error) -> Error {
    match &err {
        sqlx::Error::Database(db) => {
            let message = db.message();
            if message.contains("fts5") || message.contains("syntax error") {
                Error::InvalidQuery(message.to_string())
            } else {
                Error::DatabaseError(err)
            }
        }
        _ => Error::DatabaseError(err),
    }
}

// ========== Database Row Types ==========

#[derive(Debug, sqlx::FromRow)]
struct SearchRow {
    observation_id: String,
    entity_id: String,
    key: String,
    entity_name: String,
    entity_type: String,
    snippet: String,
    score: f64,
}

impl SearchRow {
    fn into_result(self) -> Result<SearchResult> {
        let entity_type = EntityType::parse(&self.entity_type)
            .ok_or_else(|| Error::Parse(format!("invalid entity type: {}", self.entity_type)))?;

        Ok(SearchResult {
            entity_id: self.entity_id,
            entity_name: self.entity_name,
            entity_type,
            observation_id: self.observation_id,
            key: self.key,
            snippet: self.snippet,
            // bm25 scores are negative with smaller meaning better; report
            // the magnitude so higher reads as more relevant.
            score: self.score.abs(),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TraceRow {
    entity_id: String,
    depth: i64,
    path: String,
    name: String,
    entity_type: String,
}

impl TraceRow {
    fn into_step(self) -> Result<TraceStep> {
        let entity_type = EntityType::parse(&self.entity_type)
            .ok_or_else(|| Error::Parse(format!("invalid entity type: {}", self.entity_type)))?;

        Ok(TraceStep {
            entity_id: self.entity_id,
            name: self.name,
            entity_type,
            depth: self.depth,
            path: self.path,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DirectRow {
    name: String,
    entity_type: String,
    relation_type: String,
}

impl DirectRow {
    fn into_impact(self) -> Result<DirectImpact> {
        let entity_type = EntityType::parse(&self.entity_type)
            .ok_or_else(|| Error::Parse(format!("invalid entity type: {}", self.entity_type)))?;

        Ok(DirectImpact {
            name: self.name,
            entity_type,
            relation_type: self.relation_type,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct IndirectRow {
    name: String,
    entity_type: String,
    level: i64,
}

impl IndirectRow {
    fn into_impact(self) -> Result<IndirectImpact> {
        let entity_type = EntityType::parse(&self.entity_type)
            .ok_or_else(|| Error::Parse(format!("invalid entity type: {}", self.entity_type)))?;

        Ok(IndirectImpact {
            name: self.name,
            entity_type,
            level: self.level,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MutationRow {
    source_id: String,
    source_name: String,
    source_type: String,
    properties: String,
    created_at: DateTime<Utc>,
}

impl MutationRow {
    fn into_mutation(self, store: &str) -> Result<StateMutation> {
        let source_type = EntityType::parse(&self.source_type)
            .ok_or_else(|| Error::Parse(format!("invalid entity type: {}", self.source_type)))?;
        let properties = serde_json::from_str(&self.properties)
            .map_err(|e| Error::Parse(format!("invalid relation properties: {e}")))?;

        Ok(StateMutation {
            store: store.to_string(),
            source_id: self.source_id,
            source_name: self.source_name,
            source_type,
            properties,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    id: String,
    name: String,
    entity_type: String,
    relation_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{relation_types, NewEntity, NewRelation};
    use crate::graph::{EntityStore, ObservationStore, RelationStore};
    use crate::storage::Database;

    struct Fixture {
        entities: EntityStore,
        relations: RelationStore,
        observations: ObservationStore,
        query: QueryEngine,
    }

    async fn create_fixture() -> Fixture {
        let db = Database::in_memory().await.expect("open test database");
        let pool = db.pool().clone();
        let statements = StatementRegistry::new();
        Fixture {
            entities: EntityStore::new(pool.clone(), statements.clone()),
            relations: RelationStore::new(pool.clone(), statements.clone()),
            observations: ObservationStore::new(pool.clone(), statements.clone()),
            query: QueryEngine::new(pool, statements, SeverityPolicy::default()),
        }
    }

    async fn entity(fx: &Fixture, entity_type: EntityType, name: &str) -> Entity {
        fx.entities
            .create(NewEntity::new(entity_type, name))
            .await
            .expect("create entity")
    }

    async fn relate(fx: &Fixture, from: &Entity, to: &Entity, relation_type: &str) {
        fx.relations
            .create(NewRelation::new(&from.id, &to.id, relation_type))
            .await
            .expect("create relation");
    }

    #[tokio::test]
    async fn test_search_finds_observation_with_snippet() {
        let fx = create_fixture().await;
        let store = entity(&fx, EntityType::Store, "UserStore").await;
        fx.observations
            .add(&store.id, "purpose", "handles user authentication and session state")
            .await
            .unwrap();

        let results = fx.query.search("authentication", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entity_name, "UserStore");
        assert!(!results[0].snippet.is_empty());
        assert!(results[0].snippet.contains("[authentication]"));
        assert!(results[0].score >= 0.0);
    }

    #[tokio::test]
    async fn test_search_without_matches_is_empty() {
        let fx = create_fixture().await;
        let results = fx.query.search("nonexistent", 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_respects_limit_and_insertion_order_on_ties() {
        let fx = create_fixture().await;
        let a = entity(&fx, EntityType::Component, "First").await;
        let b = entity(&fx, EntityType::Component, "Second").await;
        // Identical values rank identically, so insertion order decides.
        fx.observations.add(&a.id, "note", "shared token").await.unwrap();
        fx.observations.add(&b.id, "note", "shared token").await.unwrap();

        let results = fx.query.search("token", 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].entity_name, "First");
        assert_eq!(results[1].entity_name, "Second");

        let limited = fx.query.search("token", 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_search_rejects_malformed_match_syntax() {
        let fx = create_fixture().await;
        let err = fx.query.search("\"unbalanced", 10).await.unwrap_err();
        assert!(matches!(err, Error::InvalidQuery(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_trace_workflow_missing_root_is_empty() {
        let fx = create_fixture().await;
        let trace = fx.query.trace_workflow("NoSuchWorkflow").await.unwrap();
        assert!(trace.is_empty());
    }

    #[tokio::test]
    async fn test_trace_workflow_orders_by_depth_then_path() {
        let fx = create_fixture().await;
        let workflow = entity(&fx, EntityType::Workflow, "Login").await;
        let validate = entity(&fx, EntityType::Phase, "Validate").await;
        let submit = entity(&fx, EntityType::Phase, "Submit").await;
        let store = entity(&fx, EntityType::Store, "SessionStore").await;

        relate(&fx, &workflow, &validate, relation_types::HAS_PHASE).await;
        relate(&fx, &workflow, &submit, relation_types::HAS_PHASE).await;
        relate(&fx, &submit, &store, relation_types::MUTATES).await;

        let trace = fx.query.trace_workflow("Login").await.unwrap();
        assert_eq!(trace.steps.len(), 4);
        assert_eq!(trace.steps[0].entity_id, workflow.id);
        assert_eq!(trace.steps[0].depth, 0);
        // Depth 1 entries sort by path, depth 2 comes last.
        assert!(trace.steps[1].depth == 1 && trace.steps[2].depth == 1);
        assert!(trace.steps[1].path <= trace.steps[2].path);
        assert_eq!(trace.steps[3].depth, 2);
        assert_eq!(trace.steps[3].entity_id, store.id);
        assert!(trace.steps[3].path.contains(" -> "));
    }

    #[tokio::test]
    async fn test_trace_workflow_terminates_on_cycles() {
        let fx = create_fixture().await;
        let workflow = entity(&fx, EntityType::Workflow, "Cyclic").await;
        let a = entity(&fx, EntityType::Phase, "A").await;
        let b = entity(&fx, EntityType::Phase, "B").await;

        relate(&fx, &workflow, &a, relation_types::HAS_PHASE).await;
        relate(&fx, &a, &b, relation_types::TRIGGERS).await;
        relate(&fx, &b, &a, relation_types::TRIGGERS).await;

        let trace = fx.query.trace_workflow("Cyclic").await.unwrap();
        assert!(!trace.is_empty());
        assert!(trace.max_depth() <= MAX_TRACE_DEPTH);
    }

    #[tokio::test]
    async fn test_trace_workflow_depth_is_capped() {
        let fx = create_fixture().await;
        let workflow = entity(&fx, EntityType::Workflow, "Deep").await;

        // A chain two hops longer than the bound.
        let mut previous = workflow.clone();
        for index in 0..(MAX_TRACE_DEPTH + 2) {
            let phase = entity(&fx, EntityType::Phase, &format!("Phase{index}")).await;
            relate(&fx, &previous, &phase, relation_types::TRIGGERS).await;
            previous = phase;
        }

        let trace = fx.query.trace_workflow("Deep").await.unwrap();
        assert_eq!(trace.max_depth(), MAX_TRACE_DEPTH);
        assert!(trace.steps.iter().all(|s| s.depth <= MAX_TRACE_DEPTH));
    }

    #[tokio::test]
    async fn test_trace_skips_dangling_edges() {
        let fx = create_fixture().await;
        let workflow = entity(&fx, EntityType::Workflow, "Dangling").await;
        let phase = entity(&fx, EntityType::Phase, "Real").await;
        relate(&fx, &workflow, &phase, relation_types::HAS_PHASE).await;
        // Edge into a deleted entity: tolerated, silently dropped.
        fx.relations
            .create(NewRelation::new(&workflow.id, "gone", relation_types::HAS_PHASE))
            .await
            .unwrap();

        let trace = fx.query.trace_workflow("Dangling").await.unwrap();
        assert_eq!(trace.steps.len(), 2);
    }

    #[tokio::test]
    async fn test_analyze_impact_missing_root_is_empty_and_low() {
        let fx = create_fixture().await;
        let report = fx.query.analyze_impact("Unknown").await.unwrap();
        assert!(report.direct.is_empty());
        assert!(report.indirect.is_empty());
        assert_eq!(report.severity, crate::domain::Severity::Low);
    }

    #[tokio::test]
    async fn test_analyze_impact_levels_and_depth_bound() {
        let fx = create_fixture().await;
        // a -> b -> c -> d -> e: d is 3 hops out, e is beyond the bound.
        let a = entity(&fx, EntityType::Store, "A").await;
        let b = entity(&fx, EntityType::Component, "B").await;
        let c = entity(&fx, EntityType::Component, "C").await;
        let d = entity(&fx, EntityType::Component, "D").await;
        let e = entity(&fx, EntityType::Component, "E").await;
        relate(&fx, &a, &b, relation_types::USES).await;
        relate(&fx, &b, &c, relation_types::USES).await;
        relate(&fx, &c, &d, relation_types::USES).await;
        relate(&fx, &d, &e, relation_types::USES).await;

        let report = fx.query.analyze_impact("A").await.unwrap();
        assert_eq!(report.direct.len(), 1);
        assert_eq!(report.direct[0].name, "B");
        assert_eq!(report.direct[0].relation_type, relation_types::USES);

        let indirect_names: Vec<&str> = report.indirect.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(indirect_names, vec!["C", "D"]);
        assert_eq!(report.indirect[0].level, 2);
        assert_eq!(report.indirect[1].level, 3);
        assert!(report.indirect.iter().all(|i| i.level <= MAX_IMPACT_DEPTH));
    }

    #[tokio::test]
    async fn test_analyze_impact_dedups_by_name_and_type() {
        let fx = create_fixture().await;
        // Diamond: shared is reachable at depth 2 through both arms.
        let root = entity(&fx, EntityType::Store, "Root").await;
        let left = entity(&fx, EntityType::Component, "Left").await;
        let right = entity(&fx, EntityType::Component, "Right").await;
        let shared = entity(&fx, EntityType::Component, "Shared").await;
        relate(&fx, &root, &left, relation_types::USES).await;
        relate(&fx, &root, &right, relation_types::USES).await;
        relate(&fx, &left, &shared, relation_types::USES).await;
        relate(&fx, &right, &shared, relation_types::USES).await;

        let report = fx.query.analyze_impact("Root").await.unwrap();
        assert_eq!(report.direct.len(), 2);
        assert_eq!(report.indirect.len(), 1);
        assert_eq!(report.indirect[0].name, "Shared");
        assert_eq!(report.indirect[0].level, 2);
    }

    #[tokio::test]
    async fn test_find_state_mutations() {
        let fx = create_fixture().await;
        assert!(fx.query.find_state_mutations("UserStore").await.unwrap().is_empty());

        let store = entity(&fx, EntityType::Store, "UserStore").await;
        let action = entity(&fx, EntityType::Action, "setUser").await;
        fx.relations
            .create(
                NewRelation::new(&action.id, &store.id, relation_types::MUTATES)
                    .with_properties(serde_json::json!({ "field": "currentUser" })),
            )
            .await
            .unwrap();
        // A USES edge into the store is not a mutation fact.
        let reader = entity(&fx, EntityType::Component, "Profile").await;
        relate(&fx, &reader, &store, relation_types::USES).await;

        let mutations = fx.query.find_state_mutations("UserStore").await.unwrap();
        assert_eq!(mutations.len(), 1);
        assert_eq!(mutations[0].source_name, "setUser");
        assert_eq!(mutations[0].source_type, EntityType::Action);
        assert_eq!(mutations[0].properties["field"], "currentUser");
    }

    #[tokio::test]
    async fn test_find_similar_patterns_ranks_by_shared_types() {
        let fx = create_fixture().await;
        let stores = entity(&fx, EntityType::Store, "Backing").await;
        let reference = entity(&fx, EntityType::Component, "LoginForm").await;
        let twin = entity(&fx, EntityType::Component, "SignupForm").await;
        let cousin = entity(&fx, EntityType::Action, "resetPassword").await;
        let loner = entity(&fx, EntityType::Component, "Footer").await;

        relate(&fx, &reference, &stores, relation_types::USES).await;
        relate(&fx, &reference, &stores, relation_types::MUTATES).await;
        relate(&fx, &twin, &stores, relation_types::USES).await;
        relate(&fx, &twin, &stores, relation_types::MUTATES).await;
        relate(&fx, &cousin, &stores, relation_types::MUTATES).await;
        relate(&fx, &loner, &stores, relation_types::CONTAINS).await;

        let similar = fx.query.find_similar_patterns("LoginForm", 10).await.unwrap();
        let names: Vec<&str> = similar.iter().map(|s| s.name.as_str()).collect();
        // Twin shares two types plus the same-type bonus; loner shares none.
        assert_eq!(names[0], "SignupForm");
        assert!(names.contains(&"resetPassword"));
        assert!(!names.contains(&"Footer"));
        assert_eq!(similar[0].shared_relation_types, 2);
        assert!(similar[0].score > similar[1].score);
    }

    #[tokio::test]
    async fn test_find_similar_patterns_unknown_root_is_empty() {
        let fx = create_fixture().await;
        assert!(fx.query.find_similar_patterns("Ghost", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generate_from_pattern() {
        let fx = create_fixture().await;
        fx.entities
            .create(
                NewEntity::new(EntityType::Pattern, "greeting").with_data(serde_json::json!({
                    "template": "Hello {{name}}, welcome to {{project}}"
                })),
            )
            .await
            .unwrap();

        let output = fx
            .query
            .generate_from_pattern(
                GenerateRequest::new("greeting").with_variable("name", "World"),
            )
            .await
            .unwrap();
        assert_eq!(output.content, "Hello World, welcome to {{project}}");
        assert_eq!(output.unresolved, vec!["project"]);

        let full = fx
            .query
            .generate_from_pattern(
                GenerateRequest::new("greeting")
                    .with_variable("name", "World")
                    .with_variable("project", "Archmap"),
            )
            .await
            .unwrap();
        assert_eq!(full.content, "Hello World, welcome to Archmap");
        assert!(full.unresolved.is_empty());
    }

    #[tokio::test]
    async fn test_generate_from_unknown_pattern_fails() {
        let fx = create_fixture().await;
        let err = fx
            .query
            .generate_from_pattern(GenerateRequest::new("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EntityNotFound(_)));
    }

    #[tokio::test]
    async fn test_generate_from_pattern_without_template_fails() {
        let fx = create_fixture().await;
        fx.entities
            .create(NewEntity::new(EntityType::Pattern, "empty"))
            .await
            .unwrap();

        let err = fx
            .query
            .generate_from_pattern(GenerateRequest::new("empty"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
