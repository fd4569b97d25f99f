//! Archmap Core Library
//!
//! Embedded knowledge-graph store for documenting one project's
//! architecture: typed entities, directed relations and free-text
//! observations persisted in SQLite, with full-text search, bounded
//! recursive traversal (workflow tracing, impact analysis, similarity) and
//! pattern-based text generation on top.
//!
//! The serving layer (RPC tools), the analyzers that produce graph facts
//! and any UI live outside this crate; they talk to it through
//! [`graph::GraphStore`] with JSON-shaped domain types.
//!
//! ```ignore
//! use archmap_core::domain::{EntityType, NewEntity, NewRelation, relation_types};
//! use archmap_core::graph::GraphStore;
//!
//! let store = GraphStore::open_at("graph.db").await?;
//!
//! let user_store = store
//!     .entities()
//!     .create(NewEntity::new(EntityType::Store, "UserStore"))
//!     .await?;
//! let login = store
//!     .entities()
//!     .create(NewEntity::new(EntityType::Component, "LoginForm"))
//!     .await?;
//! store
//!     .relations()
//!     .create(NewRelation::new(&login.id, &user_store.id, relation_types::USES))
//!     .await?;
//!
//! let hits = store.graph().search("authentication", 10).await?;
//! let trace = store.graph().trace_workflow("Login").await?;
//! ```

pub mod domain;
pub mod error;
pub mod graph;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::domain::{
        relation_types, Entity, EntityType, EntityUpdate, GenerateRequest, NewEntity, NewRelation,
        Observation, Relation, SeverityPolicy,
    };
    pub use crate::error::{Error, Result};
    pub use crate::graph::{GraphStore, StoreConfig};
}
