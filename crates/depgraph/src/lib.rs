//! # depgraph
//!
//! An access-controlled dependency graph for organisational entities (projects,
//! teams, users, skills) with the queries that matter for planning: what does
//! this depend on, who depends on it, where are the bottlenecks, where are the
//! cycles, and how are two entities connected.
//!
//! ## Core Principles
//!
//! - **Open Types**: entity and relationship types are strings, never a closed enum
//! - **Consistent Snapshots**: every query runs against one immutable snapshot
//! - **Deterministic Output**: the same graph always yields the same ordered results
//! - **Visibility First**: a caller never sees an entity it cannot read
//! - **Persistence Primary**: durable storage with RocksDB
//!
//! ## Architecture
//!
//! depgraph is organized in layers:
//!
//! ```text
//! Callers (services, CLIs)
//!     ↓
//! Query Engine (ACL-filtered queries, config defaults)
//!     ↓
//! Access Control (principal, visibility, filtering)
//!     ↓
//! Core Graph (entities, relationships, snapshots, algorithms)
//!     ↓
//! Storage Backend (RocksDB, memory)
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use depgraph::{helpers, Criticality, DependencyGraph, EngineConfig, Principal, QueryContext, QueryEngine};
//! use std::sync::Arc;
//!
//! let graph = Arc::new(DependencyGraph::open("./org.graph").unwrap());
//! let payments = helpers::add_project(&graph, "Payment System", "platform-team").unwrap();
//! let users = helpers::add_project(&graph, "User Service", "platform-team").unwrap();
//! helpers::depends_on(&graph, &payments, &users, Criticality::High).unwrap();
//!
//! let engine = QueryEngine::new(graph, EngineConfig::default()).unwrap();
//! let caller = Principal::new("alice", "platform-team");
//! let deps = engine
//!     .find_dependencies(&caller, &payments, Some(3), &QueryContext::none())
//!     .unwrap();
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod acl;
pub mod cancel;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod helpers;
pub mod query;
pub mod storage;

// Re-export main types
pub use acl::{AccessFilter, Principal};
pub use cancel::{CancellationToken, QueryContext};
pub use config::EngineConfig;
pub use engine::QueryEngine;
pub use error::{ErrorKind, GraphError, Result};
pub use graph::{
    Criticality, DeclaredTypes, DependencyGraph, Entity, EntityId, EntityUpdate, GraphIndex,
    NewEntity, NewRelationship, OpenRegistry, PropertyMap, PropertyValue, Relationship,
    RelationshipId, TypeRegistry, Visibility,
};
pub use query::EntityQuery;
pub use storage::{MemoryBackend, StorageBackend};
#[cfg(feature = "rocksdb-backend")]
pub use storage::RocksDBBackend;
