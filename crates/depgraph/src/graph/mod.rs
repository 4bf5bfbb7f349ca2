//! Core graph types and operations.
//!
//! This module defines the fundamental building blocks:
//! - [`Entity`]: Graph nodes representing organizational objects
//! - [`Relationship`]: Directed, typed dependencies between entities
//! - [`GraphIndex`]: An immutable adjacency snapshot
//! - [`DependencyGraph`]: The storage-backed graph that publishes snapshots

mod types;
mod property;
mod registry;
mod index;
mod depgraph;
pub mod algorithms;

pub use types::{
    Criticality, Entity, EntityId, EntityUpdate, NewEntity, NewRelationship, Relationship,
    RelationshipId, Visibility,
};
pub use property::{PropertyMap, PropertyValue};
pub use registry::{DeclaredTypes, OpenRegistry, TypeRegistry};
pub use index::GraphIndex;
pub use depgraph::DependencyGraph;
