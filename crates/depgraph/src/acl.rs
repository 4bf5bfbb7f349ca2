//! Access control: read/write decisions and result filtering.
//!
//! Decisions are derived from an entity's `visibility`, `owner`, `readers` and
//! `writers`; nothing here is stored. A relationship carries its own visibility
//! and is judged against its source entity's owner and readers.

use crate::graph::{Entity, Relationship, Visibility};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The caller a query runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    /// Principal identifier (user id)
    pub id: String,
    /// Department the principal belongs to
    pub department: String,
}

impl Principal {
    /// Create a principal.
    pub fn new(id: impl Into<String>, department: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            department: department.into(),
        }
    }

    /// Whether this principal may read `entity`.
    pub fn can_read(&self, entity: &Entity) -> bool {
        self.can_read_with(entity.visibility, &entity.owner, &entity.readers)
    }

    /// Whether this principal may read `relationship`, whose source entity is `source`.
    pub fn can_read_relationship(&self, relationship: &Relationship, source: &Entity) -> bool {
        self.can_read_with(relationship.visibility, &source.owner, &source.readers)
    }

    /// Whether this principal may modify `entity`.
    pub fn can_write(&self, entity: &Entity) -> bool {
        self.id == entity.owner || entity.writers.contains(&self.id)
    }

    fn can_read_with(&self, visibility: Visibility, owner: &str, readers: &BTreeSet<String>) -> bool {
        match visibility {
            Visibility::Public => true,
            Visibility::Department => self.department == owner,
            Visibility::Restricted => readers.contains(&self.id) || self.id == owner,
            Visibility::Private => self.id == owner,
        }
    }
}

/// Removes entities a principal cannot read, preserving relative order.
#[derive(Debug, Clone, Copy)]
pub struct AccessFilter<'a> {
    principal: &'a Principal,
}

impl<'a> AccessFilter<'a> {
    /// Filter on behalf of `principal`.
    pub fn new(principal: &'a Principal) -> Self {
        Self { principal }
    }

    /// The principal this filter decides for.
    pub fn principal(&self) -> &'a Principal {
        self.principal
    }

    /// Keep readable entities.
    pub fn entities(&self, entities: Vec<Entity>) -> Vec<Entity> {
        entities
            .into_iter()
            .filter(|entity| self.principal.can_read(entity))
            .collect()
    }
}
