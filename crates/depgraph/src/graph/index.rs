//! In-memory adjacency view of the graph.
//!
//! A [`GraphIndex`] is an immutable snapshot once published. Writers clone the
//! current snapshot, patch the clone and publish it as a new `Arc`; entities and
//! relationships are held behind `Arc` so a clone copies pointers, not payloads.
//!
//! Invariant: every relationship in the index has both endpoints in the index.
//! Mutators enforce it (inserting a dangling relationship fails, removing an
//! entity removes every relationship touching it).

use super::types::{Entity, EntityId, Relationship, RelationshipId};
use crate::error::{GraphError, Result};
use log::trace;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Snapshot of entities plus forward and reverse adjacency.
#[derive(Debug, Clone, Default)]
pub struct GraphIndex {
    // BTreeMap: full scans come back in id order
    entities: BTreeMap<EntityId, Arc<Entity>>,
    relationships: HashMap<RelationshipId, Arc<Relationship>>,
    // Adjacency lists hold relationship ids in insertion order
    outgoing: HashMap<EntityId, Vec<RelationshipId>>,
    incoming: HashMap<EntityId, Vec<RelationshipId>>,
    version: u64,
}

impl GraphIndex {
    /// An empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from loaded records.
    ///
    /// Relationships are inserted in ascending id order. Relationships whose
    /// source or target is missing are skipped and returned so the caller can
    /// repair storage.
    pub fn from_records(
        entities: Vec<Entity>,
        mut relationships: Vec<Relationship>,
    ) -> (Self, Vec<Relationship>) {
        let mut index = Self::new();
        for entity in entities {
            index.insert_entity(entity);
        }

        relationships.sort_by_key(|rel| rel.id);
        let mut dangling = Vec::new();
        for rel in relationships {
            if index.contains(&rel.source_id) && index.contains(&rel.target_id) {
                // Endpoints checked above
                let _ = index.insert_relationship(rel);
            } else {
                dangling.push(rel);
            }
        }

        (index, dangling)
    }

    /// Monotonic counter bumped on every published mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of entities in the snapshot.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of relationships in the snapshot.
    pub fn relationship_count(&self) -> usize {
        self.relationships.len()
    }

    /// Whether an entity with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    /// Look up an entity.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EntityNotFound`] if the entity doesn't exist.
    pub fn get(&self, id: &str) -> Result<&Entity> {
        self.entities
            .get(id)
            .map(Arc::as_ref)
            .ok_or_else(|| GraphError::entity_not_found(id))
    }

    /// Look up a relationship.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::RelationshipNotFound`] if the relationship doesn't exist.
    pub fn relationship(&self, id: RelationshipId) -> Result<&Relationship> {
        self.relationships
            .get(&id)
            .map(Arc::as_ref)
            .ok_or_else(|| GraphError::RelationshipNotFound {
                relationship_id: id.to_string(),
            })
    }

    /// Resolve the endpoint of a relationship already in the index.
    ///
    /// A miss here means the index lost its cascade invariant, which is reported
    /// as [`GraphError::Internal`] rather than as a user-facing not-found.
    pub fn endpoint(&self, id: &str) -> Result<&Entity> {
        self.entities.get(id).map(Arc::as_ref).ok_or_else(|| {
            GraphError::internal(format!("index holds an edge to missing entity {id}"))
        })
    }

    /// Relationships leaving `id`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EntityNotFound`] if `id` doesn't exist.
    pub fn outgoing(&self, id: &str) -> Result<Vec<&Relationship>> {
        self.get(id)?;
        self.resolve(self.outgoing.get(id))
    }

    /// Relationships arriving at `id`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EntityNotFound`] if `id` doesn't exist.
    pub fn incoming(&self, id: &str) -> Result<Vec<&Relationship>> {
        self.get(id)?;
        self.resolve(self.incoming.get(id))
    }

    /// All entities in id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values().map(Arc::as_ref)
    }

    /// All relationships in insertion order.
    pub fn relationships(&self) -> Vec<&Relationship> {
        let mut rels: Vec<&Relationship> = self.relationships.values().map(Arc::as_ref).collect();
        rels.sort_by_key(|rel| rel.id);
        rels
    }

    fn resolve(&self, ids: Option<&Vec<RelationshipId>>) -> Result<Vec<&Relationship>> {
        let Some(ids) = ids else {
            return Ok(Vec::new());
        };
        ids.iter()
            .map(|rel_id| {
                self.relationships
                    .get(rel_id)
                    .map(Arc::as_ref)
                    .ok_or_else(|| {
                        GraphError::internal(format!(
                            "adjacency list references missing relationship {rel_id}"
                        ))
                    })
            })
            .collect()
    }

    // ===== Mutators (only called on an unpublished clone) =====

    pub(crate) fn bump_version(&mut self) {
        self.version += 1;
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Insert or replace an entity. Adjacency is untouched.
    pub(crate) fn insert_entity(&mut self, entity: Entity) {
        self.entities.insert(entity.id.clone(), Arc::new(entity));
    }

    /// Append a relationship to its endpoints' adjacency lists.
    pub(crate) fn insert_relationship(&mut self, rel: Relationship) -> Result<()> {
        self.get(&rel.source_id)?;
        self.get(&rel.target_id)?;

        self.outgoing
            .entry(rel.source_id.clone())
            .or_default()
            .push(rel.id);
        self.incoming
            .entry(rel.target_id.clone())
            .or_default()
            .push(rel.id);
        self.relationships.insert(rel.id, Arc::new(rel));
        Ok(())
    }

    /// Remove a relationship from the maps and both adjacency lists.
    pub(crate) fn remove_relationship(&mut self, id: RelationshipId) -> Option<Relationship> {
        let rel = self.relationships.remove(&id)?;
        if let Some(out) = self.outgoing.get_mut(&rel.source_id) {
            out.retain(|rel_id| *rel_id != id);
        }
        if let Some(inc) = self.incoming.get_mut(&rel.target_id) {
            inc.retain(|rel_id| *rel_id != id);
        }
        Some(Arc::unwrap_or_clone(rel))
    }

    /// Ids of every relationship touching `id`, each once (self-loops appear
    /// in both lists).
    pub(crate) fn touching(&self, id: &str) -> Vec<RelationshipId> {
        let mut ids: Vec<RelationshipId> = self
            .outgoing
            .get(id)
            .into_iter()
            .chain(self.incoming.get(id))
            .flatten()
            .copied()
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Remove an entity and cascade to every relationship touching it.
    ///
    /// Returns the removed relationships.
    pub(crate) fn remove_entity(&mut self, id: &str) -> Result<(Entity, Vec<Relationship>)> {
        self.get(id)?;
        let removed: Vec<Relationship> = self
            .touching(id)
            .into_iter()
            .filter_map(|rel_id| self.remove_relationship(rel_id))
            .collect();
        trace!("Cascade removed {} relationships of entity {id}", removed.len());

        self.outgoing.remove(id);
        self.incoming.remove(id);
        let entity = self
            .entities
            .remove(id)
            .ok_or_else(|| GraphError::entity_not_found(id))?;
        Ok((Arc::unwrap_or_clone(entity), removed))
    }
}
