//! Storage-backed dependency graph with snapshot publication.

use super::index::GraphIndex;
use super::property::PropertyMap;
use super::registry::{OpenRegistry, TypeRegistry};
use super::types::{
    Entity, EntityId, EntityUpdate, NewEntity, NewRelationship, Relationship, RelationshipId,
};
use crate::error::{GraphError, Result};
use crate::query::EntityQuery;
use crate::storage::{
    self, BatchOperation, MemoryBackend, StorageBackend, COUNTERS_KEY, ENTITY_PREFIX,
    RELATIONSHIP_PREFIX,
};
use chrono::Utc;
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use uuid::Uuid;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Counters {
    relationship_counter: RelationshipId,
}

/// State only a writer may touch. Guarded by one mutex, so mutations are serialized.
struct Writer {
    storage: Box<dyn StorageBackend>,
    relationship_counter: RelationshipId,
}

impl Writer {
    fn next_relationship_id(&mut self) -> RelationshipId {
        let id = self.relationship_counter;
        self.relationship_counter += 1;
        id
    }

    fn counters_op(&self) -> Result<BatchOperation> {
        let counters = Counters {
            relationship_counter: self.relationship_counter,
        };
        Ok(BatchOperation::Put {
            key: COUNTERS_KEY.to_vec(),
            value: to_json(&counters, "counters")?,
        })
    }
}

/// The dependency graph: durable records in a [`StorageBackend`], served to
/// readers as immutable [`GraphIndex`] snapshots.
///
/// Readers call [`snapshot`](Self::snapshot) and keep the returned `Arc` for the
/// whole query; a mutation never changes a published snapshot. Writers are
/// serialized, persist first, then swap in a patched copy of the index. The
/// snapshot lock is held only for the pointer swap.
pub struct DependencyGraph {
    writer: Mutex<Writer>,
    snapshot: RwLock<Arc<GraphIndex>>,
    registry: Box<dyn TypeRegistry>,
}

impl DependencyGraph {
    /// Open a graph over the given storage backend, accepting any type names.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`] or [`GraphError::Serialization`] if the
    /// stored records cannot be loaded.
    pub fn with_backend(backend: Box<dyn StorageBackend>) -> Result<Self> {
        Self::with_registry(backend, Box::new(OpenRegistry))
    }

    /// Open a graph over the given storage backend, validating payloads with `registry`.
    ///
    /// # Errors
    ///
    /// As [`with_backend`](Self::with_backend).
    pub fn with_registry(
        backend: Box<dyn StorageBackend>,
        registry: Box<dyn TypeRegistry>,
    ) -> Result<Self> {
        let mut writer = Writer {
            storage: backend,
            relationship_counter: 0,
        };
        let index = load_index(&mut writer)?;

        Ok(Self {
            writer: Mutex::new(writer),
            snapshot: RwLock::new(Arc::new(index)),
            registry,
        })
    }

    /// Open a persistent graph at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`] if the database cannot be opened.
    #[cfg(feature = "rocksdb-backend")]
    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let backend = crate::storage::RocksDBBackend::open(path)?;
        Self::with_backend(Box::new(backend))
    }

    /// Create a graph over a fresh [`MemoryBackend`].
    pub fn in_memory() -> Result<Self> {
        Self::with_backend(Box::new(MemoryBackend::new()))
    }

    /// The current snapshot. Queries hold on to it for their whole run.
    pub fn snapshot(&self) -> Result<Arc<GraphIndex>> {
        self.snapshot
            .read()
            .map(|guard| Arc::clone(&*guard))
            .map_err(|_| GraphError::internal("snapshot lock poisoned"))
    }

    /// Get a copy of an entity from the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EntityNotFound`] if the entity doesn't exist.
    pub fn get_entity(&self, id: &str) -> Result<Entity> {
        self.snapshot()?.get(id).cloned()
    }

    /// Get a copy of a relationship from the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::RelationshipNotFound`] if the relationship doesn't exist.
    pub fn get_relationship(&self, id: RelationshipId) -> Result<Relationship> {
        self.snapshot()?.relationship(id).cloned()
    }

    /// Number of entities in the current snapshot.
    pub fn entity_count(&self) -> Result<usize> {
        Ok(self.snapshot()?.entity_count())
    }

    /// Number of relationships in the current snapshot.
    pub fn relationship_count(&self) -> Result<usize> {
        Ok(self.snapshot()?.relationship_count())
    }

    /// Start a fluent attribute query over the current snapshot.
    pub fn query(&self) -> Result<EntityQuery> {
        Ok(EntityQuery::new(self.snapshot()?))
    }

    /// Create an entity.
    ///
    /// # Returns
    ///
    /// The entity id (the payload's, or a generated UUID v4).
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidArgument`] for an empty or duplicate id, or a
    /// payload the registry rejects; storage errors propagate.
    pub fn create_entity(&self, payload: NewEntity) -> Result<EntityId> {
        self.validate_entity(&payload.entity_type, &payload.properties)?;

        self.mutate(|writer, index| {
            let entity = new_entity(index, payload)?;
            debug!("Creating entity: id={}, type={}", entity.id, entity.entity_type);

            writer
                .storage
                .put(&storage::entity_key(&entity.id), &to_json(&entity, "entity")?)?;
            let id = entity.id.clone();
            index.insert_entity(entity);
            Ok(id)
        })
    }

    /// Create several entities in one atomic batch.
    ///
    /// Either all entities are added or none are.
    ///
    /// # Returns
    ///
    /// The entity ids in the same order as the input.
    ///
    /// # Errors
    ///
    /// As [`create_entity`](Self::create_entity), including ids duplicated
    /// within the batch.
    pub fn create_entities_batch(&self, payloads: Vec<NewEntity>) -> Result<Vec<EntityId>> {
        for payload in &payloads {
            self.validate_entity(&payload.entity_type, &payload.properties)?;
        }
        debug!("Creating batch of {} entities", payloads.len());

        self.mutate(|writer, index| {
            let mut ids = Vec::with_capacity(payloads.len());
            let mut operations = Vec::with_capacity(payloads.len());
            for payload in payloads {
                let entity = new_entity(index, payload)?;
                operations.push(BatchOperation::Put {
                    key: storage::entity_key(&entity.id),
                    value: to_json(&entity, "entity")?,
                });
                ids.push(entity.id.clone());
                index.insert_entity(entity);
            }

            writer.storage.write_batch(operations)?;
            trace!("Batch of {} entities added", ids.len());
            Ok(ids)
        })
    }

    /// Update an entity's mutable fields in place.
    ///
    /// `updated_at` is refreshed and never moves before `created_at`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EntityNotFound`] if the entity doesn't exist and
    /// [`GraphError::InvalidArgument`] if the registry rejects new properties.
    pub fn update_entity(&self, id: &str, update: EntityUpdate) -> Result<Entity> {
        self.mutate(|writer, index| {
            let mut entity = index.get(id)?.clone();
            debug!("Updating entity: id={id}");

            if let Some(properties) = update.properties {
                self.validate_entity(&entity.entity_type, &properties)?;
                entity.properties = properties;
            }
            if let Some(name) = update.name {
                entity.name = name;
            }
            if let Some(readers) = update.readers {
                entity.readers = readers;
            }
            if let Some(writers) = update.writers {
                entity.writers = writers;
            }
            if let Some(visibility) = update.visibility {
                entity.visibility = visibility;
            }
            entity.updated_at = Utc::now().max(entity.created_at);

            writer
                .storage
                .put(&storage::entity_key(id), &to_json(&entity, "entity")?)?;
            index.insert_entity(entity.clone());
            Ok(entity)
        })
    }

    /// Delete an entity and every relationship where it is source or target.
    ///
    /// Entity and relationships leave storage in one atomic batch.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EntityNotFound`] if the entity doesn't exist.
    pub fn delete_entity(&self, id: &str) -> Result<()> {
        self.mutate(|writer, index| {
            let (_, removed) = index.remove_entity(id)?;
            debug!(
                "Deleting entity: id={id}, cascading {} relationships",
                removed.len()
            );

            let mut operations = Vec::with_capacity(removed.len() + 1);
            operations.extend(removed.iter().map(|rel| BatchOperation::Delete {
                key: storage::relationship_key(rel.id),
            }));
            operations.push(BatchOperation::Delete {
                key: storage::entity_key(id),
            });
            writer.storage.write_batch(operations)
        })
    }

    /// Append a relationship to `source_id`.
    ///
    /// This never rewrites the source entity. Visibility defaults to the
    /// source entity's visibility when the payload leaves it unset.
    ///
    /// # Returns
    ///
    /// The id assigned to the relationship.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EntityNotFound`] if source or target doesn't exist
    /// and [`GraphError::InvalidArgument`] if the registry rejects the payload.
    /// A failed write leaves the relationship counter where it was.
    pub fn add_relationship(
        &self,
        source_id: &str,
        payload: NewRelationship,
    ) -> Result<RelationshipId> {
        self.validate_relationship(&payload.relationship_type, &payload.properties)?;

        self.mutate(|writer, index| {
            let counter_before = writer.relationship_counter;
            let rel = new_relationship(writer, index, source_id, payload)?;
            let id = rel.id;
            debug!(
                "Adding relationship: id={id}, {source_id} -[{}]-> {}",
                rel.relationship_type, rel.target_id
            );

            let written = to_json(&rel, "relationship").and_then(|value| {
                let operations = vec![
                    BatchOperation::Put {
                        key: storage::relationship_key(id),
                        value,
                    },
                    writer.counters_op()?,
                ];
                writer.storage.write_batch(operations)
            });
            if let Err(e) = written {
                writer.relationship_counter = counter_before;
                return Err(e);
            }
            index.insert_relationship(rel)?;
            Ok(id)
        })
    }

    /// Add several relationships, each given with its source id, in one
    /// atomic batch.
    ///
    /// Either all relationships are added or none are. Ids are assigned in
    /// input order.
    ///
    /// # Errors
    ///
    /// As [`add_relationship`](Self::add_relationship). On failure the
    /// relationship counter is left where it was.
    pub fn add_relationships_batch(
        &self,
        relationships: Vec<(EntityId, NewRelationship)>,
    ) -> Result<Vec<RelationshipId>> {
        for (_, payload) in &relationships {
            self.validate_relationship(&payload.relationship_type, &payload.properties)?;
        }
        debug!("Adding batch of {} relationships", relationships.len());

        self.mutate(|writer, index| {
            let counter_before = writer.relationship_counter;
            let staged = relationships
                .into_iter()
                .map(|(source_id, payload)| new_relationship(writer, index, &source_id, payload))
                .collect::<Result<Vec<_>>>();
            let staged = match staged {
                Ok(staged) => staged,
                Err(e) => {
                    writer.relationship_counter = counter_before;
                    return Err(e);
                }
            };

            let mut operations = Vec::with_capacity(staged.len() + 1);
            for rel in &staged {
                operations.push(BatchOperation::Put {
                    key: storage::relationship_key(rel.id),
                    value: to_json(rel, "relationship")?,
                });
            }
            operations.push(writer.counters_op()?);
            if let Err(e) = writer.storage.write_batch(operations) {
                writer.relationship_counter = counter_before;
                return Err(e);
            }

            let mut ids = Vec::with_capacity(staged.len());
            for rel in staged {
                ids.push(rel.id);
                index.insert_relationship(rel)?;
            }
            trace!("Batch of {} relationships added", ids.len());
            Ok(ids)
        })
    }

    /// Delete a single relationship.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::RelationshipNotFound`] if it doesn't exist.
    pub fn delete_relationship(&self, id: RelationshipId) -> Result<()> {
        self.mutate(|writer, index| {
            index.relationship(id)?;
            debug!("Deleting relationship: id={id}");
            writer.storage.delete(&storage::relationship_key(id))?;
            index.remove_relationship(id);
            Ok(())
        })
    }

    /// Rebuild the index from storage and publish it.
    ///
    /// This is the poll path for changes made to the store by someone else.
    /// Relationships whose endpoints are gone from storage are deleted.
    ///
    /// # Errors
    ///
    /// Storage and serialization errors propagate; the previous snapshot stays
    /// published.
    pub fn reload(&self) -> Result<()> {
        let mut writer = self.lock_writer()?;
        let mut index = load_index(&mut writer)?;
        index.set_version(self.snapshot()?.version() + 1);
        self.publish(index)
    }

    /// Flush buffered writes in the storage backend.
    pub fn flush(&self) -> Result<()> {
        let mut writer = self.lock_writer()?;
        let counters = writer.counters_op()?;
        writer.storage.write_batch(vec![counters])?;
        writer.storage.flush()?;
        trace!("Flush complete");
        Ok(())
    }

    fn validate_entity(&self, entity_type: &str, properties: &PropertyMap) -> Result<()> {
        properties.check_finite()?;
        self.registry.validate_entity(entity_type, properties)
    }

    fn validate_relationship(
        &self,
        relationship_type: &str,
        properties: &PropertyMap,
    ) -> Result<()> {
        properties.check_finite()?;
        self.registry
            .validate_relationship(relationship_type, properties)
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, Writer>> {
        self.writer
            .lock()
            .map_err(|_| GraphError::internal("writer lock poisoned"))
    }

    /// Run one mutation: clone the current snapshot, let `f` persist and patch
    /// the clone, then publish it. Nothing is published if `f` fails.
    fn mutate<T>(&self, f: impl FnOnce(&mut Writer, &mut GraphIndex) -> Result<T>) -> Result<T> {
        let mut writer = self.lock_writer()?;
        let mut next = GraphIndex::clone(&*self.snapshot()?);
        let value = f(&mut writer, &mut next)?;
        next.bump_version();
        self.publish(next)?;
        Ok(value)
    }

    fn publish(&self, index: GraphIndex) -> Result<()> {
        let mut guard = self
            .snapshot
            .write()
            .map_err(|_| GraphError::internal("snapshot lock poisoned"))?;
        trace!("Publishing snapshot version {}", index.version());
        *guard = Arc::new(index);
        Ok(())
    }
}

fn to_json<T: Serialize>(value: &T, what: &str) -> Result<Vec<u8>> {
    serde_json::to_vec(value)
        .map_err(|e| GraphError::serialization(format!("Failed to serialize {what}"), Some(e)))
}

fn new_entity(index: &GraphIndex, payload: NewEntity) -> Result<Entity> {
    let id = payload
        .id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    if id.trim().is_empty() {
        return Err(GraphError::invalid_argument("entity id must not be empty"));
    }
    if index.contains(&id) {
        return Err(GraphError::invalid_argument(format!(
            "entity {id} already exists"
        )));
    }

    let now = Utc::now();
    Ok(Entity {
        id,
        entity_type: payload.entity_type,
        name: payload.name,
        properties: payload.properties,
        owner: payload.owner,
        readers: payload.readers,
        writers: payload.writers,
        visibility: payload.visibility,
        created_at: now,
        updated_at: now,
    })
}

/// Both endpoints must already be in `index`. Consumes a relationship id.
fn new_relationship(
    writer: &mut Writer,
    index: &GraphIndex,
    source_id: &str,
    payload: NewRelationship,
) -> Result<Relationship> {
    let source_visibility = index.get(source_id)?.visibility;
    index.get(&payload.target_id)?;

    Ok(Relationship {
        id: writer.next_relationship_id(),
        relationship_type: payload.relationship_type,
        source_id: source_id.to_string(),
        target_id: payload.target_id,
        criticality: payload.criticality,
        properties: payload.properties,
        visibility: payload.visibility.unwrap_or(source_visibility),
        created_at: Utc::now(),
    })
}

fn load_index(writer: &mut Writer) -> Result<GraphIndex> {
    if let Some(raw) = writer.storage.get(COUNTERS_KEY)? {
        let counters: Counters = serde_json::from_slice(&raw)
            .map_err(|e| GraphError::serialization("Failed to deserialize counters", Some(e)))?;
        writer.relationship_counter = writer.relationship_counter.max(counters.relationship_counter);
    }

    let entities = writer
        .storage
        .scan_prefix(ENTITY_PREFIX)?
        .into_iter()
        .map(|(_, value)| {
            serde_json::from_slice::<Entity>(&value)
                .map_err(|e| GraphError::serialization("Failed to deserialize entity", Some(e)))
        })
        .collect::<Result<Vec<_>>>()?;

    let relationships = writer
        .storage
        .scan_prefix(RELATIONSHIP_PREFIX)?
        .into_iter()
        .map(|(_, value)| {
            serde_json::from_slice::<Relationship>(&value).map_err(|e| {
                GraphError::serialization("Failed to deserialize relationship", Some(e))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if let Some(max_id) = relationships.iter().map(|rel| rel.id).max() {
        writer.relationship_counter = writer.relationship_counter.max(max_id + 1);
    }

    let (index, dangling) = GraphIndex::from_records(entities, relationships);
    if !dangling.is_empty() {
        for rel in &dangling {
            warn!(
                "Dropping dangling relationship {} ({} -> {})",
                rel.id, rel.source_id, rel.target_id
            );
        }
        let operations = dangling
            .iter()
            .map(|rel| BatchOperation::Delete {
                key: storage::relationship_key(rel.id),
            })
            .collect();
        writer.storage.write_batch(operations)?;
    }

    debug!(
        "Loaded {} entities and {} relationships from storage",
        index.entity_count(),
        index.relationship_count()
    );
    Ok(index)
}
