//! Storage backend abstractions and implementations.
//!
//! The graph treats storage as an external collaborator offering durable
//! get / put / delete / prefix scan and atomic batches:
//! - [`RocksDBBackend`]: Production-ready persistent storage
//! - [`MemoryBackend`]: In-memory storage for tests and fixtures
//!
//! ## Key layout
//!
//! - `entity:{id}` → JSON [`Entity`](crate::Entity)
//! - `rel:{id:020}` → JSON [`Relationship`](crate::Relationship); zero padding makes
//!   a prefix scan return relationships in insertion order
//! - `meta:counters` → relationship id counter

mod memory;
#[cfg(feature = "rocksdb-backend")]
mod rocksdb_backend;

pub use memory::MemoryBackend;
#[cfg(feature = "rocksdb-backend")]
pub use rocksdb_backend::RocksDBBackend;

use crate::error::Result;
use crate::graph::RelationshipId;
use serde::{Deserialize, Serialize};

/// Key-value pair for storage operations.
pub type KeyValue = (Vec<u8>, Vec<u8>);

/// Prefix of every entity key.
pub const ENTITY_PREFIX: &[u8] = b"entity:";

/// Prefix of every relationship key.
pub const RELATIONSHIP_PREFIX: &[u8] = b"rel:";

/// Key holding the persisted id counters.
pub const COUNTERS_KEY: &[u8] = b"meta:counters";

/// Storage key for an entity.
pub fn entity_key(id: &str) -> Vec<u8> {
    format!("entity:{id}").into_bytes()
}

/// Storage key for a relationship.
pub fn relationship_key(id: RelationshipId) -> Vec<u8> {
    format!("rel:{id:020}").into_bytes()
}

/// Trait defining the storage backend interface.
///
/// All storage operations are explicit and return `Result` to handle failures.
/// Implementations must make batch writes atomic.
pub trait StorageBackend: Send + Sync {
    /// Store a key-value pair.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`](crate::GraphError::Storage) if the write fails.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Retrieve a value by key. Returns `Ok(None)` if the key doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`](crate::GraphError::Storage) if the read fails.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Delete a key-value pair. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`](crate::GraphError::Storage) if the delete fails.
    fn delete(&mut self, key: &[u8]) -> Result<()>;

    /// Check if a key exists.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`](crate::GraphError::Storage) if the check fails.
    fn exists(&self, key: &[u8]) -> Result<bool>;

    /// All key-value pairs whose key starts with `prefix`, in key order.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`](crate::GraphError::Storage) if iteration fails.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<KeyValue>>;

    /// Execute a batch of write operations atomically.
    ///
    /// Either all operations succeed or none do.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`](crate::GraphError::Storage) if the batch fails.
    fn write_batch(&mut self, operations: Vec<BatchOperation>) -> Result<()>;

    /// Flush any buffered writes to disk.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Storage`](crate::GraphError::Storage) if flush fails.
    fn flush(&mut self) -> Result<()>;
}

/// Batch write operation for atomic updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BatchOperation {
    /// Put a key-value pair
    Put {
        /// Key to write
        key: Vec<u8>,
        /// Value to write
        value: Vec<u8>,
    },
    /// Delete a key
    Delete {
        /// Key to delete
        key: Vec<u8>,
    },
}
