//! Error types for depgraph operations.
//!
//! All fallible operations return [`Result<T>`]. Every [`GraphError`] maps onto one
//! of four caller-facing categories through [`GraphError::kind`].

use thiserror::Error;

/// Result type alias for depgraph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Caller-facing error category.
///
/// API collaborators translate these into their own status codes
/// (not found, bad request, client closed request, server error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A referenced entity or relationship does not exist.
    NotFound,
    /// A query parameter or mutation payload is malformed.
    InvalidArgument,
    /// The caller aborted the operation or its deadline passed.
    Cancelled,
    /// Storage or index failure.
    Internal,
}

/// Comprehensive error type for all graph operations.
#[derive(Error, Debug)]
pub enum GraphError {
    /// Storage backend error (RocksDB, file I/O, etc.)
    #[error("Storage error: {message}")]
    Storage {
        /// Detailed error message
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error details
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Entity not found in the graph
    #[error("Entity not found: {entity_id}")]
    EntityNotFound {
        /// ID of the missing entity
        entity_id: String,
    },

    /// Relationship not found in the graph
    #[error("Relationship not found: {relationship_id}")]
    RelationshipNotFound {
        /// ID of the missing relationship
        relationship_id: String,
    },

    /// Malformed parameter (non-positive limit, duplicate id, unknown type, ...)
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Description of what was wrong
        message: String,
    },

    /// The operation was cancelled before it produced a result.
    #[error("Operation cancelled")]
    Cancelled,

    /// Internal invariant violation, e.g. an index edge to a missing entity.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the violated invariant
        message: String,
    },
}

impl GraphError {
    /// Create a storage error from a message and optional source.
    pub fn storage<E>(message: impl Into<String>, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Create a serialization error from a message and optional source.
    pub fn serialization<E>(message: impl Into<String>, source: Option<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Serialization {
            message: message.into(),
            source: source.map(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>),
        }
    }

    /// Create an [`GraphError::EntityNotFound`] for the given id.
    pub fn entity_not_found(entity_id: impl Into<String>) -> Self {
        Self::EntityNotFound {
            entity_id: entity_id.into(),
        }
    }

    /// Create an [`GraphError::InvalidArgument`] with the given message.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an [`GraphError::Internal`] with the given message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GraphError::EntityNotFound { .. } | GraphError::RelationshipNotFound { .. } => {
                ErrorKind::NotFound
            }
            GraphError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            GraphError::Cancelled => ErrorKind::Cancelled,
            GraphError::Storage { .. }
            | GraphError::Serialization { .. }
            | GraphError::Internal { .. } => ErrorKind::Internal,
        }
    }
}
