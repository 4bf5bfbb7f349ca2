//! Core graph types: entities, relationships, IDs, and enums.

use super::property::{PropertyMap, PropertyValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Opaque unique identifier for an entity.
///
/// Generated as a UUID v4 unless the caller supplies one.
pub type EntityId = String;

/// Unique identifier for a relationship (monotonic counter, doubles as insertion order).
pub type RelationshipId = u64;

/// Ordered severity of a dependency: `Low < Medium < High < Blocking`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Criticality {
    /// Can be delayed or postponed
    Low,
    /// Should be considered
    #[default]
    Medium,
    /// Critical for success
    High,
    /// Must be resolved before proceeding
    Blocking,
}

impl fmt::Display for Criticality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Criticality::Low => write!(f, "LOW"),
            Criticality::Medium => write!(f, "MEDIUM"),
            Criticality::High => write!(f, "HIGH"),
            Criticality::Blocking => write!(f, "BLOCKING"),
        }
    }
}

impl FromStr for Criticality {
    type Err = crate::error::GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Ok(Criticality::Low),
            "MEDIUM" => Ok(Criticality::Medium),
            "HIGH" => Ok(Criticality::High),
            "BLOCKING" => Ok(Criticality::Blocking),
            other => Err(crate::error::GraphError::invalid_argument(format!(
                "unknown criticality '{other}'"
            ))),
        }
    }
}

/// Access-control class of an entity or relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    /// Every authenticated principal may read
    Public,
    /// Principals whose department equals the owner may read
    #[default]
    Department,
    /// Owner and explicit readers may read
    Restricted,
    /// Only the owner may read
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Public => write!(f, "PUBLIC"),
            Visibility::Department => write!(f, "DEPARTMENT"),
            Visibility::Restricted => write!(f, "RESTRICTED"),
            Visibility::Private => write!(f, "PRIVATE"),
        }
    }
}

impl FromStr for Visibility {
    type Err = crate::error::GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PUBLIC" => Ok(Visibility::Public),
            "DEPARTMENT" => Ok(Visibility::Department),
            "RESTRICTED" => Ok(Visibility::Restricted),
            "PRIVATE" => Ok(Visibility::Private),
            other => Err(crate::error::GraphError::invalid_argument(format!(
                "unknown visibility '{other}'"
            ))),
        }
    }
}

/// A node in the dependency graph (project, team, user, skill, service, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique, immutable identifier
    pub id: EntityId,
    /// Open type tag, e.g. "Project" or "Team"
    pub entity_type: String,
    /// Display name
    pub name: String,
    /// Type-specific attributes
    pub properties: PropertyMap,
    /// Controlling principal (a user or a department)
    pub owner: String,
    /// Principals granted explicit read access
    pub readers: BTreeSet<String>,
    /// Principals granted explicit write access
    pub writers: BTreeSet<String>,
    /// Access-control class
    pub visibility: Visibility,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time, never earlier than `created_at`
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    /// Get a property value.
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }
}

/// A directed, typed, attributed edge between two entities.
///
/// A relationship is owned by its source entity and removed with it; the
/// target is only referenced, but deleting it removes the relationship too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Unique identifier (assigned by graph)
    pub id: RelationshipId,
    /// Open type tag, e.g. "DEPENDS_ON" or "HAS_SKILL"
    pub relationship_type: String,
    /// Owning entity
    pub source_id: EntityId,
    /// Referenced entity
    pub target_id: EntityId,
    /// Severity of the dependency
    pub criticality: Criticality,
    /// Type-specific attributes
    pub properties: PropertyMap,
    /// Access-control class, resolved from the source entity when not given
    pub visibility: Visibility,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Relationship {
    /// HIGH or BLOCKING.
    pub fn is_critical(&self) -> bool {
        self.criticality >= Criticality::High
    }

    /// BLOCKING only.
    pub fn is_blocking(&self) -> bool {
        self.criticality == Criticality::Blocking
    }

    /// Get a property value.
    pub fn get_property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }
}

/// Payload for creating an entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewEntity {
    /// Explicit identifier; a UUID v4 is generated when `None`
    pub id: Option<EntityId>,
    /// Open type tag
    pub entity_type: String,
    /// Display name
    pub name: String,
    /// Type-specific attributes
    pub properties: PropertyMap,
    /// Controlling principal
    pub owner: String,
    /// Explicit readers
    pub readers: BTreeSet<String>,
    /// Explicit writers
    pub writers: BTreeSet<String>,
    /// Access-control class
    pub visibility: Visibility,
}

impl NewEntity {
    /// Start a payload with the required fields; visibility defaults to DEPARTMENT.
    pub fn new(
        entity_type: impl Into<String>,
        name: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            name: name.into(),
            owner: owner.into(),
            ..Self::default()
        }
    }

    /// Use an explicit identifier instead of a generated one.
    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the access-control class.
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Replace the property map.
    pub fn with_properties(mut self, properties: PropertyMap) -> Self {
        self.properties = properties;
        self
    }

    /// Add a single property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key, value);
        self
    }

    /// Grant read access to a principal.
    pub fn with_reader(mut self, principal: impl Into<String>) -> Self {
        self.readers.insert(principal.into());
        self
    }

    /// Grant write access to a principal.
    pub fn with_writer(mut self, principal: impl Into<String>) -> Self {
        self.writers.insert(principal.into());
        self
    }
}

/// Payload for appending a relationship to a source entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRelationship {
    /// Open type tag
    pub relationship_type: String,
    /// Referenced entity
    pub target_id: EntityId,
    /// Severity, MEDIUM unless set
    pub criticality: Criticality,
    /// Type-specific attributes
    pub properties: PropertyMap,
    /// Explicit visibility; inherits the source entity's when `None`
    pub visibility: Option<Visibility>,
}

impl NewRelationship {
    /// Start a payload pointing at `target_id`.
    pub fn new(relationship_type: impl Into<String>, target_id: impl Into<EntityId>) -> Self {
        Self {
            relationship_type: relationship_type.into(),
            target_id: target_id.into(),
            criticality: Criticality::default(),
            properties: PropertyMap::new(),
            visibility: None,
        }
    }

    /// Set the criticality.
    pub fn with_criticality(mut self, criticality: Criticality) -> Self {
        self.criticality = criticality;
        self
    }

    /// Override the inherited visibility.
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = Some(visibility);
        self
    }

    /// Add a single property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key, value);
        self
    }
}

/// Partial update of an entity's mutable fields. `None` leaves a field untouched.
///
/// `id`, `entity_type`, `owner` and `created_at` are immutable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityUpdate {
    /// New display name
    pub name: Option<String>,
    /// Replacement property map
    pub properties: Option<PropertyMap>,
    /// Replacement reader set
    pub readers: Option<BTreeSet<String>>,
    /// Replacement writer set
    pub writers: Option<BTreeSet<String>>,
    /// New access-control class
    pub visibility: Option<Visibility>,
}

impl EntityUpdate {
    /// True when applying this update would change nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.properties.is_none()
            && self.readers.is_none()
            && self.writers.is_none()
            && self.visibility.is_none()
    }
}
