//! Type registry collaborator.
//!
//! Entity and relationship types are open strings. The graph never interprets them;
//! it asks a [`TypeRegistry`] to validate a payload before persisting it. Schemas
//! themselves are defined outside the graph.

use super::property::PropertyMap;
use crate::error::{GraphError, Result};
use std::collections::{BTreeSet, HashMap};

/// Validates entity and relationship payloads against externally defined schemas.
pub trait TypeRegistry: Send + Sync {
    /// Validate an entity type and its properties.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidArgument`] when the payload is rejected.
    fn validate_entity(&self, entity_type: &str, properties: &PropertyMap) -> Result<()>;

    /// Validate a relationship type and its properties.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidArgument`] when the payload is rejected.
    fn validate_relationship(&self, relationship_type: &str, properties: &PropertyMap)
        -> Result<()>;
}

/// Accepts every non-empty type name.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenRegistry;

impl TypeRegistry for OpenRegistry {
    fn validate_entity(&self, entity_type: &str, _properties: &PropertyMap) -> Result<()> {
        require_type_name("entity", entity_type)
    }

    fn validate_relationship(
        &self,
        relationship_type: &str,
        _properties: &PropertyMap,
    ) -> Result<()> {
        require_type_name("relationship", relationship_type)
    }
}

/// Registry restricted to declared types, each with a set of required property keys.
#[derive(Debug, Clone, Default)]
pub struct DeclaredTypes {
    entity_types: HashMap<String, BTreeSet<String>>,
    relationship_types: HashMap<String, BTreeSet<String>>,
}

impl DeclaredTypes {
    /// Create an empty registry (rejects everything until types are declared).
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an entity type with the property keys it must carry.
    pub fn entity<I, S>(mut self, entity_type: impl Into<String>, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entity_types.insert(
            entity_type.into(),
            required.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Declare a relationship type with the property keys it must carry.
    pub fn relationship<I, S>(mut self, relationship_type: impl Into<String>, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relationship_types.insert(
            relationship_type.into(),
            required.into_iter().map(Into::into).collect(),
        );
        self
    }

    fn check(
        kind: &str,
        declared: &HashMap<String, BTreeSet<String>>,
        type_name: &str,
        properties: &PropertyMap,
    ) -> Result<()> {
        require_type_name(kind, type_name)?;
        let required = declared.get(type_name).ok_or_else(|| {
            GraphError::invalid_argument(format!("undeclared {kind} type '{type_name}'"))
        })?;
        match required.iter().find(|key| !properties.contains_key(key)) {
            Some(missing) => Err(GraphError::invalid_argument(format!(
                "{kind} type '{type_name}' requires property '{missing}'"
            ))),
            None => Ok(()),
        }
    }
}

impl TypeRegistry for DeclaredTypes {
    fn validate_entity(&self, entity_type: &str, properties: &PropertyMap) -> Result<()> {
        Self::check("entity", &self.entity_types, entity_type, properties)
    }

    fn validate_relationship(
        &self,
        relationship_type: &str,
        properties: &PropertyMap,
    ) -> Result<()> {
        Self::check(
            "relationship",
            &self.relationship_types,
            relationship_type,
            properties,
        )
    }
}

fn require_type_name(kind: &str, type_name: &str) -> Result<()> {
    if type_name.trim().is_empty() {
        return Err(GraphError::invalid_argument(format!(
            "{kind} type must not be empty"
        )));
    }
    Ok(())
}
