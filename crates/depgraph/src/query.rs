//! Query builder for fluent attribute queries.
//!
//! Provides a fluent interface for finding entities by type, owner, property
//! and readability. A query runs against the snapshot it was built from, so
//! repeated executions return the same entities in the same (id) order.

use crate::acl::Principal;
use crate::error::Result;
use crate::graph::{Entity, GraphIndex, PropertyValue};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A filter predicate that can be applied to entities.
type FilterFn = Box<dyn Fn(&Entity) -> bool + Send + Sync>;

/// Fluent query builder over one graph snapshot.
///
/// # Examples
///
/// ```
/// use depgraph::{helpers, DependencyGraph, Principal};
///
/// # fn example() -> depgraph::Result<()> {
/// let graph = DependencyGraph::in_memory()?;
/// helpers::add_project(&graph, "Payment System", "platform-team")?;
/// helpers::add_skill(&graph, "Kotlin", "Programming Language")?;
///
/// let visible_projects = graph
///     .query()?
///     .entity_type(helpers::PROJECT)
///     .readable_by(&Principal::new("alice", "platform-team"))
///     .execute()?;
/// assert_eq!(visible_projects.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct EntityQuery {
    snapshot: Arc<GraphIndex>,
    filters: Vec<FilterFn>,
    limit_value: Option<usize>,
}

impl EntityQuery {
    /// Create a new query over the given snapshot.
    pub fn new(snapshot: Arc<GraphIndex>) -> Self {
        Self {
            snapshot,
            filters: Vec::new(),
            limit_value: None,
        }
    }

    /// Filter entities by type tag.
    pub fn entity_type(mut self, entity_type: &str) -> Self {
        let entity_type = entity_type.to_string();
        self.filters
            .push(Box::new(move |entity| entity.entity_type == entity_type));
        self
    }

    /// Filter entities by owner.
    pub fn owner(mut self, owner: &str) -> Self {
        let owner = owner.to_string();
        self.filters.push(Box::new(move |entity| entity.owner == owner));
        self
    }

    /// Filter entities by exact property match.
    ///
    /// Floats compare within `f64::EPSILON`; values of different variants never match.
    pub fn property<V: Into<PropertyValue>>(mut self, key: &str, value: V) -> Self {
        let key = key.to_string();
        let value = value.into();

        self.filters.push(Box::new(move |entity| {
            match (&value, entity.properties.get(&key)) {
                (PropertyValue::Float(v1), Some(PropertyValue::Float(v2))) => {
                    (v1 - v2).abs() < f64::EPSILON
                }
                (expected, Some(actual)) => expected == actual,
                (_, None) => false,
            }
        }));
        self
    }

    /// Filter entities that have a specific property (regardless of value).
    pub fn property_exists(mut self, key: &str) -> Self {
        let key = key.to_string();
        self.filters
            .push(Box::new(move |entity| entity.properties.contains_key(&key)));
        self
    }

    /// Filter entities by name containing a substring (case-insensitive).
    pub fn name_contains(mut self, substring: &str) -> Self {
        let substring = substring.to_lowercase();
        self.filters.push(Box::new(move |entity| {
            entity.name.to_lowercase().contains(&substring)
        }));
        self
    }

    /// Keep only entities `principal` may read.
    pub fn readable_by(mut self, principal: &Principal) -> Self {
        let principal = principal.clone();
        self.filters
            .push(Box::new(move |entity| principal.can_read(entity)));
        self
    }

    /// Filter entities using a custom predicate function.
    pub fn custom<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Entity) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Box::new(predicate));
        self
    }

    /// Limit the number of results returned.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit_value = Some(n);
        self
    }

    /// Execute the query and return matching entities in id order.
    pub fn execute(&self) -> Result<Vec<Entity>> {
        let limit = self.limit_value.unwrap_or(usize::MAX);
        Ok(self
            .matching()
            .take(limit)
            .cloned()
            .collect())
    }

    /// Count the matching entities without cloning them. The limit applies.
    pub fn count(&self) -> Result<usize> {
        let limit = self.limit_value.unwrap_or(usize::MAX);
        Ok(self.matching().take(limit).count())
    }

    /// Check if any entity matches the query (short-circuits on first match).
    pub fn exists(&self) -> Result<bool> {
        Ok(self.matching().next().is_some())
    }

    fn matching(&self) -> impl Iterator<Item = &Entity> {
        self.snapshot
            .entities()
            .filter(|entity| self.filters.iter().all(|filter| filter(entity)))
    }
}

/// Number of entities per type tag in a snapshot.
pub fn count_by_type(snapshot: &GraphIndex) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for entity in snapshot.entities() {
        *counts.entry(entity.entity_type.clone()).or_insert(0) += 1;
    }
    counts
}
