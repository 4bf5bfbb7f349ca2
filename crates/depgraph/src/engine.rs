//! The ACL-aware query surface.
//!
//! Each call takes exactly one snapshot from the [`DependencyGraph`] and runs to
//! completion against it, so a concurrent mutation is either fully visible or
//! not visible at all. Results are filtered for the calling [`Principal`]
//! before they are returned.

use crate::acl::{AccessFilter, Principal};
use crate::cancel::QueryContext;
use crate::config::EngineConfig;
use crate::error::{GraphError, Result};
use crate::graph::algorithms::{self, CycleBounds};
use crate::graph::{DependencyGraph, Entity, GraphIndex, Relationship};
use log::debug;
use std::sync::Arc;

/// Read-only dependency queries on behalf of a principal.
///
/// # Examples
///
/// ```
/// use depgraph::{helpers, DependencyGraph, EngineConfig, Principal, QueryContext, QueryEngine};
/// use std::sync::Arc;
///
/// # fn example() -> depgraph::Result<()> {
/// let graph = Arc::new(DependencyGraph::in_memory()?);
/// let api = helpers::add_project(&graph, "api", "platform")?;
/// let db = helpers::add_project(&graph, "db", "platform")?;
/// helpers::depends_on(&graph, &api, &db, depgraph::Criticality::High)?;
///
/// let engine = QueryEngine::new(graph, EngineConfig::default())?;
/// let caller = Principal::new("alice", "platform");
/// let deps = engine.find_dependencies(&caller, &api, None, &QueryContext::none())?;
/// assert_eq!(deps.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct QueryEngine {
    graph: Arc<DependencyGraph>,
    config: EngineConfig,
}

impl QueryEngine {
    /// Create an engine over a shared graph.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidArgument`] if `config` fails validation.
    pub fn new(graph: Arc<DependencyGraph>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { graph, config })
    }

    /// The underlying graph.
    pub fn graph(&self) -> &Arc<DependencyGraph> {
        &self.graph
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Look up one entity the principal may read.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::EntityNotFound`] if the entity doesn't exist or
    /// the principal cannot read it.
    pub fn get_entity(&self, principal: &Principal, id: &str) -> Result<Entity> {
        let snapshot = self.graph.snapshot()?;
        readable(&snapshot, principal, id).cloned()
    }

    /// Transitive dependencies of `entity_id`, in BFS discovery order.
    ///
    /// Only entities the principal can read are walked through, so an entity
    /// reachable solely behind an unreadable one is not returned.
    /// `depth` defaults to [`EngineConfig::default_depth`].
    ///
    /// # Errors
    ///
    /// - [`GraphError::EntityNotFound`] if the start entity doesn't exist or is unreadable
    /// - [`GraphError::InvalidArgument`] for a depth of zero
    /// - [`GraphError::Cancelled`] if `ctx` fires
    pub fn find_dependencies(
        &self,
        principal: &Principal,
        entity_id: &str,
        depth: Option<usize>,
        ctx: &QueryContext,
    ) -> Result<Vec<Entity>> {
        let depth = depth.unwrap_or(self.config.default_depth);
        debug!("find_dependencies({entity_id}, depth={depth}) for {}", principal.id);

        let snapshot = self.graph.snapshot()?;
        readable(&snapshot, principal, entity_id)?;
        let found = algorithms::find_dependencies(
            &snapshot,
            entity_id,
            depth,
            self.follows(&snapshot, principal),
            |entity| principal.can_read(entity),
            ctx,
        )?;
        Ok(owned(found))
    }

    /// Entities with a direct dependency on `entity_id`.
    ///
    /// # Errors
    ///
    /// - [`GraphError::EntityNotFound`] if the entity doesn't exist or is unreadable
    /// - [`GraphError::Cancelled`] if `ctx` fires
    pub fn find_dependents(
        &self,
        principal: &Principal,
        entity_id: &str,
        ctx: &QueryContext,
    ) -> Result<Vec<Entity>> {
        debug!("find_dependents({entity_id}) for {}", principal.id);

        let snapshot = self.graph.snapshot()?;
        readable(&snapshot, principal, entity_id)?;
        let found = algorithms::find_dependents(
            &snapshot,
            entity_id,
            self.follows(&snapshot, principal),
            ctx,
        )?;
        Ok(AccessFilter::new(principal).entities(owned(found)))
    }

    /// Entities most depended upon through relationships at or above the
    /// configured criticality threshold.
    ///
    /// `limit` defaults to [`EngineConfig::default_bottleneck_limit`] and is
    /// applied after unreadable entities are removed.
    ///
    /// # Errors
    ///
    /// - [`GraphError::InvalidArgument`] for a limit of zero
    /// - [`GraphError::Cancelled`] if `ctx` fires
    pub fn find_bottlenecks(
        &self,
        principal: &Principal,
        limit: Option<usize>,
        ctx: &QueryContext,
    ) -> Result<Vec<Entity>> {
        let limit = limit.unwrap_or(self.config.default_bottleneck_limit);
        algorithms::validate_limit(limit)?;
        debug!("find_bottlenecks(limit={limit}) for {}", principal.id);

        let snapshot = self.graph.snapshot()?;
        let follows = self.follows(&snapshot, principal);
        let threshold = self.config.bottleneck_threshold;
        let ranking = algorithms::rank_bottlenecks(
            &snapshot,
            |rel| rel.criticality >= threshold && follows(rel),
            ctx,
        )?;

        let ranked = ranking.into_iter().map(|b| b.entity.clone()).collect();
        let mut visible = AccessFilter::new(principal).entities(ranked);
        visible.truncate(limit);
        Ok(visible)
    }

    /// Simple dependency cycles within the configured length bounds, each in
    /// canonical rotation. Cycles through an unreadable entity are left out
    /// and do not count towards [`EngineConfig::max_cycles`].
    ///
    /// # Errors
    ///
    /// - [`GraphError::Cancelled`] if `ctx` fires
    pub fn find_circular_dependencies(
        &self,
        principal: &Principal,
        ctx: &QueryContext,
    ) -> Result<Vec<Vec<Entity>>> {
        debug!("find_circular_dependencies for {}", principal.id);

        let snapshot = self.graph.snapshot()?;
        let cycles = algorithms::find_circular_dependencies(
            &snapshot,
            self.follows(&snapshot, principal),
            |entity| principal.can_read(entity),
            self.cycle_bounds(),
            ctx,
        )?;
        Ok(cycles.into_iter().map(owned).collect())
    }

    /// Fewest-hop dependency path from `source_id` to `target_id` through
    /// entities the principal can read. Empty if there is none.
    ///
    /// # Errors
    ///
    /// - [`GraphError::EntityNotFound`] if either endpoint doesn't exist or is unreadable
    /// - [`GraphError::Cancelled`] if `ctx` fires
    pub fn find_shortest_path(
        &self,
        principal: &Principal,
        source_id: &str,
        target_id: &str,
        ctx: &QueryContext,
    ) -> Result<Vec<Entity>> {
        debug!("find_shortest_path({source_id} -> {target_id}) for {}", principal.id);

        let snapshot = self.graph.snapshot()?;
        let path = algorithms::find_shortest_path(
            &snapshot,
            source_id,
            target_id,
            self.follows(&snapshot, principal),
            |entity| principal.can_read(entity),
            ctx,
        )?;
        Ok(owned(path))
    }

    /// Every entity the principal may read, in id order.
    ///
    /// # Errors
    ///
    /// - [`GraphError::Cancelled`] if `ctx` fires
    pub fn find_accessible_entities(
        &self,
        principal: &Principal,
        ctx: &QueryContext,
    ) -> Result<Vec<Entity>> {
        debug!("find_accessible_entities for {}", principal.id);

        let snapshot = self.graph.snapshot()?;
        let mut visible = Vec::new();
        for entity in snapshot.entities() {
            ctx.check()?;
            if principal.can_read(entity) {
                visible.push(entity.clone());
            }
        }
        Ok(visible)
    }

    /// Relationships the engine follows for `principal`: the configured
    /// dependency type, readable under its own visibility.
    fn follows<'s>(
        &'s self,
        snapshot: &'s GraphIndex,
        principal: &'s Principal,
    ) -> impl Fn(&Relationship) -> bool + 's {
        move |rel| {
            rel.relationship_type == self.config.dependency_type
                && snapshot
                    .get(&rel.source_id)
                    .is_ok_and(|source| principal.can_read_relationship(rel, source))
        }
    }

    fn cycle_bounds(&self) -> CycleBounds {
        CycleBounds {
            min_length: self.config.min_cycle_length,
            max_length: self.config.max_cycle_length,
            max_cycles: self.config.max_cycles,
        }
    }
}

fn readable<'a>(snapshot: &'a GraphIndex, principal: &Principal, id: &str) -> Result<&'a Entity> {
    let entity = snapshot.get(id)?;
    if principal.can_read(entity) {
        Ok(entity)
    } else {
        Err(GraphError::entity_not_found(id))
    }
}

fn owned(entities: Vec<&Entity>) -> Vec<Entity> {
    entities.into_iter().cloned().collect()
}
