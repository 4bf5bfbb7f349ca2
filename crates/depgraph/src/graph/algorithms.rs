//! Graph traversal and analysis algorithms.
//!
//! Every algorithm runs against one immutable [`GraphIndex`] snapshot and takes
//! the edges to follow as a predicate, so none of them knows any relationship
//! type by name. All of them poll the [`QueryContext`] once per expanded entity.
//!
//! Ordering is deterministic: entities are scanned in id order and each
//! entity's relationships in insertion order.

use super::index::GraphIndex;
use super::types::{Entity, Relationship};
use crate::cancel::QueryContext;
use crate::error::{GraphError, Result};
use log::trace;
use std::collections::{HashMap, HashSet, VecDeque};

/// An entity together with the number of qualifying incoming relationships.
#[derive(Debug, Clone, PartialEq)]
pub struct Bottleneck<'a> {
    /// The depended-upon entity
    pub entity: &'a Entity,
    /// Number of incoming relationships that matched the predicate
    pub dependent_count: usize,
}

/// Length limits and output cap for cycle detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleBounds {
    /// Shortest cycle reported (in edges)
    pub min_length: usize,
    /// Longest cycle reported (in edges); also the DFS depth bound
    pub max_length: usize,
    /// Stop after this many distinct cycles
    pub max_cycles: usize,
}

impl Default for CycleBounds {
    fn default() -> Self {
        Self {
            min_length: 2,
            max_length: 10,
            max_cycles: 100,
        }
    }
}

/// Breadth-first dependency closure.
///
/// Returns every distinct entity reachable from `start` over relationships
/// accepted by `follow` and through entities accepted by `admit`, within
/// `max_depth` hops (depth 1 = direct dependencies), in discovery order. A
/// rejected entity is neither returned nor expanded, so nothing behind it is
/// reached through it. `start` itself is never part of the result, even when
/// a cycle leads back to it.
///
/// # Errors
///
/// - [`GraphError::InvalidArgument`] if `max_depth` is zero
/// - [`GraphError::EntityNotFound`] if `start` doesn't exist or is rejected by `admit`
/// - [`GraphError::Cancelled`] if `ctx` fires
pub fn find_dependencies<'a, F, N>(
    index: &'a GraphIndex,
    start: &str,
    max_depth: usize,
    follow: F,
    admit: N,
    ctx: &QueryContext,
) -> Result<Vec<&'a Entity>>
where
    F: Fn(&Relationship) -> bool,
    N: Fn(&Entity) -> bool,
{
    if max_depth == 0 {
        return Err(GraphError::invalid_argument(
            "depth must be at least 1 (depth 1 = direct dependencies)",
        ));
    }
    let origin = index.get(start).and_then(|e| admitted(e, &admit))?;

    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<(&str, usize)> = VecDeque::new();
    let mut result = Vec::new();

    visited.insert(origin.id.as_str());
    queue.push_back((origin.id.as_str(), 0));

    while let Some((current, depth)) = queue.pop_front() {
        ctx.check()?;
        if depth >= max_depth {
            continue;
        }

        for rel in index.outgoing(current)? {
            if !follow(rel) {
                continue;
            }
            let target = index.endpoint(&rel.target_id)?;
            if !admit(target) {
                continue;
            }
            if visited.insert(target.id.as_str()) {
                result.push(target);
                queue.push_back((target.id.as_str(), depth + 1));
            }
        }
    }

    trace!("Dependency closure of {start} at depth {max_depth}: {} entities", result.len());
    Ok(result)
}

/// Single-hop reverse lookup: sources of relationships accepted by `follow`
/// that point at `target`.
///
/// Each source appears once, in the order of its first qualifying relationship.
///
/// # Errors
///
/// - [`GraphError::EntityNotFound`] if `target` doesn't exist
/// - [`GraphError::Cancelled`] if `ctx` fires
pub fn find_dependents<'a, F>(
    index: &'a GraphIndex,
    target: &str,
    follow: F,
    ctx: &QueryContext,
) -> Result<Vec<&'a Entity>>
where
    F: Fn(&Relationship) -> bool,
{
    ctx.check()?;
    let mut seen: HashSet<&str> = HashSet::new();
    let mut result = Vec::new();

    for rel in index.incoming(target)? {
        if !follow(rel) {
            continue;
        }
        let source = index.endpoint(&rel.source_id)?;
        if seen.insert(source.id.as_str()) {
            result.push(source);
        }
    }

    Ok(result)
}

/// Rank every entity by the number of incoming relationships accepted by `count`.
///
/// Entities with no qualifying relationship are left out. Order: count
/// descending, then entity id ascending.
///
/// # Errors
///
/// - [`GraphError::Cancelled`] if `ctx` fires
pub fn rank_bottlenecks<'a, F>(
    index: &'a GraphIndex,
    count: F,
    ctx: &QueryContext,
) -> Result<Vec<Bottleneck<'a>>>
where
    F: Fn(&Relationship) -> bool,
{
    let mut ranking = Vec::new();
    for entity in index.entities() {
        ctx.check()?;
        let dependent_count = index
            .incoming(&entity.id)?
            .into_iter()
            .filter(|rel| count(rel))
            .count();
        if dependent_count > 0 {
            ranking.push(Bottleneck {
                entity,
                dependent_count,
            });
        }
    }

    ranking.sort_by(|a, b| {
        b.dependent_count
            .cmp(&a.dependent_count)
            .then_with(|| a.entity.id.cmp(&b.entity.id))
    });
    Ok(ranking)
}

/// The top `limit` entries of [`rank_bottlenecks`].
///
/// # Errors
///
/// - [`GraphError::InvalidArgument`] if `limit` is zero
/// - [`GraphError::Cancelled`] if `ctx` fires
pub fn find_bottlenecks<'a, F>(
    index: &'a GraphIndex,
    limit: usize,
    count: F,
    ctx: &QueryContext,
) -> Result<Vec<Bottleneck<'a>>>
where
    F: Fn(&Relationship) -> bool,
{
    validate_limit(limit)?;
    let mut ranking = rank_bottlenecks(index, count, ctx)?;
    ranking.truncate(limit);
    Ok(ranking)
}

/// Reject a non-positive result limit.
pub fn validate_limit(limit: usize) -> Result<()> {
    if limit == 0 {
        return Err(GraphError::invalid_argument("limit must be positive, got 0"));
    }
    Ok(())
}

/// Detect simple cycles over relationships accepted by `follow`, through
/// entities accepted by `admit`.
///
/// Every admitted entity is tried as a start, in id order, with a
/// depth-limited DFS that never revisits an entity already on the current
/// path and never steps onto a rejected entity, so `max_cycles` only counts
/// cycles made entirely of admitted entities. A cycle is
/// recorded when the DFS steps back onto its start. Each cycle is rotated to
/// begin at its smallest id and deduplicated on that form, so rotations and
/// parallel relationships yield one result. Cycles are returned in that
/// canonical rotation, without repeating the first entity at the end.
///
/// # Errors
///
/// - [`GraphError::Cancelled`] if `ctx` fires
/// - [`GraphError::Internal`] if the index holds a dangling relationship
pub fn find_circular_dependencies<'a, F, N>(
    index: &'a GraphIndex,
    follow: F,
    admit: N,
    bounds: CycleBounds,
    ctx: &QueryContext,
) -> Result<Vec<Vec<&'a Entity>>>
where
    F: Fn(&Relationship) -> bool,
    N: Fn(&Entity) -> bool,
{
    let mut search = CycleSearch {
        index,
        follow: &follow,
        admit: &admit,
        bounds,
        ctx,
        seen: HashSet::new(),
        cycles: Vec::new(),
    };

    for entity in index.entities() {
        if search.is_full() {
            break;
        }
        if !admit(entity) {
            continue;
        }
        let start = entity.id.as_str();
        let mut path = vec![start];
        let mut on_path: HashSet<&str> = HashSet::from([start]);
        search.extend(start, &mut path, &mut on_path)?;
    }

    trace!("Cycle search found {} cycles", search.cycles.len());
    search
        .cycles
        .into_iter()
        .map(|cycle| cycle.into_iter().map(|id| index.endpoint(id)).collect())
        .collect()
}

/// Rotate a cycle so it begins at its smallest id.
///
/// Rotations of one cycle share a canonical form; different traversal
/// directions over the same members do not.
pub fn canonical_rotation<'a>(cycle: &[&'a str]) -> Vec<&'a str> {
    let Some(min_pos) = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, id)| **id)
        .map(|(pos, _)| pos)
    else {
        return Vec::new();
    };
    let mut rotated = cycle.to_vec();
    rotated.rotate_left(min_pos);
    rotated
}

struct CycleSearch<'a, 'c, F, N> {
    index: &'a GraphIndex,
    follow: &'c F,
    admit: &'c N,
    bounds: CycleBounds,
    ctx: &'c QueryContext,
    seen: HashSet<Vec<&'a str>>,
    cycles: Vec<Vec<&'a str>>,
}

impl<'a, 'c, F, N> CycleSearch<'a, 'c, F, N>
where
    F: Fn(&Relationship) -> bool,
    N: Fn(&Entity) -> bool,
{
    fn is_full(&self) -> bool {
        self.cycles.len() >= self.bounds.max_cycles
    }

    /// DFS step from the last entity of `path`. `path[0]` is the start.
    fn extend(
        &mut self,
        current: &'a str,
        path: &mut Vec<&'a str>,
        on_path: &mut HashSet<&'a str>,
    ) -> Result<()> {
        self.ctx.check()?;
        let start = path[0];

        for rel in self.index.outgoing(current)? {
            if self.is_full() {
                return Ok(());
            }
            if !(self.follow)(rel) {
                continue;
            }
            let next_entity = self.index.endpoint(&rel.target_id)?;
            if !(self.admit)(next_entity) {
                continue;
            }
            let next = next_entity.id.as_str();

            if next == start {
                if path.len() >= self.bounds.min_length {
                    let canonical = canonical_rotation(path);
                    if self.seen.insert(canonical.clone()) {
                        self.cycles.push(canonical);
                    }
                }
                continue;
            }
            // Cycles through an id smaller than the start were reported from that id
            if next < start || path.len() >= self.bounds.max_length || on_path.contains(next) {
                continue;
            }

            path.push(next);
            on_path.insert(next);
            self.extend(next, path, on_path)?;
            on_path.remove(next);
            path.pop();
        }

        Ok(())
    }
}

/// Unweighted shortest path from `source` to `target` over relationships
/// accepted by `follow`, through entities accepted by `admit`.
///
/// BFS with parent pointers; among equally short paths the one discovered
/// first (insertion order) wins. The path includes both endpoints. An empty
/// path means no path exists. For `source == target` the result is the
/// one-edge self-loop `[source, source]` if one is followable, otherwise empty.
///
/// # Errors
///
/// - [`GraphError::EntityNotFound`] if either endpoint doesn't exist or is
///   rejected by `admit`
/// - [`GraphError::Cancelled`] if `ctx` fires
pub fn find_shortest_path<'a, F, N>(
    index: &'a GraphIndex,
    source: &str,
    target: &str,
    follow: F,
    admit: N,
    ctx: &QueryContext,
) -> Result<Vec<&'a Entity>>
where
    F: Fn(&Relationship) -> bool,
    N: Fn(&Entity) -> bool,
{
    let from = index.get(source).and_then(|e| admitted(e, &admit))?;
    let to = index.get(target).and_then(|e| admitted(e, &admit))?;

    if from.id == to.id {
        let has_loop = index
            .outgoing(&from.id)?
            .into_iter()
            .any(|rel| rel.target_id == from.id && follow(rel));
        return Ok(if has_loop { vec![from, from] } else { Vec::new() });
    }

    let mut parents: HashMap<&str, &str> = HashMap::new();
    let mut visited: HashSet<&str> = HashSet::from([from.id.as_str()]);
    let mut queue: VecDeque<&str> = VecDeque::from([from.id.as_str()]);

    while let Some(current) = queue.pop_front() {
        ctx.check()?;
        for rel in index.outgoing(current)? {
            if !follow(rel) {
                continue;
            }
            let next = index.endpoint(&rel.target_id)?;
            let next_id = next.id.as_str();
            if visited.contains(next_id) || !admit(next) {
                continue;
            }
            visited.insert(next_id);
            parents.insert(next_id, current);

            if next_id == to.id {
                return reconstruct(index, &parents, from.id.as_str(), next_id);
            }
            queue.push_back(next_id);
        }
    }

    Ok(Vec::new())
}

fn admitted<'a, N>(entity: &'a Entity, admit: &N) -> Result<&'a Entity>
where
    N: Fn(&Entity) -> bool,
{
    if admit(entity) {
        Ok(entity)
    } else {
        Err(GraphError::entity_not_found(entity.id.as_str()))
    }
}

fn reconstruct<'a>(
    index: &'a GraphIndex,
    parents: &HashMap<&str, &str>,
    source: &str,
    target: &str,
) -> Result<Vec<&'a Entity>> {
    let mut ids = vec![target];
    let mut current = target;
    while current != source {
        current = parents.get(current).copied().ok_or_else(|| {
            GraphError::internal(format!("broken parent chain at {current}"))
        })?;
        ids.push(current);
    }
    ids.reverse();
    ids.into_iter().map(|id| index.endpoint(id)).collect()
}
