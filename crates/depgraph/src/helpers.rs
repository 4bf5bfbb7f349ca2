//! Convenience helpers for common organisational entities and relationships.
//!
//! This module provides higher-level abstractions for the usual vocabulary of
//! a dependency graph: projects, teams, users and skills, linked by
//! `DEPENDS_ON`, `REQUIRES`, `OWNS` and `HAS_SKILL`. Nothing here is special
//! to the engine; these are ordinary entities and relationships.

use crate::error::Result;
use crate::graph::{
    Criticality, DependencyGraph, EntityId, NewEntity, NewRelationship, RelationshipId,
    Visibility,
};

/// Entity type of projects.
pub const PROJECT: &str = "Project";
/// Entity type of teams.
pub const TEAM: &str = "Team";
/// Entity type of users.
pub const USER: &str = "User";
/// Entity type of skills.
pub const SKILL: &str = "Skill";

/// A project or service depends on another.
pub const DEPENDS_ON: &str = "DEPENDS_ON";
/// A project requires a skill.
pub const REQUIRES: &str = "REQUIRES";
/// A team owns a project.
pub const OWNS: &str = "OWNS";
/// A user has a skill.
pub const HAS_SKILL: &str = "HAS_SKILL";

/// Owner recorded on shared catalogue entries such as skills.
pub const SYSTEM_OWNER: &str = "system";

/// Add a project entity.
///
/// Projects are visible to their owning department.
///
/// # Arguments
///
/// * `graph` - The dependency graph
/// * `name` - Project name (e.g., "Payment System")
/// * `owner` - Owning department or team id (e.g., "platform-team")
///
/// # Returns
///
/// The id of the created project.
pub fn add_project(graph: &DependencyGraph, name: &str, owner: &str) -> Result<EntityId> {
    graph.create_entity(NewEntity::new(PROJECT, name, owner).with_visibility(Visibility::Department))
}

/// Add a team entity, visible to everyone.
///
/// # Arguments
///
/// * `graph` - The dependency graph
/// * `name` - Team name
/// * `owner` - Team id used as owner of the team's projects
/// * `size` - Number of team members
pub fn add_team(graph: &DependencyGraph, name: &str, owner: &str, size: i64) -> Result<EntityId> {
    graph.create_entity(
        NewEntity::new(TEAM, name, owner)
            .with_visibility(Visibility::Public)
            .with_property("size", size),
    )
}

/// Add a user entity owned by the user themselves.
///
/// # Arguments
///
/// * `graph` - The dependency graph
/// * `user_id` - Principal id of the user; also the entity owner
/// * `name` - Display name
/// * `email` - Contact address
pub fn add_user(graph: &DependencyGraph, user_id: &str, name: &str, email: &str) -> Result<EntityId> {
    graph.create_entity(
        NewEntity::new(USER, name, user_id)
            .with_visibility(Visibility::Department)
            .with_property("email", email),
    )
}

/// Add a public skill entity owned by [`SYSTEM_OWNER`].
///
/// # Arguments
///
/// * `graph` - The dependency graph
/// * `name` - Skill name (e.g., "Kotlin")
/// * `category` - Skill category (e.g., "Programming Language")
pub fn add_skill(graph: &DependencyGraph, name: &str, category: &str) -> Result<EntityId> {
    graph.create_entity(
        NewEntity::new(SKILL, name, SYSTEM_OWNER)
            .with_visibility(Visibility::Public)
            .with_property("category", category),
    )
}

/// Record that `from` depends on `to`.
///
/// # Returns
///
/// The id of the created `DEPENDS_ON` relationship.
pub fn depends_on(
    graph: &DependencyGraph,
    from: &str,
    to: &str,
    criticality: Criticality,
) -> Result<RelationshipId> {
    graph.add_relationship(
        from,
        NewRelationship::new(DEPENDS_ON, to).with_criticality(criticality),
    )
}

/// Record that `project` requires `skill`.
pub fn requires(
    graph: &DependencyGraph,
    project: &str,
    skill: &str,
    criticality: Criticality,
) -> Result<RelationshipId> {
    graph.add_relationship(
        project,
        NewRelationship::new(REQUIRES, skill).with_criticality(criticality),
    )
}

/// Record that `team` owns `project`.
pub fn owns(graph: &DependencyGraph, team: &str, project: &str) -> Result<RelationshipId> {
    graph.add_relationship(team, NewRelationship::new(OWNS, project))
}

/// Record that `user` has `skill` at the given proficiency level.
pub fn has_skill(
    graph: &DependencyGraph,
    user: &str,
    skill: &str,
    level: &str,
) -> Result<RelationshipId> {
    graph.add_relationship(
        user,
        NewRelationship::new(HAS_SKILL, skill).with_property("level", level),
    )
}

/// Targets of `entity_id`'s outgoing relationships of `relationship_type`,
/// in insertion order. No access control is applied.
///
/// # Errors
///
/// Returns [`crate::GraphError::EntityNotFound`] if the entity doesn't exist.
pub fn related(
    graph: &DependencyGraph,
    entity_id: &str,
    relationship_type: &str,
) -> Result<Vec<EntityId>> {
    let snapshot = graph.snapshot()?;
    Ok(snapshot
        .outgoing(entity_id)?
        .into_iter()
        .filter(|rel| rel.relationship_type == relationship_type)
        .map(|rel| rel.target_id.clone())
        .collect())
}

/// Skills required by a project.
pub fn required_skills(graph: &DependencyGraph, project: &str) -> Result<Vec<EntityId>> {
    related(graph, project, REQUIRES)
}

/// Projects owned by a team.
pub fn owned_projects(graph: &DependencyGraph, team: &str) -> Result<Vec<EntityId>> {
    related(graph, team, OWNS)
}
