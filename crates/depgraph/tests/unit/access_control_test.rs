//! Unit tests for access-controlled query results
//!
//! A caller must never observe an entity it cannot read, whether as a result,
//! an intermediate hop or a cycle member.

use depgraph::{
    Criticality, DependencyGraph, EngineConfig, Entity, GraphError, NewEntity, NewRelationship,
    Principal, QueryContext, QueryEngine, Visibility,
};
use std::sync::Arc;

const SECRET: &str = "secret";

fn add(graph: &DependencyGraph, id: &str, owner: &str, visibility: Visibility) {
    graph
        .create_entity(
            NewEntity::new("Project", id, owner)
                .with_id(id)
                .with_visibility(visibility),
        )
        .unwrap();
}

fn dep(graph: &DependencyGraph, from: &str, to: &str) {
    graph
        .add_relationship(
            from,
            NewRelationship::new("DEPENDS_ON", to)
                .with_criticality(Criticality::High)
                .with_visibility(Visibility::Public),
        )
        .unwrap();
}

/// a -> secret -> c -> a (cycle through a private entity), plus a -> b -> c
/// and x, y both depending on secret.
fn fixture() -> QueryEngine {
    let graph = DependencyGraph::in_memory().unwrap();
    for id in ["a", "b", "c", "x", "y"] {
        add(&graph, id, "u1", Visibility::Public);
    }
    add(&graph, SECRET, "u1", Visibility::Private);

    dep(&graph, "a", SECRET);
    dep(&graph, SECRET, "c");
    dep(&graph, "c", "a");
    dep(&graph, "a", "b");
    dep(&graph, "b", "c");
    dep(&graph, "x", SECRET);
    dep(&graph, "y", SECRET);

    QueryEngine::new(Arc::new(graph), EngineConfig::default()).unwrap()
}

fn outsider() -> Principal {
    Principal::new("u2", "d1")
}

fn owner() -> Principal {
    Principal::new("u1", "d1")
}

fn contains_secret(entities: &[Entity]) -> bool {
    entities.iter().any(|e| e.id == SECRET)
}

#[test]
fn test_private_entity_never_in_dependencies() {
    let engine = fixture();
    let ctx = QueryContext::none();

    let deps = engine.find_dependencies(&outsider(), "a", None, &ctx).unwrap();
    assert!(!contains_secret(&deps));
    // c is still reachable through b
    assert!(deps.iter().any(|e| e.id == "c"));

    let deps = engine.find_dependencies(&owner(), "a", None, &ctx).unwrap();
    assert!(contains_secret(&deps));
}

#[test]
fn test_private_entity_never_in_dependents() {
    let engine = fixture();
    let dependents = engine
        .find_dependents(&outsider(), "c", &QueryContext::none())
        .unwrap();
    let ids: Vec<_> = dependents.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["b"]);
}

#[test]
fn test_private_entity_never_a_bottleneck() {
    let engine = fixture();
    let ctx = QueryContext::none();

    let top = engine.find_bottlenecks(&owner(), Some(1), &ctx).unwrap();
    assert_eq!(top[0].id, SECRET);

    let top = engine.find_bottlenecks(&outsider(), Some(10), &ctx).unwrap();
    assert!(!contains_secret(&top));
    assert!(!top.is_empty());
}

#[test]
fn test_cycles_through_private_entity_hidden() {
    let engine = fixture();
    let ctx = QueryContext::none();

    let all = engine.find_circular_dependencies(&owner(), &ctx).unwrap();
    assert_eq!(all.len(), 2);

    let visible = engine.find_circular_dependencies(&outsider(), &ctx).unwrap();
    assert_eq!(visible.len(), 1);
    let ids: Vec<_> = visible[0].iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn test_dependency_reachable_only_through_private_entity_is_hidden() {
    let graph = DependencyGraph::in_memory().unwrap();
    add(&graph, "a", "u1", Visibility::Public);
    add(&graph, SECRET, "u1", Visibility::Private);
    add(&graph, "c", "u1", Visibility::Public);
    dep(&graph, "a", SECRET);
    dep(&graph, SECRET, "c");
    let engine = QueryEngine::new(Arc::new(graph), EngineConfig::default()).unwrap();
    let ctx = QueryContext::none();

    // c is public, but the only route to it runs through secret
    let deps = engine.find_dependencies(&outsider(), "a", None, &ctx).unwrap();
    assert!(deps.is_empty());
    assert!(engine
        .find_shortest_path(&outsider(), "a", "c", &ctx)
        .unwrap()
        .is_empty());

    let deps = engine.find_dependencies(&owner(), "a", None, &ctx).unwrap();
    let ids: Vec<_> = deps.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec![SECRET, "c"]);
}

#[test]
fn test_cycle_limit_counts_only_visible_cycles() {
    let graph = DependencyGraph::in_memory().unwrap();
    for id in ["a", "x", "y"] {
        add(&graph, id, "u1", Visibility::Public);
    }
    add(&graph, "b", "u1", Visibility::Private);
    dep(&graph, "a", "b");
    dep(&graph, "b", "a");
    dep(&graph, "x", "y");
    dep(&graph, "y", "x");
    let config = EngineConfig::default().with_max_cycles(1);
    let engine = QueryEngine::new(Arc::new(graph), config).unwrap();
    let ctx = QueryContext::none();

    // [a, b] sorts first but the outsider cannot see b, so it must not use up the cap
    let cycles = engine.find_circular_dependencies(&outsider(), &ctx).unwrap();
    assert_eq!(cycles.len(), 1);
    let ids: Vec<_> = cycles[0].iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["x", "y"]);

    let cycles = engine.find_circular_dependencies(&owner(), &ctx).unwrap();
    assert_eq!(cycles.len(), 1);
}

#[test]
fn test_shortest_path_routes_around_private_entity() {
    let engine = fixture();
    let ctx = QueryContext::none();

    let path = engine.find_shortest_path(&owner(), "a", "c", &ctx).unwrap();
    let ids: Vec<_> = path.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["a", SECRET, "c"]);

    let path = engine.find_shortest_path(&outsider(), "a", "c", &ctx).unwrap();
    let ids: Vec<_> = path.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);

    assert!(matches!(
        engine.find_shortest_path(&outsider(), "a", SECRET, &ctx),
        Err(GraphError::EntityNotFound { .. })
    ));
}

#[test]
fn test_private_entity_as_query_root_is_not_found() {
    let engine = fixture();
    let ctx = QueryContext::none();

    assert!(matches!(
        engine.find_dependencies(&outsider(), SECRET, None, &ctx),
        Err(GraphError::EntityNotFound { .. })
    ));
    assert!(matches!(
        engine.get_entity(&outsider(), SECRET),
        Err(GraphError::EntityNotFound { .. })
    ));
}

#[test]
fn test_accessible_entities_by_visibility() {
    let graph = DependencyGraph::in_memory().unwrap();
    add(&graph, "public", "u1", Visibility::Public);
    add(&graph, "dept", "platform", Visibility::Department);
    add(&graph, "other-dept", "finance", Visibility::Department);
    graph
        .create_entity(
            NewEntity::new("Project", "restricted", "u1")
                .with_id("restricted")
                .with_visibility(Visibility::Restricted)
                .with_reader("u2"),
        )
        .unwrap();
    add(&graph, "private", "u1", Visibility::Private);
    let engine = QueryEngine::new(Arc::new(graph), EngineConfig::default()).unwrap();
    let ctx = QueryContext::none();

    let ids = |principal: &Principal| -> Vec<String> {
        engine
            .find_accessible_entities(principal, &ctx)
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect()
    };

    // Id order
    assert_eq!(
        ids(&Principal::new("u2", "platform")),
        vec!["dept", "public", "restricted"]
    );
    assert_eq!(
        ids(&Principal::new("u1", "finance")),
        vec!["other-dept", "private", "public", "restricted"]
    );
    assert_eq!(ids(&Principal::new("u3", "sales")), vec!["public"]);
}

#[test]
fn test_relationship_visibility_is_authoritative() {
    let graph = DependencyGraph::in_memory().unwrap();
    add(&graph, "a", "u1", Visibility::Public);
    add(&graph, "b", "u1", Visibility::Public);
    graph
        .add_relationship(
            "a",
            NewRelationship::new("DEPENDS_ON", "b").with_visibility(Visibility::Restricted),
        )
        .unwrap();
    let engine = QueryEngine::new(Arc::new(graph), EngineConfig::default()).unwrap();
    let ctx = QueryContext::none();

    assert!(engine
        .find_dependents(&outsider(), "b", &ctx)
        .unwrap()
        .is_empty());
    assert_eq!(engine.find_dependents(&owner(), "b", &ctx).unwrap().len(), 1);
}

#[test]
fn test_write_permission() {
    let graph = DependencyGraph::in_memory().unwrap();
    let id = graph
        .create_entity(NewEntity::new("Project", "P", "u1").with_writer("u3"))
        .unwrap();
    let entity = graph.get_entity(&id).unwrap();

    assert!(owner().can_write(&entity));
    assert!(Principal::new("u3", "d9").can_write(&entity));
    assert!(!outsider().can_write(&entity));
}
