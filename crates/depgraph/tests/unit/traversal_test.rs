//! Unit tests for the dependency queries
//!
//! These tests drive the traversal algorithms through the QueryEngine with a
//! caller that can read everything, so results are unfiltered.

use depgraph::{
    Criticality, DependencyGraph, EngineConfig, Entity, GraphError, NewEntity, NewRelationship,
    Principal, QueryContext, QueryEngine, Visibility,
};
use std::sync::Arc;

fn graph_with(ids: &[&str]) -> DependencyGraph {
    let graph = DependencyGraph::in_memory().unwrap();
    for id in ids {
        graph
            .create_entity(
                NewEntity::new("Project", id.to_uppercase(), "platform")
                    .with_id(*id)
                    .with_visibility(Visibility::Public),
            )
            .unwrap();
    }
    graph
}

fn dep(graph: &DependencyGraph, from: &str, to: &str) {
    dep_with(graph, from, to, Criticality::Medium);
}

fn dep_with(graph: &DependencyGraph, from: &str, to: &str, criticality: Criticality) {
    graph
        .add_relationship(
            from,
            NewRelationship::new("DEPENDS_ON", to).with_criticality(criticality),
        )
        .unwrap();
}

fn engine(graph: DependencyGraph) -> QueryEngine {
    QueryEngine::new(Arc::new(graph), EngineConfig::default()).unwrap()
}

fn caller() -> Principal {
    Principal::new("reader", "platform")
}

fn ids(entities: &[Entity]) -> Vec<&str> {
    entities.iter().map(|e| e.id.as_str()).collect()
}

#[test]
fn test_direct_edge_visible_both_ways() {
    let graph = graph_with(&["a", "b"]);
    dep(&graph, "a", "b");
    let engine = engine(graph);
    let ctx = QueryContext::none();

    let deps = engine.find_dependencies(&caller(), "a", Some(1), &ctx).unwrap();
    assert_eq!(ids(&deps), vec!["b"]);

    let dependents = engine.find_dependents(&caller(), "b", &ctx).unwrap();
    assert_eq!(ids(&dependents), vec!["a"]);
}

#[test]
fn test_dependencies_in_bfs_order() {
    let graph = graph_with(&["root", "x", "y", "x1", "y1", "deep"]);
    dep(&graph, "root", "y");
    dep(&graph, "root", "x");
    dep(&graph, "x", "x1");
    dep(&graph, "y", "y1");
    dep(&graph, "x1", "deep");
    let engine = engine(graph);
    let ctx = QueryContext::none();

    let deps = engine.find_dependencies(&caller(), "root", Some(2), &ctx).unwrap();
    // Insertion order at each node, level by level
    assert_eq!(ids(&deps), vec!["y", "x", "y1", "x1"]);

    let deps = engine.find_dependencies(&caller(), "root", None, &ctx).unwrap();
    assert_eq!(deps.len(), 5);
}

#[test]
fn test_default_depth_comes_from_config() {
    let graph = graph_with(&["a", "b", "c", "d"]);
    dep(&graph, "a", "b");
    dep(&graph, "b", "c");
    dep(&graph, "c", "d");
    let config = EngineConfig::default().with_default_depth(2);
    let engine = QueryEngine::new(Arc::new(graph), config).unwrap();

    let deps = engine
        .find_dependencies(&caller(), "a", None, &QueryContext::none())
        .unwrap();
    assert_eq!(ids(&deps), vec!["b", "c"]);
}

#[test]
fn test_dependencies_errors() {
    let engine = engine(graph_with(&["a"]));
    let ctx = QueryContext::none();

    assert!(matches!(
        engine.find_dependencies(&caller(), "missing", None, &ctx),
        Err(GraphError::EntityNotFound { .. })
    ));
    assert!(matches!(
        engine.find_dependencies(&caller(), "a", Some(0), &ctx),
        Err(GraphError::InvalidArgument { .. })
    ));
    assert!(matches!(
        engine.find_dependents(&caller(), "missing", &ctx),
        Err(GraphError::EntityNotFound { .. })
    ));
}

#[test]
fn test_dependents_not_transitive() {
    let graph = graph_with(&["a", "b", "c"]);
    dep(&graph, "a", "b");
    dep(&graph, "b", "c");
    let engine = engine(graph);

    let dependents = engine
        .find_dependents(&caller(), "c", &QueryContext::none())
        .unwrap();
    assert_eq!(ids(&dependents), vec!["b"]);

    let none = engine
        .find_dependents(&caller(), "a", &QueryContext::none())
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_bottleneck_ranking() {
    let graph = graph_with(&["p1", "p2", "p3", "x", "y"]);
    dep_with(&graph, "p1", "x", Criticality::High);
    dep_with(&graph, "p2", "x", Criticality::Blocking);
    dep_with(&graph, "p3", "x", Criticality::High);
    dep_with(&graph, "p1", "y", Criticality::Blocking);
    dep_with(&graph, "p2", "y", Criticality::High);
    // Below the threshold, not counted
    dep_with(&graph, "p3", "y", Criticality::Medium);
    dep_with(&graph, "x", "p1", Criticality::Low);
    let engine = engine(graph);
    let ctx = QueryContext::none();

    let top = engine.find_bottlenecks(&caller(), Some(10), &ctx).unwrap();
    assert_eq!(ids(&top), vec!["x", "y"]);

    let top = engine.find_bottlenecks(&caller(), None, &ctx).unwrap();
    assert_eq!(ids(&top), vec!["x", "y"]);

    let top = engine.find_bottlenecks(&caller(), Some(1), &ctx).unwrap();
    assert_eq!(ids(&top), vec!["x"]);

    assert!(matches!(
        engine.find_bottlenecks(&caller(), Some(0), &ctx),
        Err(GraphError::InvalidArgument { .. })
    ));
}

#[test]
fn test_bottleneck_threshold_configurable() {
    let graph = graph_with(&["a", "b"]);
    dep_with(&graph, "a", "b", Criticality::High);
    let config = EngineConfig::default().with_bottleneck_threshold(Criticality::Blocking);
    let engine = QueryEngine::new(Arc::new(graph), config).unwrap();

    let top = engine
        .find_bottlenecks(&caller(), None, &QueryContext::none())
        .unwrap();
    assert!(top.is_empty());
}

#[test]
fn test_single_cycle_found_once() {
    // Created in an order where no member is the first entity scanned
    let graph = graph_with(&["c", "b", "a", "z"]);
    dep(&graph, "c", "a");
    dep(&graph, "b", "c");
    dep(&graph, "a", "b");
    dep(&graph, "z", "a");
    let engine = engine(graph);

    let cycles = engine
        .find_circular_dependencies(&caller(), &QueryContext::none())
        .unwrap();
    assert_eq!(cycles.len(), 1);
    assert_eq!(ids(&cycles[0]), vec!["a", "b", "c"]);
}

#[test]
fn test_opposite_directions_are_distinct_cycles() {
    let graph = graph_with(&["a", "b", "c"]);
    dep(&graph, "a", "b");
    dep(&graph, "b", "c");
    dep(&graph, "c", "a");
    dep(&graph, "a", "c");
    dep(&graph, "c", "b");
    dep(&graph, "b", "a");
    let engine = engine(graph);

    let cycles = engine
        .find_circular_dependencies(&caller(), &QueryContext::none())
        .unwrap();
    let mut found: Vec<Vec<&str>> = cycles.iter().map(|c| ids(c)).collect();
    found.sort();
    assert_eq!(
        found,
        vec![
            vec!["a", "b"],
            vec!["a", "b", "c"],
            vec!["a", "c"],
            vec!["a", "c", "b"],
            vec!["b", "c"],
        ]
    );
}

#[test]
fn test_cycle_length_limit() {
    let names: Vec<String> = (0..12).map(|i| format!("n{i:02}")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let graph = graph_with(&refs);
    for pair in refs.windows(2) {
        dep(&graph, pair[0], pair[1]);
    }
    dep(&graph, refs[11], refs[0]);
    let engine = engine(graph);

    // A 12-cycle exceeds the default bound of 10
    let cycles = engine
        .find_circular_dependencies(&caller(), &QueryContext::none())
        .unwrap();
    assert!(cycles.is_empty());
}

#[test]
fn test_self_loop_is_not_a_cycle() {
    let graph = graph_with(&["a"]);
    dep(&graph, "a", "a");
    let engine = engine(graph);
    let ctx = QueryContext::none();

    assert!(engine
        .find_circular_dependencies(&caller(), &ctx)
        .unwrap()
        .is_empty());
    let path = engine.find_shortest_path(&caller(), "a", "a", &ctx).unwrap();
    assert_eq!(ids(&path), vec!["a", "a"]);
}

#[test]
fn test_shortest_path() {
    let graph = graph_with(&["a", "b", "c", "c2", "d", "island"]);
    dep(&graph, "a", "c");
    dep(&graph, "c", "c2");
    dep(&graph, "c2", "d");
    dep(&graph, "a", "b");
    dep(&graph, "b", "d");
    let engine = engine(graph);
    let ctx = QueryContext::none();

    let path = engine.find_shortest_path(&caller(), "a", "d", &ctx).unwrap();
    assert_eq!(ids(&path), vec!["a", "b", "d"]);

    // Edges are directed
    assert!(engine
        .find_shortest_path(&caller(), "d", "a", &ctx)
        .unwrap()
        .is_empty());
    assert!(engine
        .find_shortest_path(&caller(), "a", "island", &ctx)
        .unwrap()
        .is_empty());
    assert!(engine
        .find_shortest_path(&caller(), "a", "a", &ctx)
        .unwrap()
        .is_empty());
    assert!(matches!(
        engine.find_shortest_path(&caller(), "ghost", "a", &ctx),
        Err(GraphError::EntityNotFound { .. })
    ));
    assert!(matches!(
        engine.find_shortest_path(&caller(), "a", "ghost", &ctx),
        Err(GraphError::EntityNotFound { .. })
    ));
}

#[test]
fn test_custom_dependency_type() {
    let graph = graph_with(&["svc", "lib"]);
    graph
        .add_relationship("svc", NewRelationship::new("REQUIRES", "lib"))
        .unwrap();
    let config = EngineConfig::default().with_dependency_type("REQUIRES");
    let engine = QueryEngine::new(Arc::new(graph), config).unwrap();

    let deps = engine
        .find_dependencies(&caller(), "svc", None, &QueryContext::none())
        .unwrap();
    assert_eq!(ids(&deps), vec!["lib"]);
}

#[test]
fn test_cancelled_queries_return_no_partial_result() {
    let graph = graph_with(&["a", "b"]);
    dep(&graph, "a", "b");
    dep(&graph, "b", "a");
    let engine = engine(graph);

    let token = depgraph::CancellationToken::new();
    token.cancel();
    let ctx = QueryContext::with_token(token);

    assert!(matches!(
        engine.find_dependencies(&caller(), "a", None, &ctx),
        Err(GraphError::Cancelled)
    ));
    assert!(matches!(
        engine.find_bottlenecks(&caller(), None, &ctx),
        Err(GraphError::Cancelled)
    ));
    assert!(matches!(
        engine.find_circular_dependencies(&caller(), &ctx),
        Err(GraphError::Cancelled)
    ));
    assert!(matches!(
        engine.find_shortest_path(&caller(), "a", "b", &ctx),
        Err(GraphError::Cancelled)
    ));
    assert!(matches!(
        engine.find_accessible_entities(&caller(), &ctx),
        Err(GraphError::Cancelled)
    ));
}

#[test]
fn test_expired_deadline_cancels() {
    let graph = graph_with(&["a", "b"]);
    dep(&graph, "a", "b");
    let engine = engine(graph);

    let ctx = QueryContext::none().deadline(std::time::Instant::now());
    std::thread::sleep(std::time::Duration::from_millis(2));
    assert!(matches!(
        engine.find_dependencies(&caller(), "a", None, &ctx),
        Err(GraphError::Cancelled)
    ));
}
