//! Integration test for MemoryBackend storage layout and the reload path.

use depgraph::storage::{self, COUNTERS_KEY, ENTITY_PREFIX, RELATIONSHIP_PREFIX};
use depgraph::{
    helpers, Criticality, DependencyGraph, MemoryBackend, NewEntity, NewRelationship,
    StorageBackend,
};

fn shared_graph(backend: &MemoryBackend) -> DependencyGraph {
    DependencyGraph::with_backend(Box::new(backend.clone())).unwrap()
}

#[test]
fn test_memory_backend_in_memory_only() {
    let graph = DependencyGraph::in_memory().unwrap();

    let a = helpers::add_project(&graph, "A", "platform").unwrap();
    let b = helpers::add_project(&graph, "B", "platform").unwrap();
    helpers::depends_on(&graph, &a, &b, Criticality::High).unwrap();

    assert_eq!(graph.entity_count().unwrap(), 2);
    assert_eq!(graph.relationship_count().unwrap(), 1);

    // Memory backend doesn't persist - just verify operations work
    graph.flush().unwrap();
}

#[test]
fn test_records_land_under_their_prefixes() {
    let backend = MemoryBackend::new();
    let graph = shared_graph(&backend);

    let a = helpers::add_project(&graph, "A", "platform").unwrap();
    let b = helpers::add_project(&graph, "B", "platform").unwrap();
    for _ in 0..12 {
        helpers::depends_on(&graph, &a, &b, Criticality::Low).unwrap();
    }

    assert!(backend.exists(&storage::entity_key(&a)).unwrap());
    assert_eq!(backend.scan_prefix(ENTITY_PREFIX).unwrap().len(), 2);
    assert!(backend.exists(COUNTERS_KEY).unwrap());

    // Zero-padded ids scan in numeric order
    let keys: Vec<Vec<u8>> = backend
        .scan_prefix(RELATIONSHIP_PREFIX)
        .unwrap()
        .into_iter()
        .map(|(key, _)| key)
        .collect();
    let expected: Vec<Vec<u8>> = (0..12).map(storage::relationship_key).collect();
    assert_eq!(keys, expected);
}

#[test]
fn test_delete_removes_records_from_storage() {
    let backend = MemoryBackend::new();
    let graph = shared_graph(&backend);

    let a = helpers::add_project(&graph, "A", "platform").unwrap();
    let b = helpers::add_project(&graph, "B", "platform").unwrap();
    helpers::depends_on(&graph, &a, &b, Criticality::High).unwrap();
    helpers::depends_on(&graph, &b, &a, Criticality::High).unwrap();

    graph.delete_entity(&b).unwrap();

    assert!(!backend.exists(&storage::entity_key(&b)).unwrap());
    assert!(backend.scan_prefix(RELATIONSHIP_PREFIX).unwrap().is_empty());
}

#[test]
fn test_reload_picks_up_external_writes() {
    let backend = MemoryBackend::new();
    let writer = shared_graph(&backend);
    let reader = shared_graph(&backend);

    let a = helpers::add_project(&writer, "A", "platform").unwrap();
    let b = helpers::add_project(&writer, "B", "platform").unwrap();
    helpers::depends_on(&writer, &a, &b, Criticality::High).unwrap();

    let stale = reader.snapshot().unwrap();
    assert_eq!(stale.entity_count(), 0);

    reader.reload().unwrap();
    assert_eq!(reader.entity_count().unwrap(), 2);
    assert_eq!(reader.relationship_count().unwrap(), 1);
    assert!(reader.snapshot().unwrap().version() > stale.version());

    // A snapshot taken before the reload is untouched
    assert_eq!(stale.entity_count(), 0);
}

#[test]
fn test_reload_repairs_dangling_relationships() {
    let mut backend = MemoryBackend::new();
    let graph = shared_graph(&backend);

    let a = graph
        .create_entity(NewEntity::new("Project", "A", "platform").with_id("a"))
        .unwrap();
    let b = graph
        .create_entity(NewEntity::new("Project", "B", "platform").with_id("b"))
        .unwrap();
    let c = graph
        .create_entity(NewEntity::new("Project", "C", "platform").with_id("c"))
        .unwrap();
    let ab = graph
        .add_relationship(&a, NewRelationship::new("DEPENDS_ON", &b))
        .unwrap();
    let ac = graph
        .add_relationship(&a, NewRelationship::new("DEPENDS_ON", &c))
        .unwrap();

    // An external writer drops the entity record without its relationships
    backend.delete(&storage::entity_key(&b)).unwrap();
    graph.reload().unwrap();

    assert!(graph.get_entity(&b).is_err());
    assert!(graph.get_relationship(ab).is_err());
    assert!(graph.get_relationship(ac).is_ok());
    assert!(!backend.exists(&storage::relationship_key(ab)).unwrap());
    assert!(backend.exists(&storage::relationship_key(ac)).unwrap());
}

#[test]
fn test_relationship_ids_continue_across_handles() {
    let backend = MemoryBackend::new();
    let first = shared_graph(&backend);
    let a = helpers::add_project(&first, "A", "platform").unwrap();
    let b = helpers::add_project(&first, "B", "platform").unwrap();
    assert_eq!(helpers::depends_on(&first, &a, &b, Criticality::Low).unwrap(), 0);
    assert_eq!(helpers::depends_on(&first, &a, &b, Criticality::Low).unwrap(), 1);
    drop(first);

    let second = shared_graph(&backend);
    assert_eq!(helpers::depends_on(&second, &b, &a, Criticality::Low).unwrap(), 2);
}

#[test]
fn test_memory_backend_clear() {
    let mut backend = MemoryBackend::new();
    let graph = shared_graph(&backend);
    helpers::add_team(&graph, "Platform Team", "platform-team", 8).unwrap();
    assert!(!backend.is_empty());

    backend.clear().unwrap();
    graph.reload().unwrap();

    assert!(backend.is_empty());
    assert_eq!(graph.entity_count().unwrap(), 0);
}
