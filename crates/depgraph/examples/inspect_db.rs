use depgraph::query::count_by_type;
use depgraph::{DependencyGraph, EngineConfig, Principal, QueryContext, QueryEngine};
use std::env;
use std::sync::Arc;

fn main() -> depgraph::Result<()> {
    let path = env::args().nth(1).unwrap_or_else(|| "./org.graph".to_string());
    let graph = Arc::new(DependencyGraph::open(&path)?);
    println!("Entity count: {}", graph.entity_count()?);
    println!("Relationship count: {}", graph.relationship_count()?);

    println!("\n--- Entities by type ---");
    for (entity_type, count) in count_by_type(&graph.snapshot()?) {
        println!("  {entity_type}: {count}");
    }

    // Without a principal on the command line only PUBLIC entities show up
    let principal = match (env::args().nth(2), env::args().nth(3)) {
        (Some(id), Some(department)) => Principal::new(id, department),
        (Some(id), None) => Principal::new(id, ""),
        _ => Principal::new("", ""),
    };
    let engine = QueryEngine::new(Arc::clone(&graph), EngineConfig::default())?;
    let ctx = QueryContext::none();

    println!("\n--- Top bottlenecks ---");
    for entity in engine.find_bottlenecks(&principal, None, &ctx)? {
        let dependents = engine.find_dependents(&principal, &entity.id, &ctx)?;
        println!(
            "  {} [{}] {} dependents",
            entity.name,
            entity.entity_type,
            dependents.len()
        );
    }

    println!("\n--- Circular dependencies ---");
    let cycles = engine.find_circular_dependencies(&principal, &ctx)?;
    for cycle in &cycles {
        let names: Vec<&str> = cycle.iter().map(|e| e.name.as_str()).collect();
        println!("  {}", names.join(" -> "));
    }
    if cycles.is_empty() {
        println!("  none");
    }

    Ok(())
}
