//! Organisational dependency example
//!
//! Seeds a small organisation (projects, teams, users, skills) and runs every
//! query as two different callers, showing how visibility shapes the answers.

use depgraph::{
    helpers, Criticality, DependencyGraph, EngineConfig, Entity, EntityUpdate, Principal,
    QueryContext, QueryEngine, Visibility,
};
use std::sync::Arc;
use std::time::Duration;

fn names(entities: &[Entity]) -> String {
    entities
        .iter()
        .map(|e| e.name.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn main() -> depgraph::Result<()> {
    let graph = Arc::new(DependencyGraph::in_memory()?);

    println!("Seeding the organisation...\n");

    let payments = helpers::add_project(&graph, "Payment System", "platform-team")?;
    let users = helpers::add_project(&graph, "User Service", "platform-team")?;
    let analytics = helpers::add_project(&graph, "Analytics Engine", "data-team")?;
    let notifications = helpers::add_project(&graph, "Notification Service", "platform-team")?;

    let platform = helpers::add_team(&graph, "Platform Team", "platform-team", 8)?;
    let data = helpers::add_team(&graph, "Data Team", "data-team", 5)?;

    let alice = helpers::add_user(&graph, "alice", "Alice Schmidt", "alice@example.com")?;
    let bob = helpers::add_user(&graph, "bob", "Bob Mueller", "bob@example.com")?;

    let kotlin = helpers::add_skill(&graph, "Kotlin", "Programming Language")?;
    let kafka = helpers::add_skill(&graph, "Apache Kafka", "Message Broker")?;
    let postgres = helpers::add_skill(&graph, "PostgreSQL", "Database")?;

    println!("✓ Added 11 entities");

    // Payment System -> User Service -> Notification Service -> Payment System
    helpers::depends_on(&graph, &payments, &users, Criticality::Blocking)?;
    helpers::depends_on(&graph, &users, &notifications, Criticality::High)?;
    helpers::depends_on(&graph, &notifications, &payments, Criticality::Medium)?;
    helpers::depends_on(&graph, &analytics, &users, Criticality::High)?;
    helpers::depends_on(&graph, &analytics, &payments, Criticality::Low)?;

    helpers::owns(&graph, &platform, &payments)?;
    helpers::owns(&graph, &platform, &users)?;
    helpers::owns(&graph, &platform, &notifications)?;
    helpers::owns(&graph, &data, &analytics)?;

    helpers::requires(&graph, &payments, &kotlin, Criticality::High)?;
    helpers::requires(&graph, &notifications, &kafka, Criticality::Medium)?;
    helpers::requires(&graph, &analytics, &postgres, Criticality::High)?;

    helpers::has_skill(&graph, &alice, &kotlin, "EXPERT")?;
    helpers::has_skill(&graph, &bob, &kafka, "ADVANCED")?;

    println!(
        "✓ Added {} relationships\n",
        graph.relationship_count()?
    );

    let engine = QueryEngine::new(Arc::clone(&graph), EngineConfig::default())?;
    let platform_dev = Principal::new("alice", "platform-team");
    let data_dev = Principal::new("bob", "data-team");
    let ctx = QueryContext::none().timeout(Duration::from_secs(5));

    println!("--- As alice (platform-team) ---\n");

    let deps = engine.find_dependencies(&platform_dev, &payments, None, &ctx)?;
    println!("Payment System depends on {} projects:", deps.len());
    for dep in &deps {
        println!("  - {}", dep.name);
    }

    let dependents = engine.find_dependents(&platform_dev, &users, &ctx)?;
    println!("\nUser Service is needed by {} projects:", dependents.len());
    for dep in &dependents {
        println!("  - {}", dep.name);
    }

    let bottlenecks = engine.find_bottlenecks(&platform_dev, Some(3), &ctx)?;
    println!("\nBottlenecks (HIGH or above):");
    for entity in &bottlenecks {
        println!("  - {}", entity.name);
    }

    let cycles = engine.find_circular_dependencies(&platform_dev, &ctx)?;
    println!("\nFound {} circular dependencies:", cycles.len());
    for cycle in &cycles {
        println!("  - {}", names(cycle));
    }

    let path = engine.find_shortest_path(&platform_dev, &payments, &notifications, &ctx)?;
    println!("\nPayment System to Notification Service: {}", names(&path));

    println!("\n--- As bob (data-team) ---\n");

    // Platform projects are department-visible, so bob sees none of them
    let deps = engine.find_dependencies(&data_dev, &analytics, None, &ctx)?;
    println!("Analytics Engine depends on {} visible projects", deps.len());
    match engine.find_dependents(&data_dev, &users, &ctx) {
        Ok(found) => println!("User Service dependents: {}", found.len()),
        Err(e) => println!("User Service: {e}"),
    }

    // Opening one project up changes what bob can see
    graph.update_entity(
        &users,
        EntityUpdate {
            visibility: Some(Visibility::Public),
            ..EntityUpdate::default()
        },
    )?;
    let deps = engine.find_dependencies(&data_dev, &analytics, None, &ctx)?;
    println!(
        "After publishing User Service, Analytics Engine depends on {} visible projects",
        deps.len()
    );

    let accessible = engine.find_accessible_entities(&data_dev, &ctx)?;
    println!("\nbob can read {} entities", accessible.len());

    println!("\n--- Ad-hoc queries ---\n");

    let skills = graph.query()?.entity_type(helpers::SKILL).execute()?;
    println!("Skills in the catalogue: {}", skills.len());
    let platform_projects = helpers::owned_projects(&graph, &platform)?;
    println!("Platform Team owns {} projects", platform_projects.len());
    let needed = helpers::required_skills(&graph, &payments)?;
    println!("Payment System requires {} skills", needed.len());

    Ok(())
}
