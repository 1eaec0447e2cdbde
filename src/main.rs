use anyhow::{Context, Result};
use dirgraph::{property_map, PersistenceConfig, PersistentGraph, PropertyMap, VertexRef};
use std::path::PathBuf;

/// Usage: dirgraph [ROOT | CONFIG.yaml]
///
/// Builds a small social graph under ROOT (or a temporary directory), reopens
/// it from disk and prints what the scan recovered.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dirgraph=info".parse()?),
        )
        .init();

    println!("dirgraph v{}", dirgraph::version());
    println!("==========================================");

    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) if path.extension().is_some_and(|ext| ext == "yaml" || ext == "yml") => {
            PersistenceConfig::from_yaml_file(&path)
                .with_context(|| format!("reading config {}", path.display()))?
        }
        Some(root) => PersistenceConfig::default().with_root(root),
        None => PersistenceConfig::default(),
    };

    let mut graph = PersistentGraph::from_config(&config)?;
    println!("Graph root: {}", graph.root().display());
    build_demo(&mut graph)?;

    if graph.is_temporary() {
        // Nothing to reopen once a temporary root is gone
        print_summary(&graph);
        graph.close()?;
        return Ok(());
    }

    let root = graph.root().to_path_buf();
    graph.close()?;
    let graph = PersistentGraph::from_config(&config.with_root(&root))?;
    println!("\nReopened from {}", root.display());
    print_summary(&graph);
    graph.close()?;
    Ok(())
}

fn build_demo(graph: &mut PersistentGraph) -> Result<()> {
    graph.add_vertex_constraint("Person", "email")?;
    graph.add_vertex_constraint("Company", "name")?;

    let people = [
        ("alice@example.com", "Alice", 30),
        ("bob@example.com", "Bob", 25),
        ("carol@example.com", "Carol", 35),
    ];
    let mut ids = Vec::new();
    for (email, name, age) in people {
        let mut properties = property_map([("email", email), ("name", name)]);
        properties.insert("age".to_string(), age.into());
        let id = graph
            .get_or_create_vertex("Person", properties)?
            .context("person without properties")?;
        ids.push(id);
    }

    graph.get_or_create_edge(ids[0], "KNOWS", ids[1], property_map([("since", 2019)]))?;
    graph.get_or_create_edge(ids[1], "KNOWS", ids[2], PropertyMap::new())?;
    for &person in &ids {
        graph.get_or_create_edge(
            person,
            "WORKS_AT",
            VertexRef::matching("Company", property_map([("name", "Acme")])),
            PropertyMap::new(),
        )?;
    }
    Ok(())
}

fn print_summary(graph: &PersistentGraph) {
    println!(
        "{} vertices, {} edges, constraints: {:?}",
        graph.vertex_count(),
        graph.edge_count(),
        graph
            .get_vertex_constraints()
            .iter()
            .map(|c| format!("{}.{}", c.label, c.key))
            .collect::<Vec<_>>()
    );
    for vertex in graph.vertices() {
        let name = vertex
            .get_property("name")
            .map(|value| value.to_string())
            .unwrap_or_default();
        let out: Vec<String> = graph
            .get_out_edges(vertex.id())
            .iter()
            .filter_map(|edge| {
                let tail = graph.get_vertex(edge.tail())?;
                Some(format!("-[{}]-> {}", edge.label(), tail.get_property("name")?))
            })
            .collect();
        println!("  {} {:<8} {}", vertex.label(), name, out.join(", "));
    }
}
