use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use dirgraph::graph::{property_map, GraphStore, PropertyMap, VertexId};
use dirgraph::{LinkStyle, PersistenceConfig, PersistentGraph};

fn person(i: usize) -> PropertyMap {
    let mut properties = property_map([
        ("email", format!("person{}@example.com", i)),
        ("name", format!("Person{}", i)),
    ]);
    properties.insert("age".to_string(), ((i % 100) as i64).into());
    properties
}

fn populated(size: usize) -> (GraphStore, Vec<VertexId>) {
    let mut store = GraphStore::new();
    store.add_vertex_constraint("Person", "email").unwrap();
    let ids: Vec<VertexId> = (0..size)
        .map(|i| store.add_vertex("Person", person(i)).unwrap())
        .collect();
    for i in 0..size {
        store
            .add_edge(ids[i], "KNOWS", ids[(i + 1) % size], PropertyMap::new())
            .unwrap();
    }
    (store, ids)
}

/// Benchmark vertex insertion throughput
fn bench_vertex_insertion(c: &mut Criterion) {
    let mut group = c.benchmark_group("vertex_insertion");

    for size in [100, 1000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let mut store = GraphStore::new();
                for i in 0..size {
                    store.add_vertex("Person", person(i)).unwrap();
                }
            });
        });
    }
    group.finish();
}

/// Benchmark get-or-create hits through a constraint
fn bench_get_or_create_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("get_or_create_hit");

    for size in [100, 1000, 10_000].iter() {
        let (mut store, _) = populated(*size);
        let probe = property_map([("email", format!("person{}@example.com", size / 2))]);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let found = store.get_or_create_vertex("Person", probe.clone()).unwrap();
                criterion::black_box(found);
            });
        });
    }
    group.finish();
}

/// Benchmark filtered lookup by label and property
fn bench_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter");

    for size in [100, 1000, 10_000].iter() {
        let (store, _) = populated(*size);
        let predicate = property_map([("age", 42)]);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let found = store.get_vertices(Some("Person"), &predicate);
                criterion::black_box(found.len());
            });
        });
    }
    group.finish();
}

/// Benchmark a two-hop walk over the adjacency sets
fn bench_traversal(c: &mut Criterion) {
    let (store, ids) = populated(10_000);

    c.bench_function("two_hop_traversal", |b| {
        b.iter(|| {
            let mut reached = 0;
            for edge in store.get_out_edges(ids[0]) {
                reached += store.get_out_edges(edge.tail()).len();
            }
            criterion::black_box(reached);
        });
    });
}

/// Benchmark reopening a persisted graph from its directory tree
fn bench_reload(c: &mut Criterion) {
    let mut group = c.benchmark_group("reload");
    group.sample_size(10);

    for size in [100, 1000].iter() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = PersistenceConfig::default()
            .with_root(dir.path())
            .with_link_style(LinkStyle::native());
        {
            let mut graph = PersistentGraph::from_config(&config).unwrap();
            graph.load(populated(*size).0.dump()).unwrap();
            graph.close().unwrap();
        }

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let graph = PersistentGraph::from_config(&config).unwrap();
                criterion::black_box(graph.vertex_count());
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_vertex_insertion,
    bench_get_or_create_hit,
    bench_filter,
    bench_traversal,
    bench_reload
);
criterion_main!(benches);
