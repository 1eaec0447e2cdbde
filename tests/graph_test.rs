//! End-to-end tests of the in-memory engine
//!
//! Exercises the public API only: constraints, get-or-create, edge triple
//! uniqueness, removal rules, filtered queries and document round-trips.

use dirgraph::graph::{property_map, Vertex};
use dirgraph::*;
use std::collections::BTreeSet;

fn person(email: &str, name: &str) -> PropertyMap {
    property_map([("email", email), ("name", name)])
}

#[test]
fn test_constraint_scenario() {
    let mut store = GraphStore::new();
    store.add_vertex_constraint("Person", "email").unwrap();

    let original = store.add_vertex("Person", person("a@x.com", "A")).unwrap();
    let found = store
        .get_or_create_vertex("Person", person("a@x.com", "ignored"))
        .unwrap();
    assert_eq!(found, Some(original));
    assert_eq!(
        store.get_vertex(original).unwrap().get_property("name"),
        Some(&PropertyValue::from("A"))
    );

    // add_vertex bypasses the dedup path
    store
        .add_vertex("Person", property_map([("email", "a@x.com")]))
        .unwrap();
    let third = store.add_vertex("Person", person("c@x.com", "C")).unwrap();
    let before: Vec<Vertex> = store.vertices().cloned().collect();

    let result = store.set_property(third, property_map([("email", "a@x.com")]));
    assert!(matches!(
        result,
        Err(GraphError::ConstraintViolation(Violation::VertexProperty { .. }))
    ));
    let after: Vec<Vertex> = store.vertices().cloned().collect();
    assert_eq!(
        before.iter().map(|v| v.properties().clone()).collect::<Vec<_>>(),
        after.iter().map(|v| v.properties().clone()).collect::<Vec<_>>()
    );
}

#[test]
fn test_constraints_apply_per_label() {
    let mut store = GraphStore::new();
    store.add_vertex_constraint("Person", "email").unwrap();

    let person = store
        .get_or_create_vertex("Person", property_map([("email", "x@x.com")]))
        .unwrap();
    let robot = store
        .get_or_create_vertex("Robot", property_map([("email", "x@x.com")]))
        .unwrap();
    assert_ne!(person, robot);
    assert_eq!(store.vertex_count(), 2);
}

#[test]
fn test_values_compare_type_strictly() {
    let mut store = GraphStore::new();
    store.add_vertex_constraint("Item", "code").unwrap();

    let int = store
        .get_or_create_vertex("Item", property_map([("code", 1)]))
        .unwrap();
    let float = store
        .get_or_create_vertex("Item", property_map([("code", 1.0)]))
        .unwrap();
    let text = store
        .get_or_create_vertex("Item", property_map([("code", "1")]))
        .unwrap();
    assert_ne!(int, float);
    assert_ne!(int, text);
    assert_eq!(store.vertex_count(), 3);
}

#[test]
fn test_edge_uniqueness_and_get_or_create() {
    let mut store = GraphStore::new();
    let a = store.add_vertex("Person", person("a@x.com", "A")).unwrap();
    let b = store.add_vertex("Person", person("b@x.com", "B")).unwrap();

    let first = store.get_or_create_edge(a, "KNOWS", b, PropertyMap::new()).unwrap();
    let second = store.get_or_create_edge(a, "KNOWS", b, PropertyMap::new()).unwrap();
    assert_eq!(first, second);

    let err = store.add_edge(a, "KNOWS", b, PropertyMap::new()).unwrap_err();
    assert!(err.is_constraint_violation());
    assert_eq!(store.edge_count(), 1);
}

#[test]
fn test_self_loop() {
    let mut store = GraphStore::new();
    let a = store.add_vertex("Node", PropertyMap::new()).unwrap();
    let edge = store.add_edge(a, "SELF", a, PropertyMap::new()).unwrap();

    assert_eq!(store.get_out_edges(a).len(), 1);
    assert_eq!(store.get_in_edges(a).len(), 1);
    assert_eq!(store.neighbours(a), vec![a]);
    assert!(matches!(store.remove_vertex(a), Err(GraphError::VertexBoundByEdges(_))));

    store.remove_edge(edge).unwrap();
    store.remove_vertex(a).unwrap();
    assert_eq!(store.vertex_count(), 0);
}

#[test]
fn test_neighbours() {
    let mut store = GraphStore::new();
    let hub = store.add_vertex("Hub", PropertyMap::new()).unwrap();
    let spokes: Vec<VertexId> = (0..3)
        .map(|i| {
            store
                .add_vertex("Spoke", property_map([("n", i)]))
                .unwrap()
        })
        .collect();
    store.add_edge(hub, "TO", spokes[0], PropertyMap::new()).unwrap();
    store.add_edge(spokes[1], "TO", hub, PropertyMap::new()).unwrap();
    store.add_edge(hub, "ALSO", spokes[0], PropertyMap::new()).unwrap();

    assert_eq!(store.neighbours(hub), vec![spokes[0], spokes[1]]);
    assert_eq!(store.neighbours(spokes[2]), Vec::<VertexId>::new());
    assert!(store.neighbours(VertexId::new(999)).is_empty());
}

#[test]
fn test_removal_order() {
    let mut store = GraphStore::new();
    let a = store.add_vertex("Person", PropertyMap::new()).unwrap();
    let b = store.add_vertex("Person", PropertyMap::new()).unwrap();
    let c = store.add_vertex("Person", PropertyMap::new()).unwrap();
    let ab = store.add_edge(a, "KNOWS", b, PropertyMap::new()).unwrap();
    let cb = store.add_edge(c, "KNOWS", b, PropertyMap::new()).unwrap();

    assert!(matches!(store.remove_vertex(b), Err(GraphError::VertexBoundByEdges(_))));
    store.remove_edge(ab).unwrap();
    assert!(matches!(store.remove_vertex(b), Err(GraphError::VertexBoundByEdges(_))));
    store.remove_edge(cb).unwrap();
    store.remove_vertex(b).unwrap();

    assert!(!store.contains(b));
    assert!(!store.contains(ab));
    assert!(store.contains(a));
}

#[test]
fn test_queries_track_property_updates() {
    let mut store = GraphStore::new();
    let ids: Vec<VertexId> = ["Oslo", "Oslo", "Rome"]
        .iter()
        .map(|city| {
            store
                .add_vertex("Person", property_map([("city", *city)]))
                .unwrap()
        })
        .collect();

    let oslo = property_map([("city", "Oslo")]);
    assert_eq!(store.get_vertices(Some("Person"), &oslo).len(), 2);

    store.set_property(ids[0], property_map([("city", "Rome")])).unwrap();
    let remaining: Vec<VertexId> = store
        .get_vertices(None, &oslo)
        .iter()
        .map(|v| v.id())
        .collect();
    assert_eq!(remaining, vec![ids[1]]);
    assert_eq!(
        store
            .get_vertices(None, &property_map([("city", "Rome")]))
            .len(),
        2
    );
}

#[test]
fn test_document_round_trip_is_isomorphic() {
    let mut store = GraphStore::new();
    store.add_vertex_constraint("Person", "email").unwrap();
    let a = store.add_vertex("Person", person("a@x.com", "A")).unwrap();
    let b = store.add_vertex("Person", person("b@x.com", "B")).unwrap();
    let acme = store
        .add_vertex(
            "Company",
            property_map([
                ("name", PropertyValue::from("Acme")),
                ("listed", PropertyValue::from(true)),
            ]),
        )
        .unwrap();
    store.add_edge(a, "KNOWS", b, property_map([("weight", 0.5)])).unwrap();
    store.add_edge(b, "WORKS_AT", acme, PropertyMap::new()).unwrap();
    store.add_edge(a, "WORKS_AT", acme, property_map([("title", PropertyValue::Null)])).unwrap();

    // Leave a gap in the identity space
    let gone = store.add_vertex("Temp", PropertyMap::new()).unwrap();
    store.remove_vertex(gone).unwrap();

    let mut json = Vec::new();
    store.dump_json(&mut json).unwrap();
    let mut copy = GraphStore::new();
    copy.load_json(json.as_slice()).unwrap();

    let describe = |g: &GraphStore| {
        let render = |v: &Vertex| format!("{}{:?}", v.label(), v.properties());
        let vertices: BTreeSet<String> = g.vertices().map(render).collect();
        let edges: BTreeSet<String> = g
            .edges()
            .map(|e| {
                format!(
                    "{} -[{}{:?}]-> {}",
                    render(g.get_vertex(e.head()).unwrap()),
                    e.label(),
                    e.properties(),
                    render(g.get_vertex(e.tail()).unwrap())
                )
            })
            .collect();
        (vertices, edges)
    };
    assert_eq!(describe(&store), describe(&copy));
    assert_eq!(copy.get_vertex_constraints(), store.get_vertex_constraints());
}
