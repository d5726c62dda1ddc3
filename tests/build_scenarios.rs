//! End-to-end pipeline scenarios driven through `FixtureSource`, matching
//! the quantified invariants and lettered scenarios this crate's build
//! pipeline must satisfy.

use butterfly_graph::{build, Graph};
use butterfly_graph::source::FixtureSource;

fn edge_pairs(graph: &Graph) -> Vec<(u32, u32)> {
    let mut pairs = Vec::new();
    for v in 0..graph.vertex_count() as u32 {
        for e in graph.edges_of(v) {
            pairs.push((v, e.target_vertex));
        }
    }
    pairs.sort();
    pairs
}

/// Invariant 1 & 3: occupied edge slots per vertex match the tally, and the
/// sentinel's `first_edge` equals the total edge count.
fn assert_vertex_edge_invariants(graph: &Graph) {
    for v in 0..graph.vertex_count() as u32 {
        let run = graph.edges_of(v);
        assert!(run.iter().all(|e| e.flags != 0), "vertex {v} has an unwritten edge slot");
    }
    assert_eq!(graph.vertices.last().unwrap().first_edge as usize, graph.edges.len());
}

/// Invariant 2: the multiset of emitted edges is symmetric.
fn assert_edges_are_symmetric(graph: &Graph) {
    let pairs = edge_pairs(graph);
    for &(a, b) in &pairs {
        let reverse_count = pairs.iter().filter(|&&(x, y)| x == b && y == a).count();
        let forward_count = pairs.iter().filter(|&&(x, y)| x == a && y == b).count();
        assert_eq!(reverse_count, forward_count, "edge ({a}, {b}) is not mirrored");
    }
}

/// Invariant 4: every target vertex is in range.
fn assert_targets_in_range(graph: &Graph) {
    let v = graph.vertex_count() as u32;
    for edge in &graph.edges {
        assert!(edge.target_vertex < v, "edge target {} out of range [0, {v})", edge.target_vertex);
    }
}

#[test]
fn scenario_a_single_way_through_segment() {
    let mut src = FixtureSource::new();
    src.add_node(10, 1_000_000_000, 2_000_000_000);
    src.add_node(20, 1_000_100_000, 2_000_100_000);
    src.add_node(30, 1_000_200_000, 2_000_200_000);
    src.add_way_absolute(1, &[10, 20, 30], &[("highway", "residential")]);

    let graph = build(&src).unwrap();

    // Endpoints 10 and 30 become vertices; interior-only node 20 does not.
    assert_eq!(graph.vertex_count(), 2);
    assert_eq!(graph.edge_count(), 2);
    assert_eq!(edge_pairs(&graph), vec![(0, 1), (1, 0)]);

    assert_vertex_edge_invariants(&graph);
    assert_edges_are_symmetric(&graph);
    assert_targets_in_range(&graph);
}

#[test]
fn scenario_b_shared_interior_node_becomes_intersection() {
    let mut src = FixtureSource::new();
    for id in [1, 2, 3, 4, 5] {
        src.add_node(id, 0, 0);
    }
    src.add_way_absolute(1, &[1, 2, 3], &[("highway", "residential")]);
    src.add_way_absolute(2, &[4, 2, 5], &[("highway", "residential")]);

    let graph = build(&src).unwrap();

    assert_eq!(graph.vertex_count(), 5);
    assert_eq!(graph.edge_count(), 8);

    // Node 2 (dense id discovered first via way 1) has degree 4: it
    // connects to 1, 3, 4 and 5.
    let degree_of_shared_node =
        (0..graph.vertex_count() as u32).map(|v| graph.edges_of(v).len()).max().unwrap();
    assert_eq!(degree_of_shared_node, 4);

    assert_vertex_edge_invariants(&graph);
    assert_edges_are_symmetric(&graph);
    assert_targets_in_range(&graph);
}

#[test]
fn scenario_c_non_highway_way_yields_empty_graph() {
    let mut src = FixtureSource::new();
    for id in [1, 2, 3] {
        src.add_node(id, 0, 0);
    }
    src.add_way_absolute(1, &[1, 2, 3], &[("building", "yes")]);

    let graph = build(&src).unwrap();

    assert_eq!(graph.vertex_count(), 0);
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn scenario_d_dead_end_off_through_street() {
    let mut src = FixtureSource::new();
    for id in [1, 2, 3, 4, 5, 6] {
        src.add_node(id, 0, 0);
    }
    src.add_way_absolute(1, &[1, 2, 3, 4, 5], &[("highway", "residential")]);
    src.add_way_absolute(2, &[3, 6], &[("highway", "residential")]);

    let graph = build(&src).unwrap();

    assert_eq!(graph.vertex_count(), 4);
    assert_eq!(graph.edge_count(), 6);

    let through_junction_degree =
        (0..graph.vertex_count() as u32).map(|v| graph.edges_of(v).len()).max().unwrap();
    assert_eq!(through_junction_degree, 3);

    assert_vertex_edge_invariants(&graph);
    assert_edges_are_symmetric(&graph);
    assert_targets_in_range(&graph);
}

#[test]
fn scenario_e_delta_coded_refs_equal_absolute_refs() {
    let mut delta_src = FixtureSource::new();
    delta_src.add_node(100, 500_000_000, 500_000_000);
    delta_src.add_node(70, 500_100_000, 500_100_000);
    delta_src.add_node(120, 500_200_000, 500_200_000);
    delta_src.add_way_deltas(1, &[100, -30, 50], &[("highway", "residential")]);

    let mut absolute_src = FixtureSource::new();
    absolute_src.add_node(100, 500_000_000, 500_000_000);
    absolute_src.add_node(70, 500_100_000, 500_100_000);
    absolute_src.add_node(120, 500_200_000, 500_200_000);
    absolute_src.add_way_absolute(1, &[100, 70, 120], &[("highway", "residential")]);

    let from_deltas = build(&delta_src).unwrap();
    let from_absolute = build(&absolute_src).unwrap();

    assert_eq!(from_deltas.vertices, from_absolute.vertices);
    assert_eq!(from_deltas.edges, from_absolute.edges);
}

#[test]
fn scenario_f_two_runs_on_the_same_input_are_byte_identical() {
    let mut src = FixtureSource::new();
    for id in [1, 2, 3, 4, 5, 6, 7] {
        src.add_node(id, id * 1000, id * 2000);
    }
    src.add_way_absolute(1, &[1, 2, 3, 4], &[("highway", "residential")]);
    src.add_way_absolute(2, &[3, 5, 6], &[("highway", "service")]);
    src.add_way_absolute(3, &[6, 7], &[("highway", "track")]);

    let first = build(&src).unwrap();
    let second = build(&src).unwrap();

    assert_eq!(first.vertices, second.vertices);
    assert_eq!(first.edges, second.edges);
}

#[test]
fn endpoint_shared_with_another_ways_interior_is_promoted() {
    // Node 2 is an endpoint of way 1 and an interior point of way 2; it
    // must end up as a single intersection either way.
    let mut src = FixtureSource::new();
    for id in [1, 2, 3, 4] {
        src.add_node(id, 0, 0);
    }
    src.add_way_absolute(1, &[1, 2], &[("highway", "residential")]);
    src.add_way_absolute(2, &[3, 2, 4], &[("highway", "residential")]);

    let graph = build(&src).unwrap();

    // Vertices: 1, 2, 3, 4 (all four nodes are intersections/endpoints).
    assert_eq!(graph.vertex_count(), 4);
    assert_edges_are_symmetric(&graph);
    assert_targets_in_range(&graph);
}

#[test]
fn way_with_a_single_ref_contributes_no_edges() {
    let mut src = FixtureSource::new();
    src.add_node(1, 0, 0);
    src.add_way_absolute(1, &[1], &[("highway", "residential")]);

    let graph = build(&src).unwrap();
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn multiple_disjoint_ways_each_contribute_their_own_component() {
    let mut src = FixtureSource::new();
    for id in [1, 2, 10, 20] {
        src.add_node(id, 0, 0);
    }
    src.add_way_absolute(1, &[1, 2], &[("highway", "residential")]);
    src.add_way_absolute(2, &[10, 20], &[("highway", "residential")]);

    let graph = build(&src).unwrap();
    assert_eq!(graph.vertex_count(), 4);
    assert_eq!(graph.edge_count(), 4);
    assert_vertex_edge_invariants(&graph);
}
