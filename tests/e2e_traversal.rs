//! End-to-end tests for graph traversal.
//!
//! Tests connected links, neighbors (direct, deep, indirect), BFS/DFS order
//! and distances, pruning, successors/predecessors, and roots/leaves.

use cellgraph::{
    AddOptions, Cell, Direction, Endpoint, Graph, NeighborOptions, SearchOptions, Visit,
};
use pretty_assertions::assert_eq;

// ============================================================================
// Helper: a small DAG
//
//     a → b → d
//     a → c → d → e
// ============================================================================

fn link(id: &str, source: &str, target: &str) -> Cell {
    Cell::link(id, "link", Endpoint::cell(source), Endpoint::cell(target))
}

fn diamond() -> Graph {
    let mut graph = Graph::new();
    let mut cells: Vec<Cell> = ["a", "b", "c", "d", "e"]
        .into_iter()
        .map(|id| Cell::element(id, "rect"))
        .collect();
    cells.extend([
        link("ab", "a", "b"),
        link("ac", "a", "c"),
        link("bd", "b", "d"),
        link("cd", "c", "d"),
        link("de", "d", "e"),
    ]);
    graph.add_cells(cells, &AddOptions::default()).unwrap();
    graph
}

fn ids(cells: Vec<&Cell>) -> Vec<&str> {
    cells.into_iter().map(|c| c.id.as_str()).collect()
}

fn outgoing() -> NeighborOptions {
    NeighborOptions::outgoing()
}

// ============================================================================
// 1. Search order and distances
// ============================================================================

#[test]
fn test_bfs_visits_by_distance() {
    let graph = diamond();
    let mut visits = Vec::new();
    graph.bfs("a", &outgoing(), |cell, distance| {
        visits.push((cell.id.as_str(), distance));
        Visit::Continue
    });
    assert_eq!(visits, vec![("a", 0), ("b", 1), ("c", 1), ("d", 2), ("e", 3)]);
}

#[test]
fn test_dfs_expands_first_neighbor_first() {
    let graph = diamond();
    let mut visits = Vec::new();
    graph.dfs("a", &outgoing(), |cell, distance| {
        visits.push((cell.id.as_str(), distance));
        Visit::Continue
    });
    assert_eq!(visits, vec![("a", 0), ("b", 1), ("d", 2), ("e", 3), ("c", 1)]);
}

#[test]
fn test_bfs_prune_skips_subtree_only() {
    let graph = diamond();
    let mut visits = Vec::new();
    graph.bfs("a", &outgoing(), |cell, _| {
        visits.push(cell.id.as_str());
        if cell.id.as_str() == "b" { Visit::Prune } else { Visit::Continue }
    });
    // d is still reached through c
    assert_eq!(visits, vec!["a", "b", "c", "d", "e"]);

    let mut visits = Vec::new();
    graph.bfs("a", &outgoing(), |cell, _| {
        visits.push(cell.id.as_str());
        if cell.id.as_str() == "d" { Visit::Prune } else { Visit::Continue }
    });
    assert_eq!(visits, vec!["a", "b", "c", "d"]);
}

#[test]
fn test_search_stop_ends_everything() {
    let graph = diamond();
    let mut visits = Vec::new();
    graph.search("a", &SearchOptions { breadth_first: true, ..SearchOptions::default() }, |cell, _| {
        visits.push(cell.id.as_str());
        if cell.id.as_str() == "b" { Visit::Stop } else { Visit::Continue }
    });
    assert_eq!(visits, vec!["a", "b"]);
}

#[test]
fn test_undirected_search_reaches_everything() {
    let graph = diamond();
    let mut visits = Vec::new();
    graph.bfs("e", &NeighborOptions::default(), |cell, _| {
        visits.push(cell.id.as_str());
        Visit::Continue
    });
    assert_eq!(visits.len(), 5);
    assert_eq!(visits[0], "e");
}

#[test]
fn test_search_from_unknown_is_empty() {
    let graph = diamond();
    let mut called = false;
    graph.bfs("zzz", &outgoing(), |_, _| {
        called = true;
        Visit::Continue
    });
    assert!(!called);
}

// ============================================================================
// 2. Successors / predecessors
// ============================================================================

#[test]
fn test_successors_ignore_requested_direction() {
    let graph = diamond();
    let incoming = SearchOptions {
        neighbors: NeighborOptions { direction: Direction::Incoming, ..NeighborOptions::default() },
        breadth_first: true,
    };
    assert_eq!(ids(graph.successors("a", &incoming)), vec!["b", "c", "d", "e"]);
    assert_eq!(ids(graph.predecessors("d", &SearchOptions::default())), vec!["b", "a", "c"]);
}

#[test]
fn test_reachability_predicates() {
    let graph = diamond();
    let opts = SearchOptions::default();
    assert!(graph.is_successor("a", "e", &opts));
    assert!(!graph.is_successor("e", "a", &opts));
    assert!(graph.is_predecessor("e", "a", &opts));
    assert!(!graph.is_successor("b", "c", &opts));
    // a cell is not its own successor
    assert!(!graph.is_successor("a", "a", &opts));
}

#[test]
fn test_cycle_terminates() {
    let mut graph = diamond();
    graph.add_cell(link("ea", "e", "a"), &AddOptions::default()).unwrap();
    assert_eq!(graph.successors("a", &SearchOptions::default()).len(), 4);
    assert!(graph.is_successor("e", "b", &SearchOptions::default()));
}

// ============================================================================
// 3. Roots and leaves
// ============================================================================

#[test]
fn test_sources_and_sinks() {
    let mut graph = diamond();
    graph.add_cell(Cell::element("lonely", "rect"), &AddOptions::default()).unwrap();
    assert_eq!(ids(graph.sources()), vec!["a", "lonely"]);
    assert_eq!(ids(graph.sinks()), vec!["e", "lonely"]);
}

// ============================================================================
// 4. Neighbors
// ============================================================================

#[test]
fn test_neighbors_by_direction() {
    let graph = diamond();
    assert_eq!(ids(graph.neighbors("d", &NeighborOptions::incoming())), vec!["b", "c"]);
    assert_eq!(ids(graph.neighbors("d", &outgoing())), vec!["e"]);
    assert_eq!(ids(graph.neighbors("d", &NeighborOptions::default())), vec!["e", "b", "c"]);
}

#[test]
fn test_point_endpoints_are_not_neighbors() {
    let mut graph = diamond();
    graph
        .add_cell(
            Cell::link("free", "link", Endpoint::cell("e"), Endpoint::point(3.0, 4.0)),
            &AddOptions::default(),
        )
        .unwrap();
    assert_eq!(ids(graph.connected_links("e", &outgoing())), vec!["free"]);
    assert!(graph.neighbors("e", &outgoing()).is_empty());
}

#[test]
fn test_indirect_follows_link_chains() {
    let mut graph = Graph::new();
    graph
        .add_cells(
            vec![
                Cell::element("a", "rect"),
                Cell::element("b", "rect"),
                Cell::element("x", "rect"),
                link("ab", "a", "b"),
                // a link whose source is another link
                link("hop", "ab", "x"),
            ],
            &AddOptions::default(),
        )
        .unwrap();

    let direct = graph.connected_links("a", &outgoing());
    assert_eq!(ids(direct), vec!["ab"]);

    let indirect = NeighborOptions { indirect: true, ..outgoing() };
    assert_eq!(ids(graph.connected_links("a", &indirect)), vec!["ab", "hop"]);
    assert_eq!(ids(graph.neighbors("a", &indirect)), vec!["b", "x"]);
}

#[test]
fn test_deep_neighbors_of_container() {
    let mut graph = diamond();
    graph.add_cell(Cell::element("box", "group"), &AddOptions::default()).unwrap();
    graph.embed("box", "b").unwrap();
    graph.embed("box", "c").unwrap();

    let deep = NeighborOptions { deep: true, ..NeighborOptions::default() };
    assert_eq!(ids(graph.neighbors("box", &deep)), vec!["d", "a"]);
    assert!(graph.neighbors("box", &NeighborOptions::default()).is_empty());
    assert!(graph.is_neighbor("box", "d", &deep));
}

#[test]
fn test_deep_loop_through_ancestor() {
    let mut graph = Graph::new();
    graph
        .add_cells(
            vec![Cell::element("p", "group"), Cell::element("child", "rect"), link("up", "child", "p")],
            &AddOptions::default(),
        )
        .unwrap();
    graph.embed("p", "child").unwrap();

    let up = graph.get_cell("up").unwrap();
    assert!(graph.link_has_loop(up, true));
    assert!(!graph.link_has_loop(up, false));
    // the loop makes p its own neighbor when looking deep
    let deep = NeighborOptions { deep: true, include_enclosed: true, ..NeighborOptions::default() };
    assert_eq!(ids(graph.neighbors("p", &deep)), vec!["child", "p"]);
}
