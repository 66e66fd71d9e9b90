//! Traversal over the adjacency index: connected links, neighbors, search.
//!
//! All lookups read the index buckets; nothing here scans the collection
//! except `sources`/`sinks`, which walk the node set once.

use std::collections::VecDeque;

use hashbrown::HashSet;
use indexmap::IndexMap;

use super::{EmbedOptions, Graph, NeighborOptions, SearchOptions};
use crate::model::*;

/// What a search callback wants next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Expand this cell's neighbors.
    Continue,
    /// Do not expand this cell, but keep searching elsewhere.
    Prune,
    /// End the search.
    Stop,
}

/// Accumulates connected links, each at most once, in discovery order.
struct LinkCollector<'g> {
    graph: &'g Graph,
    inbound: bool,
    outbound: bool,
    indirect: bool,
    seen: HashSet<&'g str>,
    links: Vec<&'g Cell>,
}

impl<'g> LinkCollector<'g> {
    fn new(graph: &'g Graph, options: &NeighborOptions) -> Self {
        Self {
            graph,
            inbound: options.direction.includes_incoming(),
            outbound: options.direction.includes_outgoing(),
            indirect: options.indirect,
            seen: HashSet::new(),
            links: Vec::new(),
        }
    }

    fn push(&mut self, link: &'g Cell) -> bool {
        if !self.seen.insert(link.id.as_str()) {
            return false;
        }
        self.links.push(link);
        true
    }

    fn follow(&mut self, link: &'g Cell) {
        if !self.indirect {
            return;
        }
        if self.inbound {
            self.add_inbounds(link);
        }
        if self.outbound {
            self.add_outbounds(link);
        }
    }

    fn add_outbounds(&mut self, cell: &'g Cell) {
        let graph = self.graph;
        for edge in graph.index().outbound_edges(cell.id.as_str()) {
            if let Some(link) = graph.cells.get(edge.as_str()) {
                if self.push(link) {
                    self.follow(link);
                }
            }
        }
        // a link pointing at another link continues through it
        if self.indirect && cell.is_link() {
            if let Some(next) = cell.target_id().and_then(|t| graph.cells.get(t.as_str())) {
                if next.is_link() && self.push(next) {
                    self.add_outbounds(next);
                }
            }
        }
    }

    fn add_inbounds(&mut self, cell: &'g Cell) {
        let graph = self.graph;
        for edge in graph.index().inbound_edges(cell.id.as_str()) {
            if let Some(link) = graph.cells.get(edge.as_str()) {
                if self.push(link) {
                    self.follow(link);
                }
            }
        }
        if self.indirect && cell.is_link() {
            if let Some(prev) = cell.source_id().and_then(|s| graph.cells.get(s.as_str())) {
                if prev.is_link() && self.push(prev) {
                    self.add_inbounds(prev);
                }
            }
        }
    }
}

impl Graph {
    // ========================================================================
    // Links and neighbors
    // ========================================================================

    /// Links attached to `id`, each reported once.
    ///
    /// `deep` adds links of embedded descendants; links entirely inside the
    /// embedded set are skipped unless `include_enclosed`. `indirect` follows
    /// link-to-link chains.
    pub fn connected_links(&self, id: &str, options: &NeighborOptions) -> Vec<&Cell> {
        let Some(cell) = self.cells.get(id) else {
            return Vec::new();
        };
        let mut collector = LinkCollector::new(self, options);
        if collector.outbound {
            collector.add_outbounds(cell);
        }
        if collector.inbound {
            collector.add_inbounds(cell);
        }

        if options.deep {
            let embedded = self.embedded_cells(id, &EmbedOptions { deep: true, breadth_first: false });
            let enclosed: HashSet<&str> = embedded
                .iter()
                .filter(|c| c.is_element())
                .map(|c| c.id.as_str())
                .collect();
            let is_enclosed = |link: &Cell| {
                let inside = |end: Option<&CellId>| end.is_some_and(|e| enclosed.contains(e.as_str()));
                inside(link.source_id()) && inside(link.target_id())
            };

            for child in embedded.iter().filter(|c| !c.is_link()) {
                let index = self.index();
                let mut buckets = Vec::with_capacity(2);
                if collector.outbound {
                    buckets.push(index.outbound_edges(child.id.as_str()));
                }
                if collector.inbound {
                    buckets.push(index.inbound_edges(child.id.as_str()));
                }
                for edge in buckets.into_iter().flatten() {
                    let Some(link) = self.cells.get(edge.as_str()) else {
                        continue;
                    };
                    if !options.include_enclosed && is_enclosed(link) {
                        continue;
                    }
                    collector.push(link);
                }
            }
        }

        collector.links
    }

    /// Elements linked to `id`, deduplicated, in discovery order.
    ///
    /// `id` itself is a neighbor only through a loop link. With `deep`, cells
    /// embedded in `id` are not neighbors, and a link between a cell and its
    /// own ancestor counts as a loop. When `id` is a link, its own endpoint
    /// elements are neighbors too.
    pub fn neighbors(&self, id: &str, options: &NeighborOptions) -> Vec<&Cell> {
        let Some(cell) = self.cells.get(id) else {
            return Vec::new();
        };
        let inbound = options.direction.includes_incoming();
        let outbound = options.direction.includes_outgoing();
        let mut found: IndexMap<&str, &Cell> = IndexMap::new();

        for link in self.connected_links(id, options) {
            let looped = self.link_has_loop(link, options.deep);
            if inbound {
                self.consider(&mut found, link.source_id(), cell, looped, options.deep);
            }
            if outbound {
                self.consider(&mut found, link.target_id(), cell, looped, options.deep);
            }
        }

        if cell.is_link() {
            let ends = [(inbound, cell.source_id()), (outbound, cell.target_id())];
            for (wanted, end) in ends {
                let Some(other) = end.filter(|_| wanted).and_then(|e| self.cells.get(e.as_str())) else {
                    continue;
                };
                if other.is_element() {
                    found.entry(other.id.as_str()).or_insert(other);
                }
            }
        }

        found.into_values().collect()
    }

    fn consider<'g>(
        &'g self,
        found: &mut IndexMap<&'g str, &'g Cell>,
        end: Option<&CellId>,
        origin: &Cell,
        looped: bool,
        deep: bool,
    ) {
        let Some(other) = end.and_then(|e| self.cells.get(e.as_str())) else {
            return;
        };
        if !other.is_element() || found.contains_key(other.id.as_str()) {
            return;
        }
        let include = looped
            || (other.id != origin.id
                && !(deep && self.is_embedded_in(other.id.as_str(), origin.id.as_str(), true)));
        if include {
            found.insert(other.id.as_str(), other);
        }
    }

    /// Whether a link starts and ends at the same cell. With `deep`, a link
    /// between a cell and one of its ancestors is a loop too.
    pub fn link_has_loop(&self, link: &Cell, deep: bool) -> bool {
        let (Some(source), Some(target)) = (link.source_id(), link.target_id()) else {
            return false;
        };
        if source == target {
            return true;
        }
        if !deep || !self.cells.contains(source.as_str()) || !self.cells.contains(target.as_str()) {
            return false;
        }
        self.is_embedded_in(source.as_str(), target.as_str(), true)
            || self.is_embedded_in(target.as_str(), source.as_str(), true)
    }

    /// Whether `other` is linked to `id` in the requested direction.
    pub fn is_neighbor(&self, id: &str, other: &str, options: &NeighborOptions) -> bool {
        let inbound = options.direction.includes_incoming();
        let outbound = options.direction.includes_outgoing();
        self.connected_links(id, options).into_iter().any(|link| {
            (inbound && link.source_id().is_some_and(|s| s.as_str() == other))
                || (outbound && link.target_id().is_some_and(|t| t.as_str() == other))
        })
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Breadth-first search from `start`. Each reachable cell is visited once
    /// with its distance (edge count) from `start`.
    pub fn bfs<'g, F>(&'g self, start: &str, options: &NeighborOptions, mut visit: F)
    where
        F: FnMut(&'g Cell, usize) -> Visit,
    {
        let Some(start) = self.cells.get(start) else {
            return;
        };
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<(&Cell, usize)> = VecDeque::from([(start, 0)]);
        while let Some((cell, distance)) = queue.pop_front() {
            if !visited.insert(cell.id.as_str()) {
                continue;
            }
            match visit(cell, distance) {
                Visit::Stop => return,
                Visit::Prune => continue,
                Visit::Continue => {}
            }
            for neighbor in self.neighbors(cell.id.as_str(), options) {
                if !visited.contains(neighbor.id.as_str()) {
                    queue.push_back((neighbor, distance + 1));
                }
            }
        }
    }

    /// Depth-first search from `start`; the first neighbor found is
    /// expanded first.
    pub fn dfs<'g, F>(&'g self, start: &str, options: &NeighborOptions, mut visit: F)
    where
        F: FnMut(&'g Cell, usize) -> Visit,
    {
        let Some(start) = self.cells.get(start) else {
            return;
        };
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<(&Cell, usize)> = vec![(start, 0)];
        while let Some((cell, distance)) = stack.pop() {
            if !visited.insert(cell.id.as_str()) {
                continue;
            }
            match visit(cell, distance) {
                Visit::Stop => return,
                Visit::Prune => continue,
                Visit::Continue => {}
            }
            let neighbors = self.neighbors(cell.id.as_str(), options);
            for neighbor in neighbors.into_iter().rev() {
                if !visited.contains(neighbor.id.as_str()) {
                    stack.push((neighbor, distance + 1));
                }
            }
        }
    }

    /// Dispatch to [`Graph::bfs`] or [`Graph::dfs`].
    pub fn search<'g, F>(&'g self, start: &str, options: &SearchOptions, visit: F)
    where
        F: FnMut(&'g Cell, usize) -> Visit,
    {
        if options.breadth_first {
            self.bfs(start, &options.neighbors, visit);
        } else {
            self.dfs(start, &options.neighbors, visit);
        }
    }

    /// Every cell reachable from `id` along outgoing links.
    pub fn successors(&self, id: &str, options: &SearchOptions) -> Vec<&Cell> {
        self.reachable(id, options, Direction::Outgoing)
    }

    /// Every cell that reaches `id` along outgoing links.
    pub fn predecessors(&self, id: &str, options: &SearchOptions) -> Vec<&Cell> {
        self.reachable(id, options, Direction::Incoming)
    }

    pub fn is_successor(&self, id: &str, other: &str, options: &SearchOptions) -> bool {
        self.reaches(id, other, options, Direction::Outgoing)
    }

    pub fn is_predecessor(&self, id: &str, other: &str, options: &SearchOptions) -> bool {
        self.reaches(id, other, options, Direction::Incoming)
    }

    fn reachable(&self, id: &str, options: &SearchOptions, direction: Direction) -> Vec<&Cell> {
        let options = directed(options, direction);
        let mut found = Vec::new();
        self.search(id, &options, |cell, _| {
            if cell.id.as_str() != id {
                found.push(cell);
            }
            Visit::Continue
        });
        found
    }

    fn reaches(&self, id: &str, other: &str, options: &SearchOptions, direction: Direction) -> bool {
        let options = directed(options, direction);
        let mut hit = false;
        self.search(id, &options, |cell, _| {
            if cell.id.as_str() == other && cell.id.as_str() != id {
                hit = true;
                return Visit::Stop;
            }
            Visit::Continue
        });
        hit
    }

    // ========================================================================
    // Roots and leaves
    // ========================================================================

    /// Elements with no inbound links.
    pub fn sources(&self) -> Vec<&Cell> {
        let index = self.index();
        index
            .nodes()
            .filter(|id| index.is_source(id.as_str()))
            .filter_map(|id| self.cells.get(id.as_str()))
            .collect()
    }

    /// Elements with no outbound links.
    pub fn sinks(&self) -> Vec<&Cell> {
        let index = self.index();
        index
            .nodes()
            .filter(|id| index.is_sink(id.as_str()))
            .filter_map(|id| self.cells.get(id.as_str()))
            .collect()
    }

    /// Whether `id` is an element with no inbound links.
    pub fn is_source(&self, id: &str) -> bool {
        self.index().has_node(id) && self.index().is_source(id)
    }

    /// Whether `id` is an element with no outbound links.
    pub fn is_sink(&self, id: &str) -> bool {
        self.index().has_node(id) && self.index().is_sink(id)
    }
}

fn directed(options: &SearchOptions, direction: Direction) -> SearchOptions {
    let mut options = *options;
    options.neighbors.direction = direction;
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AddOptions;
    use pretty_assertions::assert_eq;

    fn link(id: &str, source: &str, target: &str) -> Cell {
        Cell::link(id, "link", Endpoint::cell(source), Endpoint::cell(target))
    }

    /// a → b → c, a → c
    fn triangle() -> Graph {
        let mut graph = Graph::new();
        graph
            .add_cells(
                vec![
                    Cell::element("a", "rect"),
                    Cell::element("b", "rect"),
                    Cell::element("c", "rect"),
                    link("ab", "a", "b"),
                    link("bc", "b", "c"),
                    link("ac", "a", "c"),
                ],
                &AddOptions::default(),
            )
            .unwrap();
        graph
    }

    fn ids(cells: Vec<&Cell>) -> Vec<&str> {
        cells.into_iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_connected_links_by_direction() {
        let graph = triangle();
        assert_eq!(ids(graph.connected_links("a", &NeighborOptions::outgoing())), vec!["ab", "ac"]);
        assert_eq!(ids(graph.connected_links("c", &NeighborOptions::incoming())), vec!["bc", "ac"]);
        assert_eq!(ids(graph.connected_links("b", &NeighborOptions::default())), vec!["bc", "ab"]);
    }

    #[test]
    fn test_neighbors_dedup() {
        let mut graph = triangle();
        graph.add_cell(link("ab2", "a", "b"), &AddOptions::default()).unwrap();
        assert_eq!(ids(graph.neighbors("a", &NeighborOptions::outgoing())), vec!["b", "c"]);
        assert_eq!(ids(graph.neighbors("c", &NeighborOptions::default())), vec!["b", "a"]);
    }

    #[test]
    fn test_self_loop_neighbor_once() {
        let mut graph = Graph::new();
        graph
            .add_cells(vec![Cell::element("a", "rect"), link("aa", "a", "a")], &AddOptions::default())
            .unwrap();
        assert_eq!(ids(graph.connected_links("a", &NeighborOptions::default())), vec!["aa"]);
        assert_eq!(ids(graph.neighbors("a", &NeighborOptions::default())), vec!["a"]);
    }

    #[test]
    fn test_is_neighbor() {
        let graph = triangle();
        assert!(graph.is_neighbor("a", "b", &NeighborOptions::outgoing()));
        assert!(!graph.is_neighbor("a", "b", &NeighborOptions::incoming()));
        assert!(graph.is_neighbor("b", "a", &NeighborOptions::default()));
    }

    #[test]
    fn test_link_neighbors_include_own_endpoints() {
        let graph = triangle();
        assert_eq!(ids(graph.neighbors("ab", &NeighborOptions::default())), vec!["a", "b"]);
    }

    #[test]
    fn test_bfs_distances() {
        let graph = triangle();
        let mut seen = Vec::new();
        graph.bfs("a", &NeighborOptions::outgoing(), |cell, distance| {
            seen.push((cell.id.as_str(), distance));
            Visit::Continue
        });
        assert_eq!(seen, vec![("a", 0), ("b", 1), ("c", 1)]);
    }

    #[test]
    fn test_dfs_prune_and_stop() {
        let graph = triangle();
        let mut seen = Vec::new();
        graph.dfs("a", &NeighborOptions::outgoing(), |cell, _| {
            seen.push(cell.id.as_str());
            if cell.id.as_str() == "b" { Visit::Prune } else { Visit::Continue }
        });
        assert_eq!(seen, vec!["a", "b", "c"]);

        let mut seen = Vec::new();
        graph.dfs("a", &NeighborOptions::outgoing(), |cell, _| {
            seen.push(cell.id.as_str());
            Visit::Stop
        });
        assert_eq!(seen, vec!["a"]);
    }

    #[test]
    fn test_successors_and_predecessors() {
        let graph = triangle();
        assert_eq!(ids(graph.successors("a", &SearchOptions::default())), vec!["b", "c"]);
        assert_eq!(ids(graph.predecessors("c", &SearchOptions::default())), vec!["b", "a"]);
        assert!(graph.is_successor("a", "c", &SearchOptions::default()));
        assert!(!graph.is_successor("c", "a", &SearchOptions::default()));
        assert!(graph.is_predecessor("c", "a", &SearchOptions::default()));
    }

    #[test]
    fn test_sources_and_sinks() {
        let graph = triangle();
        assert_eq!(ids(graph.sources()), vec!["a"]);
        assert_eq!(ids(graph.sinks()), vec!["c"]);
        assert!(graph.is_source("a"));
        assert!(!graph.is_source("ab"));
        assert!(graph.is_sink("c"));
    }

    #[test]
    fn test_deep_links_skip_enclosed() {
        let mut graph = triangle();
        graph.add_cell(Cell::element("p", "group"), &AddOptions::default()).unwrap();
        graph.embed("p", "a").unwrap();
        graph.embed("p", "b").unwrap();

        let deep = NeighborOptions { deep: true, ..NeighborOptions::default() };
        assert_eq!(ids(graph.connected_links("p", &deep)), vec!["ac", "bc"]);

        let enclosed = NeighborOptions { include_enclosed: true, ..deep };
        assert_eq!(ids(graph.connected_links("p", &enclosed)), vec!["ab", "ac", "bc"]);

        assert_eq!(ids(graph.neighbors("p", &deep)), vec!["c"]);
    }
}
