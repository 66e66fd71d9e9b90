//! Adjacency list index for outbound and inbound links.

use hashbrown::HashMap;
use indexmap::IndexSet;
use tracing::trace;

use crate::collection::CellCollection;
use crate::event::GraphEvent;
use crate::model::{Cell, CellId, CellKind, End, Endpoint};

/// Incrementally maintained adjacency structure.
///
/// - `nodes`: element ids currently in the graph
/// - `edges`: link ids currently in the graph
/// - `outgoing[node]`: links whose source references `node`
/// - `incoming[node]`: links whose target references `node`
///
/// Buckets are keyed by the referenced id and created lazily; a bucket is
/// dropped as soon as it empties. Endpoints without an id never enter a
/// bucket.
#[derive(Debug, Default)]
pub struct AdjacencyIndex {
    nodes: IndexSet<CellId>,
    edges: IndexSet<CellId>,
    outgoing: HashMap<CellId, IndexSet<CellId>>,
    incoming: HashMap<CellId, IndexSet<CellId>>,
    empty: IndexSet<CellId>,
}

impl AdjacencyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Event handling
    // ========================================================================

    /// Apply a collection event. Non-structural events are ignored.
    pub(crate) fn observe(&mut self, event: &GraphEvent<'_>) {
        match event {
            GraphEvent::Add { cell, .. } => self.on_add(cell),
            GraphEvent::Remove { cell, .. } => self.on_remove(cell),
            GraphEvent::Reset { cells } => self.rebuild(cells),
            GraphEvent::EndpointChange { link, end, previous } => {
                self.on_endpoint_change(link, *end, previous)
            }
            GraphEvent::Change { .. }
            | GraphEvent::BatchStart { .. }
            | GraphEvent::BatchStop { .. }
            | GraphEvent::Sort { .. } => {}
        }
    }

    fn on_add(&mut self, cell: &Cell) {
        match &cell.kind {
            CellKind::Element => {
                self.nodes.insert(cell.id.clone());
            }
            CellKind::Link { source, target } => {
                self.edges.insert(cell.id.clone());
                if let Some(s) = source.id() {
                    attach(&mut self.outgoing, s, &cell.id);
                }
                if let Some(t) = target.id() {
                    attach(&mut self.incoming, t, &cell.id);
                }
            }
        }
        trace!(cell = %cell.id, "index add");
    }

    fn on_remove(&mut self, cell: &Cell) {
        match &cell.kind {
            CellKind::Element => {
                self.nodes.shift_remove(&cell.id);
            }
            CellKind::Link { source, target } => {
                self.edges.shift_remove(&cell.id);
                if let Some(s) = source.id() {
                    detach(&mut self.outgoing, s, &cell.id);
                }
                if let Some(t) = target.id() {
                    detach(&mut self.incoming, t, &cell.id);
                }
            }
        }
        trace!(cell = %cell.id, "index remove");
    }

    /// Discard everything and replay `add` for every cell, in order.
    fn rebuild(&mut self, cells: &CellCollection) {
        self.nodes.clear();
        self.edges.clear();
        self.outgoing.clear();
        self.incoming.clear();
        for cell in cells {
            self.on_add(cell);
        }
        trace!(nodes = self.nodes.len(), edges = self.edges.len(), "index rebuilt");
    }

    fn on_endpoint_change(&mut self, link: &Cell, end: End, previous: &Endpoint) {
        if !self.edges.contains(&link.id) {
            return;
        }
        let buckets = match end {
            End::Source => &mut self.outgoing,
            End::Target => &mut self.incoming,
        };
        if let Some(prev) = previous.id() {
            detach(buckets, prev, &link.id);
        }
        if let Some(current) = link.endpoint(end).and_then(Endpoint::id) {
            attach(buckets, current, &link.id);
        }
        trace!(link = %link.id, end = end.key(), "index endpoint moved");
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Links whose source references `node`. Empty when there are none.
    pub fn outbound_edges(&self, node: &str) -> &IndexSet<CellId> {
        self.outgoing.get(node).unwrap_or(&self.empty)
    }

    /// Links whose target references `node`. Empty when there are none.
    pub fn inbound_edges(&self, node: &str) -> &IndexSet<CellId> {
        self.incoming.get(node).unwrap_or(&self.empty)
    }

    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains(id)
    }

    pub fn has_edge(&self, id: &str) -> bool {
        self.edges.contains(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &CellId> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = &CellId> {
        self.edges.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// No inbound links.
    pub fn is_source(&self, node: &str) -> bool {
        self.inbound_edges(node).is_empty()
    }

    /// No outbound links.
    pub fn is_sink(&self, node: &str) -> bool {
        self.outbound_edges(node).is_empty()
    }
}

fn attach(buckets: &mut HashMap<CellId, IndexSet<CellId>>, node: &CellId, link: &CellId) {
    buckets.entry(node.clone()).or_default().insert(link.clone());
}

fn detach(buckets: &mut HashMap<CellId, IndexSet<CellId>>, node: &CellId, link: &CellId) {
    if let Some(bucket) = buckets.get_mut(node) {
        bucket.shift_remove(link);
        if bucket.is_empty() {
            buckets.remove(node);
        }
    }
}
