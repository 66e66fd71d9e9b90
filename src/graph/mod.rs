//! # Graph
//!
//! The graph owns the cell collection, the adjacency index, the batch
//! counters and the layer registry, and is the only place that mutates any
//! of them. Every mutation follows the same path:
//!
//! ```text
//! mutate collection → GraphEvent → AdjacencyIndex → subscribers
//! ```
//!
//! all within one call, so a query issued right after (or from a
//! subscriber) always sees an index consistent with the collection.
//!
//! | Module | Operations |
//! |--------|------------|
//! | `lifecycle` | add, reset, remove, replace, sync, clear |
//! | `embedding` | embed, unembed, ancestors, embedded cells |
//! | `traversal` | neighbors, connected links, BFS/DFS, successors |
//! | `subgraph` | subgraph closure, cloning |
//! | `spatial` | bounding boxes, point/area lookups |

mod embedding;
mod lifecycle;
mod spatial;
mod subgraph;
mod traversal;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::batch::BatchTracker;
use crate::collection::CellCollection;
use crate::event::{EventBus, GraphEvent, Subscriber, SubscriberId};
use crate::index::AdjacencyIndex;
use crate::layer::{DEFAULT_LAYER, LayerRegistry};
use crate::model::cell::{parse_id, parse_ids};
use crate::model::*;
use crate::{Error, Result};

pub use spatial::SearchBy;
pub use traversal::Visit;

// ============================================================================
// Configuration
// ============================================================================

/// Graph-wide configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphConfig {
    /// Layer for cells that do not name one.
    pub default_layer: String,
    /// Additional layers registered at construction, in order.
    pub layers: Vec<String>,
    /// Re-sort a layer when a cell is added below its current maximum z.
    pub sort_on_add: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            default_layer: DEFAULT_LAYER.to_owned(),
            layers: Vec::new(),
            sort_on_add: true,
        }
    }
}

// ============================================================================
// Operation options
// ============================================================================

/// Options for adding cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOptions {
    /// Assign `max z + 1` in the target layer to cells without a z.
    pub ensure_z_index: bool,
    /// Allow re-sorting the target layer after insertion.
    pub sort: bool,
    /// Position hint within a bulk add, counting down to 0 on the last
    /// cell. Set by [`Graph::add_cells`] and carried on the `Add` event for
    /// subscribers that lay cells out in arrival order; z assignment does
    /// not read it.
    pub position: Option<usize>,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self { ensure_z_index: true, sort: true, position: None }
    }
}

/// Options for removing cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Detach connected links (endpoint becomes a point) instead of removing them.
    pub disconnect_links: bool,
    /// Removal is half of a replace: connected links and embeds stay.
    pub replace: bool,
    /// Removal is part of `clear`: no cascade at all.
    pub clear: bool,
}

/// Options for upserting cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Remove cells that are absent from the incoming set.
    pub remove: bool,
    /// Sort every layer whose z-order may have changed, once, at the end.
    pub sort: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { remove: false, sort: true }
    }
}

/// Options shared by neighbor and connected-link queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeighborOptions {
    pub direction: Direction,
    /// Also consider links of embedded descendants.
    pub deep: bool,
    /// Follow link-to-link connections.
    pub indirect: bool,
    /// With `deep`, keep links whose both ends lie inside the embedded set.
    pub include_enclosed: bool,
}

impl NeighborOptions {
    pub fn outgoing() -> Self {
        Self { direction: Direction::Outgoing, ..Self::default() }
    }

    pub fn incoming() -> Self {
        Self { direction: Direction::Incoming, ..Self::default() }
    }
}

/// Options for graph search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub neighbors: NeighborOptions,
    /// Breadth-first instead of depth-first.
    pub breadth_first: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubgraphOptions {
    /// Pull in every embedded descendant of the seed cells.
    pub deep: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmbedOptions {
    pub deep: bool,
    pub breadth_first: bool,
}

// ============================================================================
// Graph
// ============================================================================

/// The live graph: cells plus the indexes kept in sync with them.
#[derive(Debug)]
pub struct Graph {
    config: GraphConfig,
    cells: CellCollection,
    bus: EventBus,
    batches: BatchTracker,
    layers: LayerRegistry,
    attributes: PropertyMap,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    pub fn with_config(config: GraphConfig) -> Self {
        let mut layers = LayerRegistry::new(config.default_layer.clone());
        for layer in &config.layers {
            layers.add(layer.clone());
        }
        Self {
            config,
            cells: CellCollection::new(),
            bus: EventBus::default(),
            batches: BatchTracker::new(),
            layers,
            attributes: PropertyMap::new(),
        }
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Graph-level (non-cell) attributes, carried through the document.
    pub fn attributes(&self) -> &PropertyMap {
        &self.attributes
    }

    pub fn set_graph_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Register a callback for every graph event.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriberId
    where
        F: FnMut(&GraphEvent<'_>) + 'static,
    {
        self.bus.subscribe(Subscriber::new(callback))
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.bus.unsubscribe(id)
    }

    // ========================================================================
    // Batches
    // ========================================================================

    pub fn start_batch(&mut self, name: &str, data: PropertyMap) {
        let depth = self.batches.start(name);
        debug!(batch = name, depth, "batch start");
        self.bus.dispatch(&GraphEvent::BatchStart { name, data: &data });
    }

    pub fn stop_batch(&mut self, name: &str, data: PropertyMap) {
        let depth = self.batches.stop(name);
        debug!(batch = name, depth, "batch stop");
        self.bus.dispatch(&GraphEvent::BatchStop { name, data: &data });
    }

    /// With no names: whether any batch is running. With names: whether at
    /// least one of them is.
    pub fn has_active_batch(&self, names: &[&str]) -> bool {
        self.batches.has_active(names)
    }

    pub fn batches(&self) -> &BatchTracker {
        &self.batches
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn get_cell(&self, id: &str) -> Option<&Cell> {
        self.cells.get(id)
    }

    pub fn has_cell(&self, id: &str) -> bool {
        self.cells.contains(id)
    }

    pub fn cells(&self) -> &CellCollection {
        &self.cells
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn elements(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| c.is_element())
    }

    pub fn links(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| c.is_link())
    }

    pub fn first_cell(&self) -> Option<&Cell> {
        self.cells.first()
    }

    pub fn last_cell(&self) -> Option<&Cell> {
        self.cells.last()
    }

    /// Read-only view of the adjacency index.
    pub fn index(&self) -> &AdjacencyIndex {
        self.bus.index()
    }

    pub fn outbound_edges(&self, id: &str) -> &IndexSet<CellId> {
        self.index().outbound_edges(id)
    }

    pub fn inbound_edges(&self, id: &str) -> &IndexSet<CellId> {
        self.index().inbound_edges(id)
    }

    // ========================================================================
    // Layers
    // ========================================================================

    pub fn layers(&self) -> &LayerRegistry {
        &self.layers
    }

    pub fn add_layer(&mut self, id: impl Into<String>) -> bool {
        self.layers.add(id)
    }

    pub fn set_default_layer(&mut self, id: impl Into<String>) {
        self.layers.set_default(id);
    }

    /// Cells of a layer (default layer when `None`) in collection order.
    pub fn layer_cells<'a>(&'a self, layer: Option<&'a str>) -> Vec<&'a Cell> {
        let layer = layer.unwrap_or(self.layers.default_layer());
        self.layers.cells(layer, &self.cells).collect()
    }

    pub fn max_z_index(&self, layer: Option<&str>) -> i64 {
        self.layers.max_z(layer.unwrap_or(self.layers.default_layer()), &self.cells)
    }

    pub fn min_z_index(&self, layer: Option<&str>) -> i64 {
        self.layers.min_z(layer.unwrap_or(self.layers.default_layer()), &self.cells)
    }

    /// Stably reorder a layer's cells by z and announce it.
    pub fn sort_layer(&mut self, layer: &str) {
        if let Some((positions, ordered)) = self.layers.sort_plan(layer, &self.cells) {
            self.cells.reorder(&positions, &ordered);
        }
        debug!(layer, "layer sorted");
        self.bus.dispatch(&GraphEvent::Sort { layer });
    }

    fn layer_name(&self, id: &str) -> Option<String> {
        self.cells.get(id).map(|c| self.layers.layer_of(c).to_owned())
    }

    // ========================================================================
    // Attribute mutation
    // ========================================================================

    /// Set one attribute. Reserved keys update the typed field they map to;
    /// `source`/`target` move the link in the index.
    pub fn set_attribute(&mut self, id: &str, key: &str, value: impl Into<Value>) -> Result<()> {
        let mut touched = IndexSet::new();
        self.apply_attribute(id, key, value.into(), &mut touched).map(|_| ())
    }

    /// Apply a sparse patch: keys absent from `patch` are left alone.
    pub fn set_attributes(&mut self, id: &str, patch: PropertyMap) -> Result<()> {
        let mut touched = IndexSet::new();
        self.apply_patch(id, patch, &mut touched)
    }

    pub fn set_source(&mut self, id: &str, endpoint: Endpoint) -> Result<()> {
        self.apply_endpoint(id, End::Source, endpoint).map(|_| ())
    }

    pub fn set_target(&mut self, id: &str, endpoint: Endpoint) -> Result<()> {
        self.apply_endpoint(id, End::Target, endpoint).map(|_| ())
    }

    pub(crate) fn apply_patch(
        &mut self,
        id: &str,
        patch: PropertyMap,
        touched: &mut IndexSet<String>,
    ) -> Result<()> {
        for (key, value) in patch {
            self.apply_attribute(id, &key, value, touched)?;
        }
        Ok(())
    }

    /// Returns whether the value changed. Layers whose z-order may have been
    /// invalidated are added to `touched`.
    pub(crate) fn apply_attribute(
        &mut self,
        id: &str,
        key: &str,
        value: Value,
        touched: &mut IndexSet<String>,
    ) -> Result<bool> {
        if key == "source" || key == "target" {
            let end = if key == "source" { End::Source } else { End::Target };
            return self.apply_endpoint(id, end, Endpoint::from_value(&value));
        }

        let default_layer = self.layers.default_layer().to_owned();
        let cell = self
            .cells
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("Cell {id}")))?;

        match key {
            "id" => {
                if parse_id(&value).as_ref() != Some(&cell.id) {
                    return Err(Error::Validation(format!("cell {id} cannot change its id")));
                }
                return Ok(false);
            }
            "type" => {
                let cell_type = match value {
                    Value::String(t) if !t.is_empty() => t,
                    _ => return Err(Error::Validation("cell type must be a string".into())),
                };
                if cell.cell_type == cell_type {
                    return Ok(false);
                }
                cell.cell_type = cell_type;
            }
            "parent" => {
                let parent = parse_id(&value);
                if cell.parent == parent {
                    return Ok(false);
                }
                cell.parent = parent;
            }
            "embeds" => {
                let embeds = parse_ids(&value);
                if cell.embeds == embeds {
                    return Ok(false);
                }
                cell.embeds = embeds;
            }
            "z" => {
                let z = match &value {
                    Value::Null => None,
                    other => Some(other.as_int().ok_or_else(|| {
                        Error::Validation(format!("z must be an integer, got {}", other.type_name()))
                    })?),
                };
                if cell.z == z {
                    return Ok(false);
                }
                cell.z = z;
                touched.insert(cell.layer.clone().unwrap_or(default_layer));
            }
            "layer" => {
                let layer = match value {
                    Value::String(l) => Some(l),
                    Value::Null => None,
                    other => {
                        return Err(Error::Validation(format!(
                            "layer must be a string, got {}",
                            other.type_name()
                        )));
                    }
                };
                if cell.layer == layer {
                    return Ok(false);
                }
                let before = std::mem::replace(&mut cell.layer, layer);
                touched.insert(before.unwrap_or_else(|| default_layer.clone()));
                touched.insert(cell.layer.clone().unwrap_or(default_layer));
            }
            _ => {
                if cell.attributes.get(key) == Some(&value) {
                    return Ok(false);
                }
                cell.attributes.insert(key.to_owned(), value);
            }
        }

        if let Some(cell) = self.cells.get(id) {
            self.bus.dispatch(&GraphEvent::Change { cell, attribute: key });
        }
        Ok(true)
    }

    /// Reassign a link endpoint, moving the link between index buckets.
    pub(crate) fn apply_endpoint(&mut self, id: &str, end: End, endpoint: Endpoint) -> Result<bool> {
        let cell = self
            .cells
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("Cell {id}")))?;
        let slot = cell.endpoint_mut(end).ok_or_else(|| {
            Error::Validation(format!("element {id} has no {} endpoint", end.key()))
        })?;
        if *slot == endpoint {
            return Ok(false);
        }
        let previous = std::mem::replace(slot, endpoint);

        if let Some(link) = self.cells.get(id) {
            self.bus.dispatch(&GraphEvent::EndpointChange { link, end, previous: &previous });
            self.bus.dispatch(&GraphEvent::Change { cell: link, attribute: end.key() });
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recorder(graph: &mut Graph) -> Rc<RefCell<Vec<String>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        graph.subscribe(move |event| {
            let entry = match event {
                GraphEvent::Change { cell, attribute } => format!("change:{attribute}:{}", cell.id),
                GraphEvent::BatchStart { name, .. } => format!("start:{name}"),
                GraphEvent::BatchStop { name, .. } => format!("stop:{name}"),
                other => other.name().to_owned(),
            };
            sink.borrow_mut().push(entry);
        });
        log
    }

    #[test]
    fn test_config_defaults() {
        let config = GraphConfig::default();
        assert_eq!(config.default_layer, "cells");
        assert!(config.sort_on_add);

        let parsed: GraphConfig = serde_json::from_str(r#"{"defaultLayer": "main", "layers": ["back"]}"#).unwrap();
        assert_eq!(parsed.default_layer, "main");
        assert!(parsed.sort_on_add);

        let graph = Graph::with_config(parsed);
        assert_eq!(graph.layers().default_layer(), "main");
        assert!(graph.layers().contains("back"));
    }

    #[test]
    fn test_batch_events_carry_name() {
        let mut graph = Graph::new();
        let log = recorder(&mut graph);
        graph.start_batch("x", PropertyMap::new());
        graph.start_batch("x", PropertyMap::new());
        graph.stop_batch("x", PropertyMap::new());
        assert!(graph.has_active_batch(&["x"]));
        graph.stop_batch("x", PropertyMap::new());
        assert!(!graph.has_active_batch(&[]));
        assert_eq!(*log.borrow(), vec!["start:x", "start:x", "stop:x", "stop:x"]);
    }

    #[test]
    fn test_set_attribute_emits_only_on_change() {
        let mut graph = Graph::new();
        graph.add_cell(Cell::element("a", "rect"), &AddOptions::default()).unwrap();
        let log = recorder(&mut graph);

        graph.set_attribute("a", "label", "A").unwrap();
        graph.set_attribute("a", "label", "A").unwrap();
        assert_eq!(*log.borrow(), vec!["change:label:a"]);
        assert_eq!(graph.get_cell("a").and_then(|c| c.get("label")), Some(&Value::from("A")));
    }

    #[test]
    fn test_set_attribute_on_missing_cell() {
        let mut graph = Graph::new();
        assert!(matches!(graph.set_attribute("nope", "x", 1), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_endpoint_on_element_is_rejected() {
        let mut graph = Graph::new();
        graph.add_cell(Cell::element("a", "rect"), &AddOptions::default()).unwrap();
        assert!(matches!(
            graph.set_source("a", Endpoint::cell("b")),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_set_source_moves_link_in_index() {
        let mut graph = Graph::new();
        graph
            .add_cells(
                vec![
                    Cell::element("a", "rect"),
                    Cell::element("b", "rect"),
                    Cell::element("c", "rect"),
                    Cell::link("l", "link", Endpoint::cell("a"), Endpoint::cell("b")),
                ],
                &AddOptions::default(),
            )
            .unwrap();
        let log = recorder(&mut graph);

        graph.set_source("l", Endpoint::cell("c")).unwrap();
        assert!(graph.outbound_edges("a").is_empty());
        assert!(graph.outbound_edges("c").contains("l"));
        assert_eq!(*log.borrow(), vec!["endpoint-change", "change:source:l"]);
    }

    #[test]
    fn test_z_change_reports_touched_layer() {
        let mut graph = Graph::new();
        graph.add_cell(Cell::element("a", "rect"), &AddOptions::default()).unwrap();
        let mut touched = IndexSet::new();
        assert!(graph.apply_attribute("a", "z", Value::Int(7), &mut touched).unwrap());
        assert!(touched.contains("cells"));

        let mut touched = IndexSet::new();
        graph.apply_attribute("a", "layer", Value::from("front"), &mut touched).unwrap();
        assert!(touched.contains("cells") && touched.contains("front"));
    }

    #[test]
    fn test_sort_layer_orders_by_z() {
        let mut graph = Graph::with_config(GraphConfig { sort_on_add: false, ..GraphConfig::default() });
        graph.add_cell(Cell::element("a", "rect").with_z(5), &AddOptions::default()).unwrap();
        graph.add_cell(Cell::element("b", "rect").with_z(1), &AddOptions::default()).unwrap();
        let order: Vec<_> = graph.cells().ids().map(CellId::as_str).collect();
        assert_eq!(order, vec!["a", "b"]);

        graph.sort_layer("cells");
        let order: Vec<_> = graph.cells().ids().map(CellId::as_str).collect();
        assert_eq!(order, vec!["b", "a"]);
        assert_eq!(graph.min_z_index(None), 1);
        assert_eq!(graph.max_z_index(None), 5);
    }

    #[test]
    fn test_layer_cells_by_layer() {
        let mut graph = Graph::new();
        graph.add_cell(Cell::element("a", "rect"), &AddOptions::default()).unwrap();
        graph.add_cell(Cell::element("f", "rect").with_layer("front"), &AddOptions::default()).unwrap();
        graph.add_cell(Cell::element("b", "rect"), &AddOptions::default()).unwrap();

        let ids = |cells: Vec<&Cell>| cells.iter().map(|c| c.id.as_str().to_owned()).collect::<Vec<_>>();
        assert_eq!(ids(graph.layer_cells(None)), vec!["a", "b"]);
        let front = String::from("front");
        assert_eq!(ids(graph.layer_cells(Some(front.as_str()))), vec!["f"]);
        assert!(graph.layer_cells(Some("back")).is_empty());
    }
}
