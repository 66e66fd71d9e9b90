//! Layers: named partitions of the cell collection ordered by z.
//!
//! A cell belongs to the layer named by its `layer` attribute, or to the
//! default layer when it names none. Unknown layer names are accepted and
//! behave like registered ones.

use indexmap::IndexSet;

use crate::collection::CellCollection;
use crate::model::{Cell, CellId};

/// Name of the default layer unless configured otherwise.
pub const DEFAULT_LAYER: &str = "cells";

#[derive(Debug, Clone)]
pub struct LayerRegistry {
    layers: IndexSet<String>,
    default: String,
}

impl Default for LayerRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_LAYER)
    }
}

impl LayerRegistry {
    pub fn new(default: impl Into<String>) -> Self {
        let default = default.into();
        let mut layers = IndexSet::new();
        layers.insert(default.clone());
        Self { layers, default }
    }

    pub fn default_layer(&self) -> &str {
        &self.default
    }

    /// Make `id` the default layer, registering it if needed.
    pub fn set_default(&mut self, id: impl Into<String>) {
        let id = id.into();
        self.layers.insert(id.clone());
        self.default = id;
    }

    /// Register a layer. Returns false if it was already known.
    pub fn add(&mut self, id: impl Into<String>) -> bool {
        self.layers.insert(id.into())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.layers.contains(id)
    }

    /// Registered layer ids in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(String::as_str)
    }

    pub fn layer_of<'a>(&'a self, cell: &'a Cell) -> &'a str {
        cell.layer.as_deref().unwrap_or(&self.default)
    }

    /// Cells of `layer` in collection order.
    pub fn cells<'a>(
        &'a self,
        layer: &'a str,
        cells: &'a CellCollection,
    ) -> impl Iterator<Item = &'a Cell> + 'a {
        cells.iter().filter(move |cell| self.layer_of(cell) == layer)
    }

    /// Highest z in the layer; 0 when the layer is empty.
    pub fn max_z(&self, layer: &str, cells: &CellCollection) -> i64 {
        self.cells(layer, cells).map(|c| c.z.unwrap_or(0)).max().unwrap_or(0)
    }

    /// Lowest z in the layer; 0 when the layer is empty.
    pub fn min_z(&self, layer: &str, cells: &CellCollection) -> i64 {
        self.cells(layer, cells).map(|c| c.z.unwrap_or(0)).min().unwrap_or(0)
    }

    /// Positions the layer occupies in the collection and the ids that
    /// should fill them, stably ordered by z. `None` when already sorted.
    pub(crate) fn sort_plan(&self, layer: &str, cells: &CellCollection) -> Option<(Vec<usize>, Vec<CellId>)> {
        let mut positions = Vec::new();
        let mut members: Vec<(i64, CellId)> = Vec::new();
        for (position, cell) in cells.iter().enumerate() {
            if self.layer_of(cell) == layer {
                positions.push(position);
                members.push((cell.z.unwrap_or(0), cell.id.clone()));
            }
        }
        if members.windows(2).all(|w| w[0].0 <= w[1].0) {
            return None;
        }
        members.sort_by_key(|(z, _)| *z);
        Some((positions, members.into_iter().map(|(_, id)| id).collect()))
    }
}
