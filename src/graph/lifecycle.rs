//! Cell lifecycle: add, reset, remove (with cascade), replace, sync, clear.

use hashbrown::HashSet;
use indexmap::IndexSet;
use tracing::{debug, warn};

use super::{AddOptions, Graph, RemoveOptions, SyncOptions};
use crate::event::GraphEvent;
use crate::model::cell::parse_id;
use crate::model::*;
use crate::{Error, Result};

impl Graph {
    // ========================================================================
    // Add / reset
    // ========================================================================

    /// Add a single cell.
    ///
    /// Fails if the cell has no type or its id is already present.
    pub fn add_cell(&mut self, cell: Cell, options: &AddOptions) -> Result<()> {
        if let Some(layer) = self.insert_cell(cell, options)? {
            if options.sort && self.config.sort_on_add {
                self.sort_layer(&layer);
            }
        }
        Ok(())
    }

    /// Add several cells inside an `"add"` batch.
    ///
    /// Each cell receives a position hint counting down from `len - 1` to 0.
    /// A failing cell aborts the rest; cells added before it stay.
    pub fn add_cells(&mut self, cells: impl IntoIterator<Item = Cell>, options: &AddOptions) -> Result<()> {
        let cells: Vec<Cell> = cells.into_iter().collect();
        if cells.is_empty() {
            return Ok(());
        }

        let total = cells.len();
        self.start_batch("add", PropertyMap::new());

        let mut unsorted: IndexSet<String> = IndexSet::new();
        let mut result = Ok(());
        for (index, cell) in cells.into_iter().enumerate() {
            let opts = AddOptions { position: Some(total - 1 - index), ..options.clone() };
            match self.insert_cell(cell, &opts) {
                Ok(Some(layer)) => {
                    unsorted.insert(layer);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, added = index, total, "bulk add aborted");
                    result = Err(e);
                    break;
                }
            }
        }

        if options.sort && self.config.sort_on_add {
            for layer in &unsorted {
                self.sort_layer(layer);
            }
        }
        self.stop_batch("add", PropertyMap::new());
        debug!(total, "cells added");
        result
    }

    /// Replace the whole collection. z values are taken as given; the index
    /// is rebuilt from scratch.
    ///
    /// Every cell is validated first: on failure nothing changes.
    pub fn reset_cells(&mut self, cells: impl IntoIterator<Item = Cell>) -> Result<()> {
        self.start_batch("reset", PropertyMap::new());

        let prepared: Result<Vec<Cell>> = cells.into_iter().map(validate_type).collect();
        let cells = match prepared {
            Ok(cells) => cells,
            Err(e) => {
                self.stop_batch("reset", PropertyMap::new());
                return Err(e);
            }
        };

        self.cells.reset(cells);
        self.bus.dispatch(&GraphEvent::Reset { cells: &self.cells });

        if self.config.sort_on_add {
            let layers: IndexSet<String> = self
                .cells
                .iter()
                .map(|c| self.layers.layer_of(c).to_owned())
                .collect();
            for layer in &layers {
                self.sort_layer(layer);
            }
        }

        debug!(cells = self.cells.len(), "collection reset");
        self.stop_batch("reset", PropertyMap::new());
        Ok(())
    }

    /// Validate, assign z, insert and announce one cell. Returns the layer
    /// when the cell landed below the layer's maximum z.
    fn insert_cell(&mut self, cell: Cell, options: &AddOptions) -> Result<Option<String>> {
        let mut cell = validate_type(cell)?;
        if self.cells.contains(cell.id.as_str()) {
            return Err(Error::Validation(format!("cell {} already exists", cell.id)));
        }

        let layer = self.layers.layer_of(&cell).to_owned();
        let max_z = self.layers.max_z(&layer, &self.cells);
        if options.ensure_z_index && cell.z.is_none() {
            cell.z = Some(max_z + 1);
        }
        let out_of_order = cell.z.unwrap_or(0) < max_z;

        let id = cell.id.clone();
        self.cells.insert(cell);
        if let Some(cell) = self.cells.get(id.as_str()) {
            self.bus.dispatch(&GraphEvent::Add { cell, options });
        }
        Ok(out_of_order.then_some(layer))
    }

    // ========================================================================
    // Remove
    // ========================================================================

    /// Remove a cell inside a `"remove"` batch and return it.
    ///
    /// Unless `replace` or `clear` is set, the cell is first unembedded from
    /// its parent, its embedded cells are removed recursively, and its
    /// connected links are removed (or disconnected, with
    /// `disconnect_links`). Each cell is removed at most once per call, so
    /// link cycles and embed cycles terminate.
    pub fn remove_cell(&mut self, id: &str, options: &RemoveOptions) -> Option<Cell> {
        self.remove_tracked(id, options, &mut HashSet::new())
    }

    /// `removing` holds every id already claimed by the current cascade.
    fn remove_tracked(
        &mut self,
        id: &str,
        options: &RemoveOptions,
        removing: &mut HashSet<CellId>,
    ) -> Option<Cell> {
        if !self.cells.contains(id) || !removing.insert(CellId::from(id)) {
            return None;
        }
        self.start_batch("remove", PropertyMap::new());

        if !options.replace && !options.clear {
            if let Some(parent) = self.cells.get(id).and_then(|c| c.parent.clone()) {
                self.detach(parent.as_str(), id);
            }

            let embeds: Vec<CellId> = self
                .cells
                .get(id)
                .map(|c| c.embeds.to_vec())
                .unwrap_or_default();
            for child in embeds {
                self.remove_tracked(child.as_str(), options, removing);
            }

            if options.disconnect_links {
                self.disconnect_links(id);
            } else {
                for link in self.connected_link_ids(id) {
                    self.remove_tracked(link.as_str(), options, removing);
                }
            }
        }

        let removed = self.cells.remove(id);
        if let Some(cell) = &removed {
            self.bus.dispatch(&GraphEvent::Remove { cell, options });
            debug!(cell = %cell.id, "cell removed");
        }

        self.stop_batch("remove", PropertyMap::new());
        removed
    }

    /// Remove several cells inside one `"remove"` batch.
    pub fn remove_cells<I, S>(&mut self, ids: I, options: &RemoveOptions) -> Vec<Cell>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: Vec<S> = ids.into_iter().collect();
        if ids.is_empty() {
            return Vec::new();
        }
        self.start_batch("remove", PropertyMap::new());
        let removed = ids
            .iter()
            .filter_map(|id| self.remove_cell(id.as_ref(), options))
            .collect();
        self.stop_batch("remove", PropertyMap::new());
        removed
    }

    /// Remove every link attached to `id` in either direction.
    pub fn remove_links(&mut self, id: &str) -> Vec<Cell> {
        let options = RemoveOptions::default();
        let mut removing = HashSet::new();
        self.connected_link_ids(id)
            .iter()
            .filter_map(|link| self.remove_tracked(link.as_str(), &options, &mut removing))
            .collect()
    }

    /// Turn every endpoint referencing `id` into the point `(0, 0)`.
    pub fn disconnect_links(&mut self, id: &str) {
        for link in self.connected_link_ids(id) {
            let Some(cell) = self.cells.get(link.as_str()) else {
                continue;
            };
            let source = cell.source_id().is_some_and(|s| s.as_str() == id);
            let target = cell.target_id().is_some_and(|t| t.as_str() == id);
            for (end, attached) in [(End::Source, source), (End::Target, target)] {
                if !attached {
                    continue;
                }
                if let Err(e) = self.apply_endpoint(link.as_str(), end, Endpoint::point(0.0, 0.0)) {
                    warn!(error = %e, link = %link, "disconnect failed");
                }
            }
        }
    }

    /// Links attached to `id` straight from the index buckets, deduplicated.
    fn connected_link_ids(&self, id: &str) -> Vec<CellId> {
        let index = self.index();
        let links: IndexSet<&CellId> = index
            .outbound_edges(id)
            .iter()
            .chain(index.inbound_edges(id))
            .collect();
        links.into_iter().cloned().collect()
    }

    /// Remove everything: links first, then elements, without cascading.
    pub fn clear(&mut self) {
        let mut ids: Vec<(bool, CellId)> = self
            .cells
            .iter()
            .map(|c| (c.is_element(), c.id.clone()))
            .collect();
        ids.sort_by_key(|(is_element, _)| *is_element);

        self.start_batch("clear", PropertyMap::new());
        let options = RemoveOptions { clear: true, ..RemoveOptions::default() };
        for (_, id) in &ids {
            self.remove_cell(id.as_str(), &options);
        }
        self.stop_batch("clear", PropertyMap::new());
        debug!(removed = ids.len(), "graph cleared");
    }

    // ========================================================================
    // Replace / sync
    // ========================================================================

    /// Swap a cell for a new one built from its attributes merged with
    /// `replacement` (replacement wins). Links and embeds referencing the id
    /// are left in place. The new cell keeps its z, so its layer is re-sorted
    /// when it lands out of order.
    pub fn replace_cell(&mut self, id: &str, replacement: PropertyMap) -> Result<()> {
        if let Some(layer) = self.swap_cell(id, replacement)? {
            if self.config.sort_on_add {
                self.sort_layer(&layer);
            }
        }
        Ok(())
    }

    /// Replace without sorting. Returns the layer when the new cell landed
    /// out of z order.
    fn swap_cell(&mut self, id: &str, replacement: PropertyMap) -> Result<Option<String>> {
        let current = self
            .cells
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("Cell {id}")))?;
        let mut merged = current.to_attributes();
        merged.extend(replacement);
        let cell = Cell::from_attributes(merged)?;
        if cell.id.as_str() != id && self.cells.contains(cell.id.as_str()) {
            return Err(Error::Validation(format!("cell {} already exists", cell.id)));
        }

        self.start_batch("replace-cell", PropertyMap::new());
        self.remove_cell(id, &RemoveOptions { replace: true, ..RemoveOptions::default() });
        let result = self.insert_cell(cell, &AddOptions::default());
        self.stop_batch("replace-cell", PropertyMap::new());
        debug!(cell = id, "cell replaced");
        result
    }

    /// Upsert one cell from its attribute form.
    ///
    /// A new id is added. An existing id whose type or kind differs is
    /// replaced. Otherwise the payload is applied as a sparse patch, and only
    /// changed values are announced.
    pub fn sync_cell(&mut self, init: PropertyMap, options: &SyncOptions) -> Result<()> {
        let mut touched = IndexSet::new();
        let result = self.sync_one(init, &mut touched);
        if options.sort {
            for layer in &touched {
                self.sort_layer(layer);
            }
        }
        result
    }

    /// Upsert many cells inside a `"sync-cells"` batch.
    ///
    /// With `remove`, cells absent from `inits` are removed. With `sort`,
    /// every layer that gained a cell or saw a z/layer change is sorted once,
    /// after the batch.
    pub fn sync_cells(&mut self, inits: Vec<PropertyMap>, options: &SyncOptions) -> Result<()> {
        let incoming: HashSet<CellId> = inits
            .iter()
            .filter_map(|init| init.get("id").and_then(parse_id))
            .collect();
        let stale: Vec<CellId> = if options.remove {
            self.cells.ids().filter(|id| !incoming.contains(*id)).cloned().collect()
        } else {
            Vec::new()
        };

        self.start_batch("sync-cells", PropertyMap::new());
        let mut touched = IndexSet::new();
        let mut result = Ok(());
        let total = inits.len();
        for (index, init) in inits.into_iter().enumerate() {
            if let Err(e) = self.sync_one(init, &mut touched) {
                warn!(error = %e, synced = index, total, "sync aborted");
                result = Err(e);
                break;
            }
        }
        if result.is_ok() && !stale.is_empty() {
            self.remove_cells(&stale, &RemoveOptions::default());
        }
        self.stop_batch("sync-cells", PropertyMap::new());

        if options.sort {
            for layer in &touched {
                self.sort_layer(layer);
            }
        }
        debug!(total, removed = stale.len(), layers = touched.len(), "cells synced");
        result
    }

    fn sync_one(&mut self, mut init: PropertyMap, touched: &mut IndexSet<String>) -> Result<()> {
        let existing = init
            .get("id")
            .and_then(parse_id)
            .and_then(|id| self.cells.get(id.as_str()));

        let Some(current) = existing else {
            let cell = Cell::from_attributes(init)?;
            let layer = self.layers.layer_of(&cell).to_owned();
            self.insert_cell(cell, &AddOptions { sort: false, ..AddOptions::default() })?;
            touched.insert(layer);
            return Ok(());
        };

        let id = current.id.clone();
        let type_differs = match init.get("type") {
            Some(Value::String(t)) => *t != current.cell_type,
            Some(_) => true,
            None => false,
        };
        let kind_differs =
            current.is_element() && (init.contains_key("source") || init.contains_key("target"));

        if type_differs || kind_differs {
            if let Some(layer) = self.layer_name(id.as_str()) {
                touched.insert(layer);
            }
            self.swap_cell(id.as_str(), init)?;
            if let Some(layer) = self.layer_name(id.as_str()) {
                touched.insert(layer);
            }
            return Ok(());
        }

        init.remove("id");
        init.remove("type");
        self.apply_patch(id.as_str(), init, touched)
    }
}

fn validate_type(cell: Cell) -> Result<Cell> {
    if cell.cell_type.is_empty() {
        return Err(Error::Validation(format!("cell {} has no type", cell.id)));
    }
    Ok(cell)
}
