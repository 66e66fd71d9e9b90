//! # Cell Collection
//!
//! Ordered, id-keyed store of cells. This is the single source of truth the
//! adjacency index mirrors: every structural mutation of the collection is
//! announced by the graph as a [`GraphEvent`](crate::event::GraphEvent) in
//! the same call, before control returns to the caller.
//!
//! The collection itself is dumb storage: it never emits, validates, or
//! cascades. Iteration order is insertion order, rearranged only by
//! [`CellCollection::reorder`] (layer sorting).

use indexmap::IndexMap;

use crate::model::{Cell, CellId};

/// Ordered, id-keyed cell store.
#[derive(Debug, Clone, Default)]
pub struct CellCollection {
    cells: IndexMap<CellId, Cell>,
}

impl CellCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Cell> {
        self.cells.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut Cell> {
        self.cells.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cells.contains_key(id)
    }

    /// Position of a cell in iteration order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.cells.get_index_of(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &CellId> {
        self.cells.keys()
    }

    pub fn first(&self) -> Option<&Cell> {
        self.cells.first().map(|(_, cell)| cell)
    }

    pub fn last(&self) -> Option<&Cell> {
        self.cells.last().map(|(_, cell)| cell)
    }

    /// Append a cell. Returns the cell it displaced, if the id was taken.
    pub(crate) fn insert(&mut self, cell: Cell) -> Option<Cell> {
        let old = self.cells.shift_remove(&cell.id);
        self.cells.insert(cell.id.clone(), cell);
        old
    }

    /// Remove a cell, preserving the order of the rest.
    pub(crate) fn remove(&mut self, id: &str) -> Option<Cell> {
        self.cells.shift_remove(id)
    }

    /// Replace the whole content. Later duplicates of an id win.
    pub(crate) fn reset(&mut self, cells: impl IntoIterator<Item = Cell>) -> Vec<Cell> {
        let previous = std::mem::take(&mut self.cells);
        for cell in cells {
            self.cells.insert(cell.id.clone(), cell);
        }
        previous.into_values().collect()
    }

    /// Rearrange the cells sitting at `positions` so that they appear in the
    /// order given by `ordered`. Both slices must name the same cells.
    pub(crate) fn reorder(&mut self, positions: &[usize], ordered: &[CellId]) {
        debug_assert_eq!(positions.len(), ordered.len());
        let mut entries: Vec<Option<(CellId, Cell)>> =
            std::mem::take(&mut self.cells).into_iter().map(Some).collect();
        let mut moved: IndexMap<CellId, Cell> = positions
            .iter()
            .filter_map(|&p| entries.get_mut(p).and_then(Option::take))
            .collect();
        for (&slot, id) in positions.iter().zip(ordered) {
            if let Some(entry) = moved.shift_remove_entry(id) {
                entries[slot] = Some(entry);
            }
        }
        self.cells = entries.into_iter().flatten().chain(moved).collect();
    }
}

impl<'a> IntoIterator for &'a CellCollection {
    type Item = &'a Cell;
    type IntoIter = indexmap::map::Values<'a, CellId, Cell>;

    fn into_iter(self) -> Self::IntoIter {
        self.cells.values()
    }
}
