//! Embedding: parent/child containment between cells.
//!
//! A child stores its parent id and the parent lists the child in `embeds`.
//! [`Graph::embed`] and [`Graph::unembed`] keep both sides in step;
//! writing `parent` or `embeds` through `set_attribute` does not.

use std::collections::VecDeque;

use hashbrown::HashSet;

use super::{EmbedOptions, Graph};
use crate::event::GraphEvent;
use crate::model::*;
use crate::{Error, Result};

impl Graph {
    /// Embed `child` into `parent`, moving it out of any previous parent.
    pub fn embed(&mut self, parent: &str, child: &str) -> Result<()> {
        for id in [parent, child] {
            if !self.cells.contains(id) {
                return Err(Error::NotFound(format!("Cell {id}")));
            }
        }
        if parent == child || self.is_embedded_in(parent, child, true) {
            return Err(Error::Validation(format!("embedding {child} into {parent} creates a cycle")));
        }

        self.start_batch("embed", PropertyMap::new());
        if let Some(previous) = self.cells.get(child).and_then(|c| c.parent.clone()) {
            self.detach(previous.as_str(), child);
        }
        if let Some(cell) = self.cells.get_mut(parent) {
            cell.embeds.push(CellId::from(child));
        }
        self.emit_change(parent, "embeds");
        if let Some(cell) = self.cells.get_mut(child) {
            cell.parent = Some(CellId::from(parent));
        }
        self.emit_change(child, "parent");
        self.stop_batch("embed", PropertyMap::new());
        Ok(())
    }

    /// Take `child` out of `parent`. A no-op when it is not embedded there.
    pub fn unembed(&mut self, parent: &str, child: &str) -> Result<()> {
        for id in [parent, child] {
            if !self.cells.contains(id) {
                return Err(Error::NotFound(format!("Cell {id}")));
            }
        }
        self.start_batch("unembed", PropertyMap::new());
        self.detach(parent, child);
        self.stop_batch("unembed", PropertyMap::new());
        Ok(())
    }

    /// Unlink both sides of a parent/child pair that may be half-present.
    pub(crate) fn detach(&mut self, parent: &str, child: &str) {
        let removed = self.cells.get_mut(parent).is_some_and(|cell| {
            let before = cell.embeds.len();
            cell.embeds.retain(|id| id.as_str() != child);
            cell.embeds.len() != before
        });
        if removed {
            self.emit_change(parent, "embeds");
        }

        let cleared = self.cells.get_mut(child).is_some_and(|cell| {
            if cell.parent.as_ref().is_some_and(|p| p.as_str() == parent) {
                cell.parent = None;
                true
            } else {
                false
            }
        });
        if cleared {
            self.emit_change(child, "parent");
        }
    }

    fn emit_change(&mut self, id: &str, attribute: &str) {
        if let Some(cell) = self.cells.get(id) {
            self.bus.dispatch(&GraphEvent::Change { cell, attribute });
        }
    }

    /// Parent chain from the direct parent upwards. Stops at a missing
    /// parent or a repeated id.
    pub fn ancestors(&self, id: &str) -> Vec<&Cell> {
        let mut chain = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(id);
        let mut current = self.cells.get(id).and_then(|c| c.parent.as_ref());
        while let Some(parent_id) = current {
            if !seen.insert(parent_id.as_str()) {
                break;
            }
            let Some(parent) = self.cells.get(parent_id.as_str()) else {
                break;
            };
            chain.push(parent);
            current = parent.parent.as_ref();
        }
        chain
    }

    /// Cells embedded in `id`. With `deep`, every descendant, depth-first
    /// pre-order unless `breadth_first` is set.
    pub fn embedded_cells(&self, id: &str, options: &EmbedOptions) -> Vec<&Cell> {
        let Some(root) = self.cells.get(id) else {
            return Vec::new();
        };
        if !options.deep {
            return self.children(root);
        }

        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(root.id.as_str());
        let mut found = Vec::new();
        if options.breadth_first {
            let mut queue: VecDeque<&Cell> = self.children(root).into();
            while let Some(cell) = queue.pop_front() {
                if !seen.insert(cell.id.as_str()) {
                    continue;
                }
                found.push(cell);
                queue.extend(self.children(cell));
            }
        } else {
            let mut stack: Vec<&Cell> = self.children(root);
            stack.reverse();
            while let Some(cell) = stack.pop() {
                if !seen.insert(cell.id.as_str()) {
                    continue;
                }
                found.push(cell);
                stack.extend(self.children(cell).into_iter().rev());
            }
        }
        found
    }

    fn children(&self, cell: &Cell) -> Vec<&Cell> {
        cell.embeds
            .iter()
            .filter_map(|child| self.cells.get(child.as_str()))
            .collect()
    }

    /// Whether `child` sits inside `parent`; directly only unless `deep`.
    pub fn is_embedded_in(&self, child: &str, parent: &str, deep: bool) -> bool {
        let Some(cell) = self.cells.get(child) else {
            return false;
        };
        if !deep {
            return cell.parent.as_ref().is_some_and(|p| p.as_str() == parent);
        }
        self.ancestors(child).iter().any(|a| a.id.as_str() == parent)
    }

    /// The closest cell that is an ancestor of every given cell.
    ///
    /// `None` for an empty input, an unknown id, or when the ancestor chains
    /// share nothing.
    pub fn common_ancestor<I, S>(&self, ids: I) -> Option<&Cell>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut chains: Vec<Vec<&Cell>> = Vec::new();
        for id in ids {
            let id = id.as_ref();
            if !self.cells.contains(id) {
                return None;
            }
            chains.push(self.ancestors(id));
        }
        chains.sort_by_key(Vec::len);
        let (shortest, rest) = chains.split_first()?;
        shortest.iter().copied().find(|candidate| {
            rest.iter().all(|chain| chain.iter().any(|c| c.id == candidate.id))
        })
    }
}
