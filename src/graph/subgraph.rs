//! Subgraph closure and cloning.

use indexmap::IndexMap;

use super::{EmbedOptions, Graph, NeighborOptions, SubgraphOptions};
use crate::model::*;

impl Graph {
    /// Close a set of cells over their links.
    ///
    /// The result holds the seeds (plus embedded descendants with `deep`),
    /// the existing endpoint cells of every link among them, and every link
    /// whose both endpoints end up in the set. Unknown ids are skipped.
    pub fn subgraph<I, S>(&self, ids: I, options: &SubgraphOptions) -> Vec<&Cell>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut found: IndexMap<&str, &Cell> = IndexMap::new();
        let mut elements: Vec<&Cell> = Vec::new();
        let mut links: Vec<&Cell> = Vec::new();

        for id in ids {
            let Some(cell) = self.cells.get(id.as_ref()) else {
                continue;
            };
            let mut seeds = vec![cell];
            if options.deep {
                seeds.extend(self.embedded_cells(id.as_ref(), &EmbedOptions { deep: true, breadth_first: false }));
            }
            for seed in seeds {
                if admit(&mut found, seed) {
                    if seed.is_link() { links.push(seed) } else { elements.push(seed) }
                }
            }
        }

        // a link endpoint may itself be a link, whose ends are pulled in too
        let mut next = 0;
        while let Some(&link) = links.get(next) {
            next += 1;
            for end in [link.source_id(), link.target_id()] {
                let Some(other) = end.and_then(|e| self.cells.get(e.as_str())) else {
                    continue;
                };
                if admit(&mut found, other) {
                    if other.is_link() { links.push(other) } else { elements.push(other) }
                }
            }
        }

        let neighbor_options = NeighborOptions { deep: options.deep, ..NeighborOptions::default() };
        for element in &elements {
            for link in self.connected_links(element.id.as_str(), &neighbor_options) {
                let closed = [link.source_id(), link.target_id()]
                    .into_iter()
                    .all(|end| end.is_some_and(|e| found.contains_key(e.as_str())));
                if closed {
                    admit(&mut found, link);
                }
            }
        }

        found.into_values().collect()
    }

    /// Deep-copy cells under fresh ids. Link endpoints, parents and embeds
    /// that point inside the copied set are rewritten to the new ids;
    /// references leaving the set keep their original ids (endpoints) or are
    /// dropped (parent, embeds).
    ///
    /// The map is keyed by original id, in input order.
    pub fn clone_cells<I, S>(&self, ids: I) -> IndexMap<CellId, Cell>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let originals: IndexMap<&CellId, &Cell> = ids
            .into_iter()
            .filter_map(|id| self.cells.get(id.as_ref()))
            .map(|cell| (&cell.id, cell))
            .collect();
        clone_set(originals.values().copied())
    }

    /// [`Graph::subgraph`] followed by [`Graph::clone_cells`].
    pub fn clone_subgraph<I, S>(&self, ids: I, options: &SubgraphOptions) -> IndexMap<CellId, Cell>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        clone_set(self.subgraph(ids, options))
    }
}

fn admit<'g>(found: &mut IndexMap<&'g str, &'g Cell>, cell: &'g Cell) -> bool {
    if found.contains_key(cell.id.as_str()) {
        return false;
    }
    found.insert(cell.id.as_str(), cell);
    true
}

fn clone_set<'a>(cells: impl IntoIterator<Item = &'a Cell>) -> IndexMap<CellId, Cell> {
    let cells: Vec<&Cell> = cells.into_iter().collect();
    let mut clones: IndexMap<CellId, Cell> = cells
        .iter()
        .map(|cell| (cell.id.clone(), cell.clone_with_id(CellId::generate())))
        .collect();
    let new_ids: IndexMap<CellId, CellId> = clones
        .iter()
        .map(|(original, clone)| (original.clone(), clone.id.clone()))
        .collect();

    for original in cells {
        let Some(clone) = clones.get_mut(&original.id) else {
            continue;
        };
        for end in [End::Source, End::Target] {
            if let Some(Endpoint::Cell { id, .. }) = clone.endpoint_mut(end) {
                if let Some(new_id) = new_ids.get(&*id) {
                    *id = new_id.clone();
                }
            }
        }
        clone.parent = original.parent.as_ref().and_then(|p| new_ids.get(p)).cloned();
        clone.embeds = original
            .embeds
            .iter()
            .filter_map(|e| new_ids.get(e))
            .cloned()
            .collect();
    }
    clones
}
