//! Bounding boxes and spatial lookups over element `position`/`size`.
//!
//! Elements without a position sit at the origin; without a size they are
//! 1×1. Links have no box of their own.

use super::{EmbedOptions, Graph};
use crate::geometry::{Point, Rect};
use crate::model::*;

/// How [`Graph::find_elements_under_element`] probes below an element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchBy {
    /// Anything intersecting the element's box.
    #[default]
    BBox,
    Center,
    Origin,
    Corner,
}

fn coordinate(value: Option<&Value>, key: &str, fallback: f64) -> f64 {
    value
        .and_then(|v| v.get(key))
        .and_then(Value::as_float)
        .unwrap_or(fallback)
}

/// Box of an element; `None` for links.
pub fn element_bbox(cell: &Cell) -> Option<Rect> {
    if !cell.is_element() {
        return None;
    }
    let position = cell.get("position");
    let size = cell.get("size");
    Some(Rect::new(
        coordinate(position, "x", 0.0),
        coordinate(position, "y", 0.0),
        coordinate(size, "width", 1.0),
        coordinate(size, "height", 1.0),
    ))
}

impl Graph {
    pub fn cell_bbox(&self, id: &str) -> Option<Rect> {
        self.cells.get(id).and_then(element_bbox)
    }

    /// Union of the boxes of the given elements.
    pub fn cells_bbox<I, S>(&self, ids: I) -> Option<Rect>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ids.into_iter()
            .filter_map(|id| self.cell_bbox(id.as_ref()))
            .reduce(|a, b| a.union(&b))
    }

    /// Union of every element's box; `None` for a graph without elements.
    pub fn bbox(&self) -> Option<Rect> {
        self.elements()
            .filter_map(element_bbox)
            .reduce(|a, b| a.union(&b))
    }

    pub fn find_elements_at_point(&self, point: Point) -> Vec<&Cell> {
        self.elements()
            .filter(|cell| element_bbox(cell).is_some_and(|r| r.contains_point(point)))
            .collect()
    }

    /// Elements intersecting `area`; with `strict`, only those fully inside.
    pub fn find_elements_in_area(&self, area: Rect, strict: bool) -> Vec<&Cell> {
        self.elements()
            .filter(|cell| {
                element_bbox(cell).is_some_and(|r| {
                    if strict { area.contains_rect(&r) } else { area.intersects(&r) }
                })
            })
            .collect()
    }

    /// Elements lying under `id`, excluding itself and its descendants.
    pub fn find_elements_under_element(&self, id: &str, search_by: SearchBy) -> Vec<&Cell> {
        let Some(bbox) = self.cell_bbox(id) else {
            return Vec::new();
        };
        let candidates = match search_by {
            SearchBy::BBox => self.find_elements_in_area(bbox, false),
            SearchBy::Center => self.find_elements_at_point(bbox.center()),
            SearchBy::Origin => self.find_elements_at_point(bbox.origin()),
            SearchBy::Corner => self.find_elements_at_point(bbox.corner()),
        };
        let descendants = self.embedded_cells(id, &EmbedOptions { deep: true, breadth_first: false });
        candidates
            .into_iter()
            .filter(|c| c.id.as_str() != id && !descendants.iter().any(|d| d.id == c.id))
            .collect()
    }
}
