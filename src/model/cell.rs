//! Cells: the nodes (elements) and edges (links) of the diagram graph.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{End, Endpoint, PropertyMap, Value};
use crate::{Error, Result};

/// Attribute keys that map onto typed `Cell` fields instead of `attributes`.
pub const RESERVED_KEYS: [&str; 8] = ["id", "type", "source", "target", "parent", "embeds", "z", "layer"];

/// Stable cell identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CellId(pub String);

impl CellId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random identifier (uuid v4).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CellId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CellId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CellId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for CellId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&CellId> for CellId {
    fn from(id: &CellId) -> Self {
        id.clone()
    }
}

/// Closed discriminator: elements are nodes, links are edges with endpoints.
#[derive(Debug, Clone, PartialEq)]
pub enum CellKind {
    Element,
    Link { source: Endpoint, target: Endpoint },
}

/// A cell in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub id: CellId,
    /// Type discriminator, e.g. `"standard.Rectangle"`.
    pub cell_type: String,
    pub kind: CellKind,
    /// Embedding parent.
    pub parent: Option<CellId>,
    /// Directly embedded children.
    pub embeds: SmallVec<[CellId; 4]>,
    pub z: Option<i64>,
    /// Owning layer; `None` means the graph's default layer.
    pub layer: Option<String>,
    /// Everything that is not structural.
    pub attributes: PropertyMap,
}

impl Cell {
    fn new(id: impl Into<CellId>, cell_type: impl Into<String>, kind: CellKind) -> Self {
        Self {
            id: id.into(),
            cell_type: cell_type.into(),
            kind,
            parent: None,
            embeds: SmallVec::new(),
            z: None,
            layer: None,
            attributes: PropertyMap::new(),
        }
    }

    pub fn element(id: impl Into<CellId>, cell_type: impl Into<String>) -> Self {
        Self::new(id, cell_type, CellKind::Element)
    }

    pub fn link(
        id: impl Into<CellId>,
        cell_type: impl Into<String>,
        source: Endpoint,
        target: Endpoint,
    ) -> Self {
        Self::new(id, cell_type, CellKind::Link { source, target })
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<CellId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_z(mut self, z: i64) -> Self {
        self.z = Some(z);
        self
    }

    pub fn with_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }

    pub fn with_position(self, x: f64, y: f64) -> Self {
        self.with_property("position", pair("x", x, "y", y))
    }

    pub fn with_size(self, width: f64, height: f64) -> Self {
        self.with_property("size", pair("width", width, "height", height))
    }

    pub fn is_link(&self) -> bool {
        matches!(self.kind, CellKind::Link { .. })
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind, CellKind::Element)
    }

    pub fn source(&self) -> Option<&Endpoint> {
        self.endpoint(End::Source)
    }

    pub fn target(&self) -> Option<&Endpoint> {
        self.endpoint(End::Target)
    }

    pub fn endpoint(&self, end: End) -> Option<&Endpoint> {
        match (&self.kind, end) {
            (CellKind::Link { source, .. }, End::Source) => Some(source),
            (CellKind::Link { target, .. }, End::Target) => Some(target),
            (CellKind::Element, _) => None,
        }
    }

    pub(crate) fn endpoint_mut(&mut self, end: End) -> Option<&mut Endpoint> {
        match (&mut self.kind, end) {
            (CellKind::Link { source, .. }, End::Source) => Some(source),
            (CellKind::Link { target, .. }, End::Target) => Some(target),
            (CellKind::Element, _) => None,
        }
    }

    /// Referenced source cell id (links only).
    pub fn source_id(&self) -> Option<&CellId> {
        self.source().and_then(Endpoint::id)
    }

    /// Referenced target cell id (links only).
    pub fn target_id(&self) -> Option<&CellId> {
        self.target().and_then(Endpoint::id)
    }

    /// A link whose source and target reference the same cell.
    pub fn has_loop(&self) -> bool {
        matches!((self.source_id(), self.target_id()), (Some(s), Some(t)) if s == t)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Copy of this cell under a new id, detached from any embedding.
    pub fn clone_with_id(&self, id: CellId) -> Self {
        let mut clone = self.clone();
        clone.id = id;
        clone.parent = None;
        clone.embeds.clear();
        clone
    }

    // ========================================================================
    // Attribute form
    // ========================================================================

    /// Build a cell from its flat attribute form.
    ///
    /// `type` must be a non-empty string. A payload carrying `source` or
    /// `target` is a link. A missing `id` is generated.
    pub fn from_attributes(mut attrs: PropertyMap) -> Result<Self> {
        let cell_type = match attrs.remove("type") {
            Some(Value::String(t)) if !t.is_empty() => t,
            Some(other) => {
                return Err(Error::Validation(format!(
                    "cell type must be a string, got {}",
                    other.type_name()
                )));
            }
            None => return Err(Error::Validation("cell type must be a string".into())),
        };

        let id = match attrs.remove("id") {
            Some(Value::String(s)) if !s.is_empty() => CellId(s),
            Some(Value::Int(i)) => CellId(i.to_string()),
            _ => CellId::generate(),
        };

        let source = attrs.remove("source");
        let target = attrs.remove("target");
        let kind = if source.is_some() || target.is_some() {
            CellKind::Link {
                source: source.as_ref().map(Endpoint::from_value).unwrap_or_default(),
                target: target.as_ref().map(Endpoint::from_value).unwrap_or_default(),
            }
        } else {
            CellKind::Element
        };

        let mut cell = Cell::new(id, cell_type, kind);
        cell.parent = attrs.remove("parent").and_then(|v| parse_id(&v));
        cell.embeds = attrs
            .remove("embeds")
            .map(|v| parse_ids(&v))
            .unwrap_or_default();
        cell.z = attrs.remove("z").and_then(|v| v.as_int());
        cell.layer = match attrs.remove("layer") {
            Some(Value::String(l)) => Some(l),
            _ => None,
        };
        cell.attributes = attrs;
        Ok(cell)
    }

    /// Flatten the cell back into its attribute form.
    pub fn to_attributes(&self) -> PropertyMap {
        let mut attrs = self.attributes.clone();
        attrs.insert("id".into(), Value::from(self.id.as_str()));
        attrs.insert("type".into(), Value::from(self.cell_type.as_str()));
        if let CellKind::Link { source, target } = &self.kind {
            attrs.insert("source".into(), source.to_value());
            attrs.insert("target".into(), target.to_value());
        }
        if let Some(parent) = &self.parent {
            attrs.insert("parent".into(), Value::from(parent.as_str()));
        }
        if !self.embeds.is_empty() {
            attrs.insert(
                "embeds".into(),
                Value::List(self.embeds.iter().map(|e| Value::from(e.as_str())).collect()),
            );
        }
        if let Some(z) = self.z {
            attrs.insert("z".into(), Value::Int(z));
        }
        if let Some(layer) = &self.layer {
            attrs.insert("layer".into(), Value::from(layer.as_str()));
        }
        attrs
    }
}

fn pair(a: &str, av: f64, b: &str, bv: f64) -> Value {
    let mut map = PropertyMap::new();
    map.insert(a.to_owned(), Value::Float(av));
    map.insert(b.to_owned(), Value::Float(bv));
    Value::Map(map)
}

pub(crate) fn parse_id(value: &Value) -> Option<CellId> {
    match value {
        Value::String(s) if !s.is_empty() => Some(CellId(s.clone())),
        Value::Int(i) => Some(CellId(i.to_string())),
        _ => None,
    }
}

pub(crate) fn parse_ids(value: &Value) -> SmallVec<[CellId; 4]> {
    value
        .as_list()
        .map(|items| items.iter().filter_map(parse_id).collect())
        .unwrap_or_default()
}
