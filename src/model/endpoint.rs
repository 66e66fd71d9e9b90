//! Link endpoints and traversal direction.

use serde::{Deserialize, Serialize};
use super::{CellId, PropertyMap, Value};

/// Traversal direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Outgoing,
    Incoming,
    #[default]
    Both,
}

impl Direction {
    pub fn includes_outgoing(self) -> bool {
        matches!(self, Direction::Outgoing | Direction::Both)
    }

    pub fn includes_incoming(self) -> bool {
        matches!(self, Direction::Incoming | Direction::Both)
    }
}

/// Which end of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum End {
    Source,
    Target,
}

impl End {
    /// The attribute key the endpoint is stored under.
    pub fn key(self) -> &'static str {
        match self {
            End::Source => "source",
            End::Target => "target",
        }
    }
}

/// A link endpoint: either a free point or a reference to another cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    Point { x: f64, y: f64 },
    Cell { id: CellId, port: Option<String> },
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Point { x: 0.0, y: 0.0 }
    }
}

impl Endpoint {
    pub fn point(x: f64, y: f64) -> Self {
        Endpoint::Point { x, y }
    }

    pub fn cell(id: impl Into<CellId>) -> Self {
        Endpoint::Cell { id: id.into(), port: None }
    }

    pub fn with_port(self, port: impl Into<String>) -> Self {
        match self {
            Endpoint::Cell { id, .. } => Endpoint::Cell { id, port: Some(port.into()) },
            point => point,
        }
    }

    /// The referenced cell id, if this endpoint is attached to a cell.
    pub fn id(&self) -> Option<&CellId> {
        match self {
            Endpoint::Cell { id, .. } => Some(id),
            Endpoint::Point { .. } => None,
        }
    }

    /// Parse an endpoint from its attribute form.
    ///
    /// Anything without a usable `id` degrades to a point; missing
    /// coordinates default to zero.
    pub fn from_value(value: &Value) -> Self {
        let Some(map) = value.as_map() else {
            return Endpoint::default();
        };
        let id = match map.get("id") {
            Some(Value::String(s)) if !s.is_empty() => Some(CellId::from(s.as_str())),
            Some(Value::Int(i)) => Some(CellId::from(i.to_string())),
            _ => None,
        };
        match id {
            Some(id) => Endpoint::Cell {
                id,
                port: map.get("port").and_then(Value::as_str).map(str::to_owned),
            },
            None => Endpoint::Point {
                x: map.get("x").and_then(Value::as_float).unwrap_or(0.0),
                y: map.get("y").and_then(Value::as_float).unwrap_or(0.0),
            },
        }
    }

    /// Attribute form of the endpoint.
    pub fn to_value(&self) -> Value {
        let mut map = PropertyMap::new();
        match self {
            Endpoint::Point { x, y } => {
                map.insert("x".into(), Value::Float(*x));
                map.insert("y".into(), Value::Float(*y));
            }
            Endpoint::Cell { id, port } => {
                map.insert("id".into(), Value::from(id.as_str()));
                if let Some(port) = port {
                    map.insert("port".into(), Value::from(port.as_str()));
                }
            }
        }
        Value::Map(map)
    }
}
