//! # Cell Model
//!
//! Clean DTOs for the diagram graph: cells, endpoints, attribute values.
//! These types cross every boundary: collection ↔ index ↔ traversal ↔ user.
//!
//! This module is pure data: no events, no graph state.

pub mod cell;
pub mod endpoint;
pub mod value;
pub mod property_map;

pub use cell::{Cell, CellId, CellKind, RESERVED_KEYS};
pub use endpoint::{Direction, End, Endpoint};
pub use value::Value;
pub use property_map::PropertyMap;
