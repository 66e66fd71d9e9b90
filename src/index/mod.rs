//! Graph indexes for traversal without rescanning the cell collection.
//!
//! - [`AdjacencyIndex`] - outbound/inbound link sets per node, plus node and
//!   edge membership
//!
//! The index is written only by reacting to [`GraphEvent`](crate::event::GraphEvent)s;
//! the graph exposes it read-only.

mod adjacency;

pub use adjacency::AdjacencyIndex;
