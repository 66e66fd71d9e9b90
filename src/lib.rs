//! # cellgraph: live graph index for diagram cells
//!
//! An in-memory graph of *elements* (nodes) and *links* (edges) kept in an
//! ordered collection, with an adjacency index that follows every mutation
//! synchronously. Queries (neighbors, connected links, BFS/DFS, successors,
//! subgraphs) read the index and never rescan the collection.
//!
//! ## Design Principles
//!
//! 1. **One writer**: only the adjacency index mutates itself, and only in
//!    reaction to [`GraphEvent`]s the graph dispatches
//! 2. **Clean DTOs**: `Cell`, `Endpoint`, `Value` cross all boundaries
//! 3. **Silent degradation**: dangling endpoints behave as free points;
//!    queries on unknown ids return empty results
//! 4. **Batches bracket, never defer**: a batch is a reentrant counter,
//!    not a transaction
//!
//! ## Quick Start
//!
//! ```rust
//! use cellgraph::{AddOptions, Cell, Endpoint, Graph, NeighborOptions};
//!
//! # fn example() -> cellgraph::Result<()> {
//! let mut graph = Graph::new();
//! graph.add_cells(
//!     vec![
//!         Cell::element("a", "rect"),
//!         Cell::element("b", "rect"),
//!         Cell::link("ab", "link", Endpoint::cell("a"), Endpoint::cell("b")),
//!     ],
//!     &AddOptions::default(),
//! )?;
//!
//! let next = graph.neighbors("a", &NeighborOptions::outgoing());
//! assert_eq!(next[0].id.as_str(), "b");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod collection;
pub mod event;
pub mod index;
pub mod batch;
pub mod layer;
pub mod geometry;
pub mod graph;
pub mod document;

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{
    Cell, CellId, CellKind, Direction, End, Endpoint, PropertyMap, Value,
};

pub use collection::CellCollection;
pub use event::{GraphEvent, Subscriber, SubscriberId};
pub use index::AdjacencyIndex;
pub use batch::BatchTracker;
pub use layer::{DEFAULT_LAYER, LayerRegistry};
pub use geometry::{Point, Rect};
pub use document::{GraphDocument, LayerEntry};

pub use graph::{
    AddOptions, EmbedOptions, Graph, GraphConfig, NeighborOptions, RemoveOptions,
    SearchBy, SearchOptions, SubgraphOptions, SyncOptions, Visit,
};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
