//! Graph events and their delivery.
//!
//! Every structural mutation is announced as a [`GraphEvent`] synchronously,
//! in the call stack of the mutation. Delivery order is fixed: the adjacency
//! index observes first, external subscribers after, so a subscriber that
//! queries the graph already sees the updated index.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::collection::CellCollection;
use crate::graph::{AddOptions, RemoveOptions};
use crate::index::AdjacencyIndex;
use crate::model::{Cell, End, Endpoint, PropertyMap};

/// A notification about a graph mutation.
#[derive(Debug, Clone, Copy)]
pub enum GraphEvent<'a> {
    /// A cell entered the collection. `options.position` is the cell's
    /// place in a bulk add, counting down to 0.
    Add { cell: &'a Cell, options: &'a AddOptions },
    /// A cell left the collection.
    Remove { cell: &'a Cell, options: &'a RemoveOptions },
    /// The collection was replaced wholesale.
    Reset { cells: &'a CellCollection },
    /// An attribute of a cell changed value.
    Change { cell: &'a Cell, attribute: &'a str },
    /// A link's source or target was reassigned. `previous` is the endpoint
    /// before the change; the new one is on `link`.
    EndpointChange { link: &'a Cell, end: End, previous: &'a Endpoint },
    BatchStart { name: &'a str, data: &'a PropertyMap },
    BatchStop { name: &'a str, data: &'a PropertyMap },
    /// A layer's cells were re-sorted by z.
    Sort { layer: &'a str },
}

impl GraphEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            GraphEvent::Add { .. } => "add",
            GraphEvent::Remove { .. } => "remove",
            GraphEvent::Reset { .. } => "reset",
            GraphEvent::Change { .. } => "change",
            GraphEvent::EndpointChange { .. } => "endpoint-change",
            GraphEvent::BatchStart { .. } => "batch:start",
            GraphEvent::BatchStop { .. } => "batch:stop",
            GraphEvent::Sort { .. } => "sort",
        }
    }
}

/// Unique identifier for a subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

type Callback = Box<dyn FnMut(&GraphEvent<'_>)>;

/// A subscriber to graph events.
///
/// Callbacks receive the event only, never the graph: they cannot mutate
/// the graph while a mutation is in flight.
pub struct Subscriber {
    id: SubscriberId,
    notify: Callback,
}

impl Subscriber {
    pub fn new<F>(notify: F) -> Self
    where
        F: FnMut(&GraphEvent<'_>) + 'static,
    {
        Self { id: SubscriberId::new(), notify: Box::new(notify) }
    }

    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn notify(&mut self, event: &GraphEvent<'_>) {
        (self.notify)(event);
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber").field("id", &self.id).finish_non_exhaustive()
    }
}

/// Fan-out point for graph events: the adjacency index, then subscribers.
#[derive(Debug, Default)]
pub(crate) struct EventBus {
    index: AdjacencyIndex,
    subscribers: Vec<Subscriber>,
}

impl EventBus {
    pub(crate) fn index(&self) -> &AdjacencyIndex {
        &self.index
    }

    pub(crate) fn subscribe(&mut self, subscriber: Subscriber) -> SubscriberId {
        let id = subscriber.id();
        self.subscribers.push(subscriber);
        id
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id() != id);
        self.subscribers.len() != before
    }

    pub(crate) fn dispatch(&mut self, event: &GraphEvent<'_>) {
        self.index.observe(event);
        for subscriber in &mut self.subscribers {
            subscriber.notify(event);
        }
    }
}
