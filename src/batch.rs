//! Batch bookkeeping.
//!
//! A batch is a named, reentrant counter that brackets a logical group of
//! mutations so observers can coalesce their reactions. It is not a
//! transaction: nothing is deferred, queued, or rolled back.

use hashbrown::HashMap;

/// Named reentrant batch counters.
///
/// Starting the same name twice needs two stops before it reads inactive.
/// Stopping a batch that is not running drives its counter below zero;
/// callers must pair start and stop.
#[derive(Debug, Clone, Default)]
pub struct BatchTracker {
    depth: HashMap<String, i64>,
}

impl BatchTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment `name`, returning the new depth.
    pub fn start(&mut self, name: &str) -> i64 {
        let depth = self.depth.entry_ref(name).or_insert(0);
        *depth += 1;
        *depth
    }

    /// Decrement `name`, returning the new depth.
    pub fn stop(&mut self, name: &str) -> i64 {
        let depth = self.depth.entry_ref(name).or_insert(0);
        *depth -= 1;
        *depth
    }

    pub fn depth(&self, name: &str) -> i64 {
        self.depth.get(name).copied().unwrap_or(0)
    }

    /// With no names: whether any batch is running. With names: whether at
    /// least one of them is.
    pub fn has_active(&self, names: &[&str]) -> bool {
        if names.is_empty() {
            self.depth.values().any(|&d| d > 0)
        } else {
            names.iter().any(|name| self.depth(name) > 0)
        }
    }
}
