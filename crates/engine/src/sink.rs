//! Effect sinks
//!
//! Observers that produce external effects (exports, messages) receive a sink
//! at construction time instead of writing to shared global state.

use parking_lot::Mutex;

/// Destination for effects produced by observers
pub trait Sink<T>: Send + Sync {
    /// Deliver one item
    fn emit(&self, item: T);
}

/// In-memory sink that records every item
#[derive(Debug)]
pub struct MemorySink<T> {
    items: Mutex<Vec<T>>,
}

impl<T> MemorySink<T> {
    /// Create an empty sink
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    /// Take every item emitted so far, leaving the sink empty
    pub fn drain(&self) -> Vec<T> {
        std::mem::take(&mut *self.items.lock())
    }

    /// Number of items currently held
    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    /// Check if the sink holds no items
    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl<T: Clone> MemorySink<T> {
    /// Copy of the items currently held
    pub fn snapshot(&self) -> Vec<T> {
        self.items.lock().clone()
    }
}

impl<T> Default for MemorySink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send> Sink<T> for MemorySink<T> {
    fn emit(&self, item: T) {
        self.items.lock().push(item);
    }
}
