//! Response caching
//!
//! One slot per upstream resource, holding the most recently published
//! answer forever (no TTL - handlers decide when to go upstream again).
//! Readers get an `Arc` snapshot and never block behind a publisher for
//! longer than the pointer swap; a value handed out stays valid even if the
//! slot is overwritten mid-flight.

use std::sync::Arc;

use parking_lot::RwLock;

/// Single-slot cache for one upstream resource
pub struct ResponseCache<T> {
    /// The most recently published value, if any
    slot: RwLock<Option<Arc<T>>>,
}

impl<T> ResponseCache<T> {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Snapshot of the current value. `None` means nothing has ever been
    /// published - distinct from a published empty payload.
    pub fn load(&self) -> Option<Arc<T>> {
        self.slot.read().clone()
    }

    /// Replace the slot wholesale. Concurrent publishes race benignly:
    /// last writer wins and every reader sees one complete value.
    pub fn publish(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        *self.slot.write() = Some(Arc::clone(&value));
        value
    }
}

impl<T> Default for ResponseCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
