//! Thread-safe patch registry with blocking drain semantics
//!
//! Producers insert patches while consumers enumerate or drain from other
//! threads. The store stays sorted by start position at all times, and the
//! drain side blocks on fresh insertions until [`PatchRegistry::close`]
//! releases every consumer.

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::{Mutex, RwLock};

use crate::patch::Patch;

/// Multi-producer, multi-consumer patch registry
pub struct PatchRegistry {
    store: RwLock<Vec<Arc<Patch>>>,
    feed_tx: Mutex<Option<Sender<Arc<Patch>>>>,
    feed_rx: Receiver<Arc<Patch>>,
}

impl PatchRegistry {
    /// Create an empty, open registry
    pub fn new() -> Self {
        let (feed_tx, feed_rx) = unbounded();
        Self {
            store: RwLock::new(Vec::new()),
            feed_tx: Mutex::new(Some(feed_tx)),
            feed_rx,
        }
    }

    /// Insert a fully regenerated patch.
    ///
    /// The store is kept ordered by `(start, seq)`. Inserting after
    /// [`close`](PatchRegistry::close) still lands in the store but is no
    /// longer observed by drainers.
    pub fn insert(&self, patch: Arc<Patch>) {
        let key = patch.sort_key();
        {
            let mut store = self.store.write();
            let idx = store.partition_point(|p| p.sort_key() <= key);
            store.insert(idx, Arc::clone(&patch));
        }
        if let Some(tx) = self.feed_tx.lock().as_ref() {
            let _ = tx.send(patch);
        }
    }

    /// Number of registered patches
    pub fn count(&self) -> usize {
        self.store.read().len()
    }

    /// True when nothing has been registered
    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }

    /// Snapshot of all patches, sorted by start position
    pub fn snapshot(&self) -> Vec<Arc<Patch>> {
        self.store.read().clone()
    }

    /// The patch covering `pos`, if any.
    ///
    /// Patches in one registry never overlap, so at most one can cover a
    /// position.
    pub fn find_covering(&self, pos: usize) -> Option<Arc<Patch>> {
        let store = self.store.read();
        let idx = store.partition_point(|p| p.start_position() <= pos);
        let candidate = store.get(idx.checked_sub(1)?)?;
        candidate.covers(pos).then(|| Arc::clone(candidate))
    }

    /// The patch starting exactly at `start`, if any
    pub fn find_at(&self, start: usize) -> Option<Arc<Patch>> {
        let store = self.store.read();
        let idx = store.partition_point(|p| p.start_position() < start);
        let candidate = store.get(idx)?;
        (candidate.start_position() == start).then(|| Arc::clone(candidate))
    }

    /// Blocking iterator over patches in insertion order.
    ///
    /// Yields patches as they are inserted, blocking in between, and ends
    /// once the registry is closed and the backlog is exhausted.
    pub fn drain(&self) -> impl Iterator<Item = Arc<Patch>> + '_ {
        self.feed_rx.iter()
    }

    /// Stop feeding drainers and release any that are blocked
    pub fn close(&self) {
        self.feed_tx.lock().take();
    }

    /// True once the registry has been closed
    pub fn is_closed(&self) -> bool {
        self.feed_tx.lock().is_none()
    }
}

impl Default for PatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}
