//! Patch model: regenerated spans layered over a base sequence
//!
//! A patch never touches the buffer it covers. It carries its own values,
//! and read-through views substitute them on the fly. Range and values sit
//! behind a single lock and are only ever swapped whole, so readers see
//! either the previous state or the new one, never a half-written patch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use shellac_core::Sample;

use crate::error::{RestoreError, RestoreResult};

/// Effective prediction error reported for repaired positions
pub const NO_ERROR: Sample = 0.0;

/// Monotonic patch sequence numbers; break ordering ties between patches
/// that share a start position.
static PATCH_SEQ: AtomicU64 = AtomicU64::new(1);

/// Which sequence a patch overlays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchKind {
    /// Replaces damaged input samples with regenerated values
    Input,
    /// Masks prediction errors with the [`NO_ERROR`] sentinel
    PredictionError,
}

/// Capability to recompute a patch's values from its surroundings.
///
/// Implemented by the regenerator that owns repair responsibility for a
/// channel. Patches hold a weak binding to it, so a later
/// [`Patch::refresh`] re-runs the same fill without the patch keeping its
/// owner alive.
pub trait Regenerate: Send + Sync {
    /// Recompute every value covered by `patch` from its current context
    fn restore_patch(&self, patch: &Patch) -> RestoreResult<()>;
}

#[derive(Debug)]
struct PatchState {
    start: usize,
    values: Vec<Sample>,
}

/// A contiguous run of regenerated values.
///
/// Values start zeroed; publishing a patch into a registry before its
/// regenerator has filled it would expose silence, so creation sites
/// regenerate first and insert second.
#[derive(Debug)]
pub struct Patch {
    kind: PatchKind,
    error_level: f64,
    seq: u64,
    state: RwLock<PatchState>,
    updater: RwLock<Option<Weak<dyn Regenerate>>>,
}

impl Patch {
    /// Create a patch covering `len` positions from `start`, with all
    /// values zeroed
    pub fn new(kind: PatchKind, start: usize, len: usize, error_level: f64) -> Self {
        Self {
            kind,
            error_level,
            seq: PATCH_SEQ.fetch_add(1, Ordering::Relaxed),
            state: RwLock::new(PatchState {
                start,
                values: vec![0.0; len],
            }),
            updater: RwLock::new(None),
        }
    }

    /// Which sequence this patch overlays
    pub fn kind(&self) -> PatchKind {
        self.kind
    }

    /// Creation sequence number, unique per process
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Error level relative to the running norm at the moment of detection
    pub fn error_level_at_detection(&self) -> f64 {
        self.error_level
    }

    /// First covered position
    pub fn start_position(&self) -> usize {
        self.state.read().start
    }

    /// Number of covered positions
    pub fn len(&self) -> usize {
        self.state.read().values.len()
    }

    /// True when the patch covers nothing
    pub fn is_empty(&self) -> bool {
        self.state.read().values.is_empty()
    }

    /// One past the last covered position
    pub fn end_position(&self) -> usize {
        let state = self.state.read();
        state.start + state.values.len()
    }

    /// Start position and length, read under one lock
    pub fn range(&self) -> (usize, usize) {
        let state = self.state.read();
        (state.start, state.values.len())
    }

    /// Key ordering patches by start position, creation order breaking ties
    pub fn sort_key(&self) -> (usize, u64) {
        (self.start_position(), self.seq)
    }

    /// True when `pos` falls inside the covered range
    pub fn covers(&self, pos: usize) -> bool {
        let state = self.state.read();
        pos >= state.start && pos < state.start + state.values.len()
    }

    /// Patch value at an absolute position, `None` outside the range
    pub fn value_at(&self, pos: usize) -> Option<Sample> {
        let state = self.state.read();
        let offset = pos.checked_sub(state.start)?;
        state.values.get(offset).copied()
    }

    /// Snapshot of the covered values
    pub fn values(&self) -> Vec<Sample> {
        self.state.read().values.clone()
    }

    /// Replace all values in one swap, keeping the current range
    pub fn set_values(&self, values: Vec<Sample>) {
        self.state.write().values = values;
    }

    /// Move the patch and replace its values in one swap
    pub fn set_range_and_values(&self, start: usize, values: Vec<Sample>) {
        let mut state = self.state.write();
        state.start = start;
        state.values = values;
    }

    /// Bind the regenerator that will serve future refreshes
    pub fn bind_updater(&self, updater: &Arc<dyn Regenerate>) {
        *self.updater.write() = Some(Arc::downgrade(updater));
    }

    /// Re-run the bound regenerator over the current range.
    ///
    /// Fails with [`RestoreError::UnboundPatch`] when no regenerator was
    /// bound or the bound one has been dropped.
    pub fn refresh(&self) -> RestoreResult<()> {
        let updater = self
            .updater
            .read()
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(RestoreError::UnboundPatch)?;
        updater.restore_patch(self)
    }
}
