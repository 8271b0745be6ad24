//! Read-through overlay views
//!
//! A [`Patcher`] pairs an immutable base sequence with a patch registry and
//! serves the effective value at every position: the patch value where a
//! patch covers the position, the raw base value everywhere else. Stacking
//! one over the input samples and one over the prediction errors gives the
//! pipeline corrected audio and a masked error sequence through the same
//! lookup.

use std::sync::Arc;

use shellac_core::{Sample, SampleBuffer};

use crate::error::{RestoreError, RestoreResult};
use crate::registry::PatchRegistry;

/// Read-through view of a base sequence with patches layered on top.
///
/// Clones share the base storage and the registry, so a view can be handed
/// to the regenerator and kept by the channel at the same time.
#[derive(Clone)]
pub struct Patcher {
    base: SampleBuffer,
    registry: Arc<PatchRegistry>,
}

impl Patcher {
    /// Build a view of `base` with the patches of `registry` applied
    pub fn new(base: SampleBuffer, registry: Arc<PatchRegistry>) -> Self {
        Self { base, registry }
    }

    /// Length of the underlying sequence
    pub fn len(&self) -> usize {
        self.base.len()
    }

    /// True when the underlying sequence is empty
    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }

    /// The patch registry backing this view
    pub fn registry(&self) -> &Arc<PatchRegistry> {
        &self.registry
    }

    /// The raw sequence underneath the patches
    pub fn base(&self) -> &SampleBuffer {
        &self.base
    }

    /// Effective value at `pos`
    pub fn effective(&self, pos: usize) -> RestoreResult<Sample> {
        self.effective_excluding(pos, None)
    }

    /// Effective value at `pos`, treating the patch with sequence number
    /// `exclude_seq` as absent.
    ///
    /// Needed while that patch is being recomputed: its own stale values
    /// must not leak into the context it is rebuilt from.
    pub fn effective_excluding(
        &self,
        pos: usize,
        exclude_seq: Option<u64>,
    ) -> RestoreResult<Sample> {
        let base = self.base.get(pos).ok_or(RestoreError::OutOfRange {
            pos,
            len: self.base.len(),
        })?;
        if let Some(patch) = self.registry.find_covering(pos) {
            if Some(patch.seq()) != exclude_seq {
                // The patch may have moved between lookup and read; fall
                // back to the base value if it no longer covers pos.
                if let Some(value) = patch.value_at(pos) {
                    return Ok(value);
                }
            }
        }
        Ok(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{Patch, PatchKind};

    fn view_over(base: Vec<Sample>) -> Patcher {
        Patcher::new(SampleBuffer::new(base), Arc::new(PatchRegistry::new()))
    }

    #[test]
    fn test_unpatched_positions_read_through() {
        let view = view_over(vec![0.1, 0.2, 0.3]);
        assert_eq!(view.effective(0).unwrap(), 0.1);
        assert_eq!(view.effective(2).unwrap(), 0.3);
    }

    #[test]
    fn test_out_of_range_read_fails() {
        let view = view_over(vec![0.1, 0.2, 0.3]);
        assert!(matches!(
            view.effective(3),
            Err(RestoreError::OutOfRange { pos: 3, len: 3 })
        ));
    }

    #[test]
    fn test_patched_positions_serve_patch_values() {
        let view = view_over(vec![1.0; 10]);
        let patch = Arc::new(Patch::new(PatchKind::Input, 4, 2, 5.0));
        patch.set_values(vec![0.25, 0.5]);
        view.registry().insert(patch);

        assert_eq!(view.effective(3).unwrap(), 1.0);
        assert_eq!(view.effective(4).unwrap(), 0.25);
        assert_eq!(view.effective(5).unwrap(), 0.5);
        assert_eq!(view.effective(6).unwrap(), 1.0);
    }

    #[test]
    fn test_excluded_patch_is_invisible() {
        let view = view_over(vec![1.0; 10]);
        let patch = Arc::new(Patch::new(PatchKind::Input, 4, 2, 5.0));
        patch.set_values(vec![0.25, 0.5]);
        let seq = patch.seq();
        view.registry().insert(patch);

        assert_eq!(view.effective_excluding(4, Some(seq)).unwrap(), 1.0);
        assert_eq!(view.effective_excluding(4, None).unwrap(), 0.25);
    }
}
