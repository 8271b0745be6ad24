//! Patch value regeneration through the effective input view
//!
//! Replacement samples are predicted left to right: every position is
//! forecast from the context immediately before it, and values already
//! regenerated for this patch feed the context of the positions after
//! them. Earlier repairs are visible through the input view, so later
//! patches are rebuilt from corrected audio rather than from the damage.

use parking_lot::Mutex;
use shellac_core::Sample;
use shellac_dsp::BurgPredictor;

use crate::error::RestoreResult;
use crate::patch::{NO_ERROR, Patch, PatchKind, Regenerate};
use crate::patcher::Patcher;

/// Computes replacement values for patches over one input view
pub struct Regenerator {
    input_view: Patcher,
    predictor: Mutex<BurgPredictor>,
    context_len: usize,
}

impl Regenerator {
    /// Create a regenerator predicting through `input_view`
    pub fn new(input_view: Patcher, predictor: BurgPredictor) -> Self {
        let context_len = predictor.context_len();
        Self {
            input_view,
            predictor: Mutex::new(predictor),
            context_len,
        }
    }

    /// Number of preceding samples each predicted value is based on
    pub fn context_len(&self) -> usize {
        self.context_len
    }

    /// Predict replacement values for `[start, start + len)`.
    ///
    /// Context positions before `start` are read through the input view
    /// with `exclude_seq` treated as absent; positions at or past `start`
    /// come from the values predicted so far.
    pub fn regenerate_range(
        &self,
        start: usize,
        len: usize,
        exclude_seq: Option<u64>,
    ) -> RestoreResult<Vec<Sample>> {
        let mut predictor = self.predictor.lock();
        let mut values: Vec<Sample> = Vec::with_capacity(len);
        let mut context: Vec<Sample> = Vec::with_capacity(self.context_len);

        for i in 0..len {
            let pos = start + i;
            context.clear();
            for q in pos.saturating_sub(self.context_len)..pos {
                if q >= start {
                    context.push(values[q - start]);
                } else {
                    context.push(self.input_view.effective_excluding(q, exclude_seq)?);
                }
            }
            values.push(predictor.forward(&context));
        }
        Ok(values)
    }
}

impl Regenerate for Regenerator {
    fn restore_patch(&self, patch: &Patch) -> RestoreResult<()> {
        let (start, len) = patch.range();
        let values = match patch.kind() {
            PatchKind::Input => self.regenerate_range(start, len, Some(patch.seq()))?,
            PatchKind::PredictionError => vec![NO_ERROR; len],
        };
        patch.set_values(values);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::PatchRegistry;
    use approx::assert_relative_eq;
    use shellac_core::SampleBuffer;
    use std::sync::Arc;

    fn regenerator_over(base: Vec<Sample>) -> (Regenerator, Arc<PatchRegistry>) {
        let registry = Arc::new(PatchRegistry::new());
        let view = Patcher::new(SampleBuffer::new(base), Arc::clone(&registry));
        let regenerator = Regenerator::new(view, BurgPredictor::new(2, 16));
        (regenerator, registry)
    }

    #[test]
    fn test_silent_context_regenerates_silence() {
        let mut base = vec![0.0; 64];
        base[40] = 1.0;
        let (regenerator, _) = regenerator_over(base);

        let patch = Patch::new(PatchKind::Input, 40, 1, 10.0);
        regenerator.restore_patch(&patch).unwrap();
        assert_eq!(patch.values(), vec![0.0]);
    }

    #[test]
    fn test_sine_context_continues_the_tone() {
        let omega = 0.3;
        let mut base: Vec<Sample> = (0..96).map(|i| 0.5 * (omega * i as f64).sin()).collect();
        base[60] = 4.0;
        base[61] = -4.0;
        let (regenerator, _) = regenerator_over(base);

        let patch = Patch::new(PatchKind::Input, 60, 2, 10.0);
        regenerator.restore_patch(&patch).unwrap();

        let values = patch.values();
        assert_relative_eq!(values[0], 0.5 * (omega * 60.0).sin(), epsilon = 1e-3);
        assert_relative_eq!(values[1], 0.5 * (omega * 61.0).sin(), epsilon = 1e-3);
    }

    #[test]
    fn test_error_patch_fills_the_sentinel() {
        let (regenerator, _) = regenerator_over(vec![0.3; 64]);
        let patch = Patch::new(PatchKind::PredictionError, 40, 3, 10.0);
        patch.set_values(vec![9.0, 9.0, 9.0]);

        regenerator.restore_patch(&patch).unwrap();
        assert_eq!(patch.values(), vec![NO_ERROR; 3]);
    }

    #[test]
    fn test_registered_patch_refills_to_same_values() {
        let omega = 0.3;
        let mut base: Vec<Sample> = (0..96).map(|i| 0.5 * (omega * i as f64).sin()).collect();
        base[60] = 4.0;
        let (regenerator, registry) = regenerator_over(base);
        let regenerator = Arc::new(regenerator);

        let patch = Arc::new(Patch::new(PatchKind::Input, 60, 1, 10.0));
        regenerator.restore_patch(&patch).unwrap();
        let first = patch.values();
        registry.insert(Arc::clone(&patch));

        // Refilling after registration must be idempotent.
        regenerator.restore_patch(&patch).unwrap();
        assert_eq!(patch.values(), first);
    }

    #[test]
    fn test_context_reads_earlier_repairs() {
        let omega = 0.3;
        let mut base: Vec<Sample> = (0..96).map(|i| 0.5 * (omega * i as f64).sin()).collect();
        base[60] = 4.0;
        base[70] = -4.0;
        let (regenerator, registry) = regenerator_over(base);

        // Repair the first glitch and register it.
        let first = Arc::new(Patch::new(PatchKind::Input, 60, 1, 10.0));
        regenerator.restore_patch(&first).unwrap();
        registry.insert(Arc::clone(&first));

        // The second repair's context window spans position 60 and must
        // see the corrected value there, not the glitch.
        let second = Patch::new(PatchKind::Input, 70, 1, 10.0);
        regenerator.restore_patch(&second).unwrap();
        assert_relative_eq!(
            second.values()[0],
            0.5 * (omega * 70.0).sin(),
            epsilon = 1e-3
        );
    }
}
