//! Turns damage runs into fully regenerated patch pairs
//!
//! Every repair is a pair: an input patch carrying the regenerated samples
//! and a prediction-error patch masking the same range with the no-error
//! sentinel. Both are filled before they are handed back, so nothing
//! half-built can ever reach a registry.

use std::sync::Arc;

use shellac_core::ProcessingSettings;

use crate::error::{RestoreError, RestoreResult};
use crate::patch::{Patch, PatchKind, Regenerate};
use crate::regenerator::Regenerator;

/// Builds regenerated patch pairs for detected damage runs
pub struct PatchMaker {
    regenerator: Arc<Regenerator>,
    max_len: usize,
    min_start: usize,
    buffer_len: usize,
}

impl PatchMaker {
    /// Create a maker producing patches for a buffer of `buffer_len`
    /// samples
    pub fn new(
        regenerator: Arc<Regenerator>,
        settings: &ProcessingSettings,
        buffer_len: usize,
    ) -> Self {
        Self {
            regenerator,
            max_len: settings.max_correction_samples,
            min_start: settings.input_data_size(),
            buffer_len,
        }
    }

    /// First position a patch may start at.
    ///
    /// Mirrors the predictor's context requirement: a patch any earlier
    /// could not be regenerated from a full history window.
    pub fn input_data_size(&self) -> usize {
        self.min_start
    }

    /// Build the input patch and its no-error mirror for one damage run.
    ///
    /// `run_len` is clamped to the maximum correction length and to the
    /// end of the buffer. Values are regenerated and both patches bound to
    /// the regenerator before anything is returned.
    pub fn new_patch(
        &self,
        start: usize,
        run_len: usize,
        error_level: f64,
    ) -> RestoreResult<(Arc<Patch>, Arc<Patch>)> {
        if run_len == 0 || start < self.min_start || start >= self.buffer_len {
            return Err(RestoreError::InvalidPatchBounds {
                start,
                len: run_len,
            });
        }
        let len = run_len.min(self.max_len).min(self.buffer_len - start);
        let updater: Arc<dyn Regenerate> = self.regenerator.clone();

        let input = Arc::new(Patch::new(PatchKind::Input, start, len, error_level));
        input.bind_updater(&updater);
        self.regenerator.restore_patch(&input)?;

        let mirror = Arc::new(Patch::new(
            PatchKind::PredictionError,
            start,
            len,
            error_level,
        ));
        mirror.bind_updater(&updater);
        self.regenerator.restore_patch(&mirror)?;

        Ok((input, mirror))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patcher::Patcher;
    use crate::registry::PatchRegistry;
    use shellac_core::{Sample, SampleBuffer};
    use shellac_dsp::BurgPredictor;

    fn maker_over(base: Vec<Sample>) -> PatchMaker {
        let settings = ProcessingSettings {
            coefficients: 2,
            history_samples: 16,
            detection_threshold: 5.0,
            max_correction_samples: 10,
        };
        let buffer_len = base.len();
        let view = Patcher::new(SampleBuffer::new(base), Arc::new(PatchRegistry::new()));
        let regenerator = Arc::new(Regenerator::new(view, BurgPredictor::from_settings(&settings)));
        PatchMaker::new(regenerator, &settings, buffer_len)
    }

    #[test]
    fn test_patch_pair_shares_range_and_level() {
        let maker = maker_over(vec![0.0; 100]);
        let (input, mirror) = maker.new_patch(50, 3, 12.5).unwrap();

        assert_eq!(input.kind(), PatchKind::Input);
        assert_eq!(mirror.kind(), PatchKind::PredictionError);
        assert_eq!(input.range(), (50, 3));
        assert_eq!(mirror.range(), (50, 3));
        assert_eq!(input.error_level_at_detection(), 12.5);
        assert_eq!(mirror.values(), vec![0.0; 3]);
    }

    #[test]
    fn test_run_clamped_to_max_correction_length() {
        let maker = maker_over(vec![0.0; 100]);
        let (input, _) = maker.new_patch(50, 40, 12.5).unwrap();
        assert_eq!(input.len(), 10);
    }

    #[test]
    fn test_run_clamped_to_buffer_end() {
        let maker = maker_over(vec![0.0; 100]);
        let (input, mirror) = maker.new_patch(95, 8, 12.5).unwrap();
        assert_eq!(input.range(), (95, 5));
        assert_eq!(mirror.range(), (95, 5));
    }

    #[test]
    fn test_start_inside_warmup_rejected() {
        let maker = maker_over(vec![0.0; 100]);
        // input_data_size is 18 with these settings
        assert_eq!(maker.input_data_size(), 18);
        assert!(matches!(
            maker.new_patch(17, 1, 5.0),
            Err(RestoreError::InvalidPatchBounds { start: 17, len: 1 })
        ));
    }

    #[test]
    fn test_degenerate_runs_rejected() {
        let maker = maker_over(vec![0.0; 100]);
        assert!(maker.new_patch(50, 0, 5.0).is_err());
        assert!(maker.new_patch(100, 1, 5.0).is_err());
    }

    #[test]
    fn test_patches_come_back_bound() {
        let maker = maker_over(vec![0.0; 100]);
        let (input, mirror) = maker.new_patch(50, 2, 5.0).unwrap();
        assert!(input.refresh().is_ok());
        assert!(mirror.refresh().is_ok());
    }
}
