//! Scan orchestration
//!
//! A scan runs in two phases with a hard barrier between them:
//!
//! 1. **Error map** - the prediction error of every position is computed
//!    from the raw input. Positions are independent here, so the range is
//!    cut into disjoint chunks and farmed out to the rayon pool.
//! 2. **Detect and repair** - strictly sequential. Each repair rewrites
//!    the context of everything after it, so later decisions must see
//!    earlier patches.
//!
//! Progress maps phase one to 0-50 and phase two to 50-100. Only the
//! worker of the first chunk reports during phase one, using its own chunk
//! as a proxy for the whole phase; the others stay silent rather than
//! fight over the sink.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;
use serde::{Deserialize, Serialize};
use shellac_core::{ProcessingSettings, ProgressSink, Sample, SampleBuffer, StatusSink};
use shellac_dsp::BurgPredictor;

use crate::detector::{ClickDetector, Detection};
use crate::error::RestoreResult;
use crate::patch_maker::PatchMaker;
use crate::patcher::Patcher;
use crate::regenerator::Regenerator;
use crate::registry::PatchRegistry;

/// Positions between two progress reports
pub const PROGRESS_STRIDE: usize = 1000;

/// Views, registries, and the regenerator produced by one scan
pub struct ScannerTools {
    /// Corrected read-through view of the input samples
    pub input_view: Patcher,
    /// Masked read-through view of the prediction errors
    pub err_view: Patcher,
    /// Registry of input patches
    pub input_registry: Arc<PatchRegistry>,
    /// Registry of the no-error mirror patches
    pub err_registry: Arc<PatchRegistry>,
    /// Regenerator serving the patches of this scan
    pub regenerator: Arc<Regenerator>,
}

/// Summary of one completed scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    /// Number of repairs (each repair is one input patch plus its mirror)
    pub patch_count: usize,
    /// Positions the detector examined
    pub positions_scanned: usize,
    /// Wall-clock duration of the whole scan
    pub elapsed: Duration,
}

/// One-pass damage scanner over a single channel's samples
pub struct Scanner {
    samples: SampleBuffer,
    settings: ProcessingSettings,
}

impl Scanner {
    /// Create a scanner over `samples`
    pub fn new(samples: SampleBuffer, settings: ProcessingSettings) -> Self {
        Self { samples, settings }
    }

    /// Run the full scan and hand back the tools plus a report.
    ///
    /// Buffers shorter than the prediction context complete immediately
    /// with zero repairs.
    pub fn scan(
        &self,
        status: &dyn StatusSink,
        progress: &dyn ProgressSink,
    ) -> RestoreResult<(ScannerTools, ScanReport)> {
        let started = Instant::now();
        let len = self.samples.len();
        let first_valid = self.settings.input_data_size();

        status.report("Computing prediction error map");
        progress.report(0.0);
        let err_map = self.compute_error_map(progress);
        debug!(
            "error map over {len} samples done in {:?}",
            started.elapsed()
        );

        let input_registry = Arc::new(PatchRegistry::new());
        let err_registry = Arc::new(PatchRegistry::new());
        let input_view = Patcher::new(self.samples.clone(), Arc::clone(&input_registry));
        let err_view = Patcher::new(SampleBuffer::new(err_map), Arc::clone(&err_registry));
        let regenerator = Arc::new(Regenerator::new(
            input_view.clone(),
            BurgPredictor::from_settings(&self.settings),
        ));
        let tools = ScannerTools {
            input_view,
            err_view,
            input_registry,
            err_registry,
            regenerator,
        };

        status.report("Scanning for damage");
        let patch_count = self.detect_and_repair(&tools, progress)?;

        tools.input_registry.close();
        tools.err_registry.close();

        let report = ScanReport {
            patch_count,
            positions_scanned: len.saturating_sub(first_valid),
            elapsed: started.elapsed(),
        };
        status.report(&format!("Scan complete: {patch_count} repairs"));
        progress.report(100.0);
        debug!(
            "scan done: {patch_count} repairs over {} positions in {:?}",
            report.positions_scanned, report.elapsed
        );
        Ok((tools, report))
    }

    /// Phase one: raw prediction error per position, in parallel.
    ///
    /// The warm-up prefix stays zero. Every worker rebuilds the predictor
    /// state from the raw samples before its positions, so chunk
    /// boundaries cannot change any value.
    fn compute_error_map(&self, progress: &dyn ProgressSink) -> Vec<Sample> {
        let len = self.samples.len();
        let first_valid = self.settings.input_data_size();
        let mut err_map = vec![0.0; len];
        if len <= first_valid {
            return err_map;
        }

        let span = len - first_valid;
        let workers = rayon::current_num_threads().max(1);
        let chunk_len = (span / workers).max(first_valid);
        let raw = self.samples.as_slice();
        let order = self.settings.coefficients;
        let window = self.settings.history_samples;

        let tail = &mut err_map[first_valid..];
        rayon::scope(|s| {
            let mut rest = tail;
            let mut base = first_valid;
            let mut reporter = true;
            while !rest.is_empty() {
                let take = chunk_len.min(rest.len());
                let (chunk, remainder) = std::mem::take(&mut rest).split_at_mut(take);
                rest = remainder;
                let chunk_base = base;
                base += take;
                let report_here = reporter;
                reporter = false;

                s.spawn(move |_| {
                    let mut predictor = BurgPredictor::new(order, window);
                    let total = chunk.len();
                    for (i, slot) in chunk.iter_mut().enumerate() {
                        let pos = chunk_base + i;
                        *slot = raw[pos] - predictor.forward(&raw[..pos]);
                        if report_here && i % PROGRESS_STRIDE == 0 {
                            progress.report(50.0 * i as f64 / total as f64);
                        }
                    }
                });
            }
        });
        err_map
    }

    /// Phase two: walk the masked error view, patch every damage run.
    ///
    /// Sequential on purpose: each patch changes the effective context of
    /// all positions after it.
    fn detect_and_repair(
        &self,
        tools: &ScannerTools,
        progress: &dyn ProgressSink,
    ) -> RestoreResult<usize> {
        let len = self.samples.len();
        let first_valid = self.settings.input_data_size();
        if len <= first_valid {
            return Ok(0);
        }

        let span = (len - first_valid) as f64;
        let mut detector = ClickDetector::new(&self.settings);
        let maker = PatchMaker::new(Arc::clone(&tools.regenerator), &self.settings, len);

        let mut patch_count = 0usize;
        let mut pos = first_valid;
        let mut next_report = first_valid;
        while pos < len {
            match detector.assess(&tools.err_view, pos)? {
                Detection::Clean => pos += 1,
                Detection::Damaged(event) => {
                    let (input_patch, err_patch) =
                        maker.new_patch(event.start, event.run_len, event.error_level)?;
                    pos = input_patch.end_position();
                    tools.input_registry.insert(input_patch);
                    tools.err_registry.insert(err_patch);
                    patch_count += 1;
                }
            }
            if pos >= next_report {
                progress.report(50.0 + 50.0 * (pos - first_valid) as f64 / span);
                next_report = pos + PROGRESS_STRIDE;
            }
        }
        Ok(patch_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellac_core::NullSink;

    fn small_settings() -> ProcessingSettings {
        ProcessingSettings {
            coefficients: 2,
            history_samples: 16,
            detection_threshold: 10.0,
            max_correction_samples: 10,
        }
    }

    #[test]
    fn test_error_map_warmup_prefix_is_zero() {
        let mut samples = vec![0.0; 256];
        samples[100] = 1.0;
        let scanner = Scanner::new(SampleBuffer::new(samples), small_settings());

        let err_map = scanner.compute_error_map(&NullSink);
        let first_valid = small_settings().input_data_size();
        assert!(err_map[..first_valid].iter().all(|&e| e == 0.0));
        assert_eq!(err_map[100], 1.0);
    }

    #[test]
    fn test_error_map_matches_sequential_reference() {
        // Chunked parallel computation must be indistinguishable from a
        // single-predictor sequential walk.
        let samples: Vec<Sample> = (0..400)
            .map(|i| 0.5 * (0.21 * i as f64).sin() + 0.1 * (1.7 * i as f64).cos())
            .collect();
        let settings = small_settings();
        let scanner = Scanner::new(SampleBuffer::new(samples.clone()), settings.clone());

        let err_map = scanner.compute_error_map(&NullSink);

        let mut predictor = BurgPredictor::from_settings(&settings);
        for pos in settings.input_data_size()..samples.len() {
            let expected = samples[pos] - predictor.forward(&samples[..pos]);
            assert_eq!(err_map[pos], expected, "position {pos}");
        }
    }

    #[test]
    fn test_short_buffer_completes_with_no_repairs() {
        let scanner = Scanner::new(SampleBuffer::new(vec![0.5; 10]), small_settings());
        let (tools, report) = scanner.scan(&NullSink, &NullSink).unwrap();

        assert_eq!(report.patch_count, 0);
        assert_eq!(report.positions_scanned, 0);
        assert!(tools.input_registry.is_empty());
        assert!(tools.input_registry.is_closed());
        assert!(tools.err_registry.is_closed());
    }

    #[test]
    fn test_scan_closes_registries() {
        let mut samples = vec![0.0; 512];
        samples[300] = 1.0;
        let scanner = Scanner::new(SampleBuffer::new(samples), small_settings());
        let (tools, report) = scanner.scan(&NullSink, &NullSink).unwrap();

        assert_eq!(report.patch_count, 1);
        assert!(tools.input_registry.is_closed());
        assert!(tools.err_registry.is_closed());
        assert_eq!(tools.input_registry.count(), 1);
        assert_eq!(tools.err_registry.count(), 1);
    }
}
