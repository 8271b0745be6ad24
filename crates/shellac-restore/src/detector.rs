//! Damage detection over the effective prediction-error view
//!
//! Detection is comparative: a position is damaged when its prediction
//! error is large relative to the running norm of recent clean errors,
//! never against a fixed level. Quiet and loud material therefore get the
//! same sensitivity.

use shellac_core::ProcessingSettings;
use shellac_dsp::ErrorNormAnalyzer;

use crate::error::RestoreResult;
use crate::patcher::Patcher;

/// Fraction of the opening threshold an error must keep exceeding for a
/// damage run to stay open
pub const RUN_EXTEND_RATIO: f64 = 0.5;

/// One detected damage run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageEvent {
    /// First damaged position
    pub start: usize,
    /// Number of damaged positions
    pub run_len: usize,
    /// Peak error magnitude across the run, in units of the norm
    pub error_level: f64,
}

/// Outcome of assessing a single position
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Detection {
    /// Position looks clean; its error was folded into the rolling norm
    Clean,
    /// A damage run starts here
    Damaged(DamageEvent),
}

/// Walks prediction errors position by position and flags abnormal runs.
///
/// Errors of repaired spans arrive as the no-error sentinel through the
/// masked view, so the detector never re-flags what has already been
/// fixed. Damaged positions are not folded into the norm; only clean
/// errors shape the reference scale.
pub struct ClickDetector {
    analyzer: ErrorNormAnalyzer,
    threshold: f64,
    max_run: usize,
}

impl ClickDetector {
    /// Create a detector configured from processing settings
    pub fn new(settings: &ProcessingSettings) -> Self {
        Self {
            analyzer: ErrorNormAnalyzer::new(),
            threshold: settings.detection_threshold,
            max_run: settings.max_correction_samples,
        }
    }

    /// Current detection gate (threshold times the running norm)
    pub fn gate(&self) -> f64 {
        self.threshold * self.analyzer.norm()
    }

    /// Assess position `pos` of the effective error view.
    ///
    /// The caller advances by one on [`Detection::Clean`] and resumes
    /// after the covered range on [`Detection::Damaged`]. Until the norm
    /// has seen its first full block of clean errors, nothing is flagged.
    pub fn assess(&mut self, errors: &Patcher, pos: usize) -> RestoreResult<Detection> {
        let err = errors.effective(pos)?;
        let gate = self.gate();
        if self.analyzer.is_primed() && err.abs() >= gate {
            let event = self.extend_run(errors, pos, gate)?;
            return Ok(Detection::Damaged(event));
        }
        self.analyzer.push(err);
        Ok(Detection::Clean)
    }

    /// Extend a run from `start` while the error stays elevated.
    ///
    /// The run closes when the magnitude falls below
    /// [`RUN_EXTEND_RATIO`] of the opening gate, when it reaches the
    /// maximum correction length, or at the end of the buffer.
    fn extend_run(&self, errors: &Patcher, start: usize, gate: f64) -> RestoreResult<DamageEvent> {
        let len = errors.len();
        let keep_open = gate * RUN_EXTEND_RATIO;
        let norm = self.analyzer.norm();
        let mut end = start;
        let mut peak = 0.0f64;

        while end < len && end - start < self.max_run {
            let magnitude = errors.effective(end)?.abs();
            if end > start && magnitude < keep_open {
                break;
            }
            peak = peak.max(magnitude);
            end += 1;
        }

        Ok(DamageEvent {
            start,
            run_len: end - start,
            error_level: peak / norm,
        })
    }
}
