//! Running norm of recent prediction errors
//!
//! Detection in the restoration pipeline is comparative: an error is
//! "abnormal" relative to what the clean signal has recently produced,
//! never in absolute terms. This module maintains that reference scale.

use shellac_core::Sample;

/// Number of error magnitudes folded into one block maximum
pub const NORM_BLOCK_LEN: usize = 16;

/// Number of trailing block maxima averaged into the norm
pub const NORM_BLOCKS: usize = 32;

/// Floor applied to the norm so silence still yields a usable scale
pub const NORM_EPSILON: f64 = 1e-10;

/// Averaged-max norm over a trailing window of prediction errors.
///
/// Incoming magnitudes are grouped into blocks of [`NORM_BLOCK_LEN`]; the
/// norm is the mean of the last [`NORM_BLOCKS`] completed block maxima. A
/// single outlier can raise at most one block maximum, so the norm tracks
/// sustained level changes while staying damped against the very impulses
/// the detector is hunting.
#[derive(Debug, Clone, Default)]
pub struct ErrorNormAnalyzer {
    maxima: Vec<f64>,
    head: usize,
    block_max: f64,
    block_fill: usize,
}

impl ErrorNormAnalyzer {
    /// Create an analyzer with no history
    pub fn new() -> Self {
        Self {
            maxima: Vec::with_capacity(NORM_BLOCKS),
            head: 0,
            block_max: 0.0,
            block_fill: 0,
        }
    }

    /// Fold one clean prediction error into the rolling state
    pub fn push(&mut self, err: Sample) {
        let magnitude = err.abs();
        if magnitude > self.block_max {
            self.block_max = magnitude;
        }
        self.block_fill += 1;
        if self.block_fill == NORM_BLOCK_LEN {
            self.store_block(self.block_max);
            self.block_max = 0.0;
            self.block_fill = 0;
        }
    }

    /// True once at least one full block has been observed.
    ///
    /// Until then the norm carries no information and comparative
    /// detection should not fire.
    pub fn is_primed(&self) -> bool {
        !self.maxima.is_empty()
    }

    /// Current norm: mean of the stored block maxima, floored at
    /// [`NORM_EPSILON`]
    pub fn norm(&self) -> f64 {
        if self.maxima.is_empty() {
            return NORM_EPSILON;
        }
        let mean = self.maxima.iter().sum::<f64>() / self.maxima.len() as f64;
        mean.max(NORM_EPSILON)
    }

    /// Discard all history
    pub fn reset(&mut self) {
        self.maxima.clear();
        self.head = 0;
        self.block_max = 0.0;
        self.block_fill = 0;
    }

    fn store_block(&mut self, max: f64) {
        if self.maxima.len() < NORM_BLOCKS {
            self.maxima.push(max);
        } else {
            self.maxima[self.head] = max;
            self.head = (self.head + 1) % NORM_BLOCKS;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn push_n(analyzer: &mut ErrorNormAnalyzer, value: f64, count: usize) {
        for _ in 0..count {
            analyzer.push(value);
        }
    }

    #[test]
    fn test_unprimed_until_first_block_completes() {
        let mut analyzer = ErrorNormAnalyzer::new();
        push_n(&mut analyzer, 0.5, NORM_BLOCK_LEN - 1);
        assert!(!analyzer.is_primed());
        assert_eq!(analyzer.norm(), NORM_EPSILON);

        analyzer.push(0.5);
        assert!(analyzer.is_primed());
    }

    #[test]
    fn test_silence_is_floored() {
        let mut analyzer = ErrorNormAnalyzer::new();
        push_n(&mut analyzer, 0.0, NORM_BLOCK_LEN * NORM_BLOCKS);
        assert_eq!(analyzer.norm(), NORM_EPSILON);
    }

    #[test]
    fn test_steady_errors_set_the_scale() {
        let mut analyzer = ErrorNormAnalyzer::new();
        push_n(&mut analyzer, 0.01, NORM_BLOCK_LEN * NORM_BLOCKS);
        assert_relative_eq!(analyzer.norm(), 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_magnitude_is_sign_blind() {
        let mut analyzer = ErrorNormAnalyzer::new();
        for i in 0..NORM_BLOCK_LEN {
            analyzer.push(if i % 2 == 0 { 0.2 } else { -0.2 });
        }
        assert_relative_eq!(analyzer.norm(), 0.2, epsilon = 1e-12);
    }

    #[test]
    fn test_single_outlier_is_damped() {
        let mut analyzer = ErrorNormAnalyzer::new();
        push_n(&mut analyzer, 0.01, NORM_BLOCK_LEN * NORM_BLOCKS);
        let clean_norm = analyzer.norm();

        // One wild magnitude raises exactly one block maximum.
        analyzer.push(100.0);
        push_n(&mut analyzer, 0.01, NORM_BLOCK_LEN - 1);

        let damped = analyzer.norm();
        assert!(damped > clean_norm);
        assert!(damped <= clean_norm + 100.0 / NORM_BLOCKS as f64 + 1e-9);
    }

    #[test]
    fn test_outlier_eventually_rolls_out() {
        let mut analyzer = ErrorNormAnalyzer::new();
        push_n(&mut analyzer, 0.01, NORM_BLOCK_LEN * NORM_BLOCKS);
        analyzer.push(100.0);
        push_n(&mut analyzer, 0.01, NORM_BLOCK_LEN - 1);

        // A full window of clean blocks evicts the polluted one.
        push_n(&mut analyzer, 0.01, NORM_BLOCK_LEN * NORM_BLOCKS);
        assert_relative_eq!(analyzer.norm(), 0.01, epsilon = 1e-12);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut analyzer = ErrorNormAnalyzer::new();
        push_n(&mut analyzer, 0.5, NORM_BLOCK_LEN * 4);
        analyzer.reset();
        assert!(!analyzer.is_primed());
        assert_eq!(analyzer.norm(), NORM_EPSILON);
    }
}
