//! Forward linear prediction via Burg's method
//!
//! Features:
//! - Reflection-coefficient (lattice) estimation, minimum-phase by construction
//! - Coefficients re-fit from the local window on every call, so short
//!   stationary stretches are modeled well even across changing material
//! - Graceful degradation on short, silent, or numerically singular windows
//! - Zero-allocation hot path (scratch buffers reused across calls)

use log::trace;
use shellac_core::{ProcessingSettings, Sample};

/// Floor for the Burg denominator below which a reflection coefficient
/// is treated as zero instead of dividing by near-nothing.
const SINGULAR_DEN: f64 = 1e-10;

/// Adaptive forward predictor.
///
/// [`forward`](BurgPredictor::forward) estimates the sample that follows a
/// run of past samples. The model is re-estimated from the trailing
/// [`context_len`](BurgPredictor::context_len) samples on every call:
/// `window` samples feed the estimation, and the last `order` samples feed
/// the prediction itself.
///
/// The predictor never fails. Histories too short to fit the model fall
/// back to repeating the last sample, an empty history predicts silence,
/// and a non-finite result is replaced by the last sample, so the caller
/// always receives a finite value.
#[derive(Debug, Clone)]
pub struct BurgPredictor {
    order: usize,
    window: usize,
    coeffs: Vec<f64>,
    a: Vec<f64>,
    a_prev: Vec<f64>,
    fwd_err: Vec<f64>,
    bwd_err: Vec<f64>,
}

impl BurgPredictor {
    /// Create a predictor with the given model order and estimation window
    pub fn new(order: usize, window: usize) -> Self {
        let capacity = window + order;
        Self {
            order,
            window,
            coeffs: vec![0.0; order],
            a: vec![0.0; order + 1],
            a_prev: vec![0.0; order + 1],
            fwd_err: vec![0.0; capacity],
            bwd_err: vec![0.0; capacity],
        }
    }

    /// Create a predictor sized from processing settings
    pub fn from_settings(settings: &ProcessingSettings) -> Self {
        Self::new(settings.coefficients, settings.history_samples)
    }

    /// Model order (number of prediction coefficients)
    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of trailing history samples one prediction consumes
    pub fn context_len(&self) -> usize {
        self.window + self.order
    }

    /// Predict the sample that would follow `history`.
    ///
    /// Only the trailing [`context_len`](BurgPredictor::context_len) samples
    /// are read; earlier samples are ignored.
    pub fn forward(&mut self, history: &[Sample]) -> Sample {
        let Some(&last) = history.last() else {
            return 0.0;
        };
        let n = history.len().min(self.context_len());
        let window = &history[history.len() - n..];

        if self.order == 0 || n < self.order * 2 {
            trace!("window of {n} samples too short for order {}, repeating last sample", self.order);
            return last;
        }

        self.estimate(window);

        let mut prediction = 0.0;
        for (j, &c) in self.coeffs.iter().enumerate() {
            prediction += c * window[n - 1 - j];
        }
        if prediction.is_finite() { prediction } else { last }
    }

    /// Fit AR coefficients to `x` with the Burg lattice recursion.
    ///
    /// On return `self.coeffs[j]` holds the weight of the sample `j + 1`
    /// positions back.
    fn estimate(&mut self, x: &[Sample]) {
        let n = x.len();
        self.fwd_err[..n].copy_from_slice(x);
        self.bwd_err[..n].copy_from_slice(x);
        self.a[0] = 1.0;
        self.a[1..].fill(0.0);

        for k in 1..=self.order {
            let mut num = 0.0f64;
            let mut den = 0.0f64;
            for j in k..n {
                num += self.fwd_err[j] * self.bwd_err[j - 1];
                den += self.fwd_err[j] * self.fwd_err[j] + self.bwd_err[j - 1] * self.bwd_err[j - 1];
            }
            // A silent or fully whitened window yields no usable gradient;
            // a zero reflection coefficient leaves the model unchanged.
            let rc = if den > SINGULAR_DEN { -2.0 * num / den } else { 0.0 };

            self.a_prev[..=k].copy_from_slice(&self.a[..=k]);
            for j in 1..=k {
                self.a[j] = self.a_prev[j] + rc * self.a_prev[k - j];
            }

            // Lattice update in place. Both recursions read the pre-update
            // backward error one step behind, so it is carried by hand.
            let mut carried_bwd = self.bwd_err[k - 1];
            for j in k..n {
                let old_fwd = self.fwd_err[j];
                let old_bwd = carried_bwd;
                carried_bwd = self.bwd_err[j];
                self.fwd_err[j] = old_fwd + rc * old_bwd;
                self.bwd_err[j] = old_bwd + rc * old_fwd;
            }
        }

        for (j, c) in self.coeffs.iter_mut().enumerate() {
            *c = -self.a[j + 1];
        }
    }
}
