//! Shellac DSP primitives
//!
//! Numerical building blocks for impulsive-noise restoration:
//!
//! ## Prediction
//! - Burg-method adaptive forward linear prediction
//! - Per-call coefficient refit over a trailing window
//! - Degenerate-window fallbacks (short, silent, singular)
//!
//! ## Error statistics
//! - Averaged-max running norm of prediction errors
//! - Block maxima keep single outliers from swinging the scale

#![warn(missing_docs)]

pub mod analyzer;
pub mod predictor;

pub use analyzer::ErrorNormAnalyzer;
pub use predictor::BurgPredictor;
