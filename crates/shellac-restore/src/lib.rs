//! Impulsive damage restoration for sampled audio
//!
//! Finds clicks, pops, and short drop-outs in a channel of samples and
//! replaces them with values predicted from the surrounding signal.
//!
//! ## Pipeline
//!
//! - [`Scanner`] computes a prediction error map over the whole buffer in
//!   parallel, then walks it once to detect and repair damage
//! - [`ClickDetector`] compares each error against an adaptive norm of the
//!   recent error level and sizes a damage run when it fires
//! - [`Regenerator`] re-predicts the damaged span from the corrected
//!   signal to its left
//! - [`Patch`] overlays carry every repair; the input buffer itself is
//!   never written
//!
//! ## Usage
//!
//! [`Channel`] ties the pieces together: construct it over raw samples,
//! call [`Channel::scan`] once, then read corrected output through
//! [`Channel::output_sample`] and adjust individual repairs with
//! [`Channel::revise_patch`].

#![warn(missing_docs)]

pub mod channel;
pub mod detector;
mod error;
pub mod patch;
pub mod patch_maker;
pub mod patcher;
pub mod regenerator;
pub mod registry;
pub mod scanner;

pub use channel::{Channel, PatchRevision};
pub use detector::{ClickDetector, DamageEvent, Detection, RUN_EXTEND_RATIO};
pub use error::{RestoreError, RestoreResult};
pub use patch::{NO_ERROR, Patch, PatchKind, Regenerate};
pub use patch_maker::PatchMaker;
pub use patcher::Patcher;
pub use regenerator::Regenerator;
pub use registry::PatchRegistry;
pub use scanner::{PROGRESS_STRIDE, ScanReport, Scanner, ScannerTools};
