//! Shellac core types
//!
//! Shared foundation for the Shellac audio restoration engine:
//! - `Sample` / `SampleBuffer` - f64 samples in an immutable, shareable arena
//! - `ProcessingSettings` - validated parameters for one restoration pass
//! - `StatusSink` / `ProgressSink` - reporting hooks for long scans

#![warn(missing_docs)]

mod error;
mod progress;
mod sample;
mod settings;

pub use error::{CoreError, CoreResult};
pub use progress::{NullSink, ProgressSink, StatusSink};
pub use sample::{Sample, SampleBuffer};
pub use settings::ProcessingSettings;
