//! Error types for the restoration pipeline

use thiserror::Error;

/// Restoration error type
#[derive(Error, Debug)]
pub enum RestoreError {
    /// Channel constructed over an empty sample buffer
    #[error("Input buffer is empty")]
    EmptyInput,

    /// Settings rejected during validation
    #[error(transparent)]
    Settings(#[from] shellac_core::CoreError),

    /// Positional read past the end of the buffer
    #[error("Position {pos} out of range (buffer length {len})")]
    OutOfRange {
        /// Requested position
        pos: usize,
        /// Length of the buffer that was read
        len: usize,
    },

    /// Scan requested on a channel that has already been scanned
    #[error("Channel already scanned; build a new channel to scan again")]
    AlreadyScanned,

    /// Operation requires a completed scan
    #[error("Channel has not been scanned yet")]
    NotPreprocessed,

    /// Patch creation with an unusable range
    #[error("Invalid patch bounds: start {start}, length {len}")]
    InvalidPatchBounds {
        /// Requested start position
        start: usize,
        /// Requested length
        len: usize,
    },

    /// Patch boundary revision refused
    #[error("Patch revision rejected: {0}")]
    RevisionRejected(String),

    /// No patch starts at the named position
    #[error("No patch starting at position {0}")]
    NoSuchPatch(usize),

    /// Refresh requested on a patch whose regenerator is gone
    #[error("Patch is not bound to a live regenerator")]
    UnboundPatch,
}

/// Result type for restoration operations
pub type RestoreResult<T> = Result<T, RestoreError>;
