//! Error types for shellac-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// Settings rejected during validation
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;
