//! Error types for easm-state operations.
//!
//! Reads and writes on the store never fail; errors only arise when a value
//! is converted into a typed Rust value or a flush reports listener panics.

use crate::Path;
use thiserror::Error;

/// Result type alias for easm-state operations.
pub type EasmResult<T> = Result<T, EasmError>;

/// Errors that can occur during easm-state operations.
#[derive(Debug, Error)]
pub enum EasmError {
    /// Nothing is stored at the path.
    #[error("path not found: {path}")]
    PathNotFound {
        /// The path that was not found.
        path: Path,
    },

    /// The stored value does not have the requested shape.
    #[error("cannot read {path} as {expected}: {source}")]
    Deserialize {
        /// The path that was read.
        path: Path,
        /// Name of the requested Rust type.
        expected: &'static str,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EasmError {
    /// Create a path not found error.
    #[inline]
    pub fn path_not_found(path: Path) -> Self {
        EasmError::PathNotFound { path }
    }
}
