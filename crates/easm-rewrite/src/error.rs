//! Error types for easm-rewrite.

use std::path::PathBuf;
use thiserror::Error;

/// Source text that could not be tokenized or parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{line}:{column}: {message}")]
pub struct ParseError {
    /// What went wrong.
    pub message: String,
    /// 1-based line of the offending token.
    pub line: usize,
    /// 1-based column of the offending token.
    pub column: usize,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// A module table that could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read module table {path}: {source}")]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid module table document.
    #[error("invalid module table: {0}")]
    Json(#[from] serde_json::Error),

    /// The document parsed but describes an unusable table.
    #[error("invalid module table entry {module:?}: {reason}")]
    Invalid {
        /// Module specifier of the offending entry.
        module: String,
        /// Why it was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("expected `)`", 3, 14);
        assert_eq!(err.to_string(), "3:14: expected `)`");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            module: "@easm/core".into(),
            reason: "no functions listed".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid module table entry \"@easm/core\": no functions listed"
        );
    }
}
