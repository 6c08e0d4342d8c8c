//! Error types for finja library operations.
//!
//! Library code returns [`Result`] with a [`FinjaError`]; the binaries wrap
//! these in `anyhow` for top-level reporting.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using FinjaError
pub type Result<T> = std::result::Result<T, FinjaError>;

#[derive(Error, Debug)]
pub enum FinjaError {
    /// No store file in the start directory or any of its parents
    #[error("could not find FINJA in {} or any parent directory", .start.display())]
    StoreNotFound { start: PathBuf },

    /// The store was written by an incompatible schema version
    #[error(
        "database version {} does not match expected version {expected}; delete FINJA and reindex",
        .found.map(|v| v.to_string()).unwrap_or_else(|| "<missing>".to_string())
    )]
    VersionMismatch { found: Option<i64>, expected: i64 },

    /// The token id watermark reached the largest representable id
    #[error("out of token space; delete FINJA and reindex")]
    TokenSpaceExhausted,

    /// A persisted setting holds a value of the wrong type
    #[error("invalid value stored for setting {key}")]
    InvalidSetting { key: &'static str },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FinjaError {
    /// Returns false for errors that only concern the file being processed.
    ///
    /// Indexing skips a file whose content cannot be read and carries on with
    /// the walk; everything else aborts the invocation.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, FinjaError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_are_contained() {
        let err = FinjaError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert!(!err.is_fatal());
        assert!(FinjaError::TokenSpaceExhausted.is_fatal());
        assert!(
            FinjaError::VersionMismatch {
                found: Some(3),
                expected: 1
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_version_mismatch_message() {
        let err = FinjaError::VersionMismatch {
            found: None,
            expected: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("<missing>"));
        assert!(msg.contains("reindex"));
    }
}
