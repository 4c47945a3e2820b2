//! Error types for the scanherd library.
//!
//! The error taxonomy distinguishes *configuration* errors (programming
//! mistakes by the submitter, surfaced immediately) from *execution* errors
//! (timeouts, crashes, missing artifacts), which are never raised past the
//! job executor boundary: they travel through the result queue as
//! [`ScanFailure`](crate::core::result::ScanFailure) values instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::types::ScannerKind;

/// The main error type for orchestration and collaborator operations.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A scan was submitted for a scanner kind with no registered backend.
    #[error("no scanner registered for kind '{kind}'")]
    UnsupportedScanner {
        /// The scanner kind that had no backend.
        kind: ScannerKind,
    },

    /// A scan was submitted with an empty target identifier.
    #[error("target must be a non-empty string")]
    EmptyTarget,

    /// The target source path does not exist.
    #[error("target path {} does not exist", path.display())]
    TargetPathMissing {
        /// Path that was not found.
        path: PathBuf,
    },

    /// The target source file does not have the expected shape.
    #[error("malformed target data in {}: {reason}", path.display())]
    MalformedTargets {
        /// File that failed to parse.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// A queue operation failed because the orchestrator is shutting down.
    #[error("orchestrator is no longer accepting work")]
    QueueClosed,

    /// Invalid orchestrator or scanner configuration.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON payload could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScanError {
    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a `MalformedTargets` error.
    pub fn malformed_targets(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedTargets {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error indicates a mistake by the caller
    /// rather than a transient failure of the environment.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedScanner { .. } | Self::EmptyTarget | Self::Configuration { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(ScanError::EmptyTarget.is_configuration());
        assert!(ScanError::UnsupportedScanner {
            kind: ScannerKind::Zap
        }
        .is_configuration());
        assert!(!ScanError::QueueClosed.is_configuration());
    }

    #[test]
    fn test_display_includes_context() {
        let err = ScanError::malformed_targets("/tmp/data.json", "expected a list");
        assert!(err.to_string().contains("/tmp/data.json"));
        assert!(err.to_string().contains("expected a list"));
    }
}
