//! Error types for the acquisition pipeline.
//!
//! Every failure mode a caller may want to react to is its own variant, so
//! the UI layer can show kind-specific remediation instead of a generic
//! "acquisition failed". No variant is fatal to the host process; each one
//! resolves a single distribution's operation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::catalog::CatalogError;

/// Result type for acquisition operations.
pub type AcquireResult<T> = Result<T, AcquireError>;

/// Errors that can occur while acquiring a distribution.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// Failed to read a file or directory.
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file or directory.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDirFailed { path: PathBuf, source: io::Error },

    /// The source URL could not be reached, or answered non-2xx before any
    /// payload bytes were committed to disk.
    #[error("source unreachable: {url} ({status})")]
    SourceUnreachable { url: String, status: String },

    /// A transfer was interrupted after it started streaming.
    #[error("transfer failed for {url}: {reason}")]
    TransferFailed { url: String, reason: String },

    /// The request timed out (connect or stalled transfer).
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// Downloaded file does not match the expected SHA-256 digest.
    #[error("checksum mismatch for {filename}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        filename: String,
        expected: String,
        actual: String,
    },

    /// An external extraction tool exited non-zero or could not be run.
    #[error("extraction tool '{tool}' failed with status {status}: {stderr}")]
    ExtractionToolFailed {
        tool: String,
        status: i32,
        stderr: String,
    },

    /// The resolver exhausted its search without finding a payload archive.
    #[error("no payload archive found in {}", path.display())]
    PayloadNotFound { path: PathBuf },

    /// The operation was cancelled by the caller.
    #[error("acquisition cancelled")]
    Cancelled,

    /// The catalog has no record for this name.
    #[error("unknown distribution: {name}")]
    UnknownDistribution { name: String },

    /// The record exists but carries no source URL to download from.
    #[error("distribution '{name}' has no source URL")]
    MissingSourceUrl { name: String },

    /// Another acquisition for the same name is already in flight.
    #[error("acquisition already in progress for '{name}'")]
    AcquisitionInProgress { name: String },

    /// The catalog rejected a record update during finalization.
    #[error("catalog update failed: {0}")]
    Catalog(#[from] CatalogError),
}

impl AcquireError {
    /// Whether this error is a user-initiated cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether retrying the same acquisition later could plausibly succeed
    /// without any change on the caller's side.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TransferFailed { .. } | Self::Timeout { .. } | Self::SourceUnreachable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_unreachable_display() {
        let err = AcquireError::SourceUnreachable {
            url: "https://example.com/rootfs.tar.gz".to_string(),
            status: "404 Not Found".to_string(),
        };
        assert!(err.to_string().contains("source unreachable"));
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_checksum_mismatch_display() {
        let err = AcquireError::ChecksumMismatch {
            filename: "alpine.rootfs.tar".to_string(),
            expected: "abc123".to_string(),
            actual: "def456".to_string(),
        };
        assert!(err.to_string().contains("checksum mismatch"));
        assert!(err.to_string().contains("abc123"));
        assert!(err.to_string().contains("def456"));
    }

    #[test]
    fn test_is_cancelled() {
        assert!(AcquireError::Cancelled.is_cancelled());
        assert!(!AcquireError::PayloadNotFound {
            path: PathBuf::from("/tmp/x")
        }
        .is_cancelled());
    }

    #[test]
    fn test_is_transient() {
        let err = AcquireError::TransferFailed {
            url: "http://a".to_string(),
            reason: "reset".to_string(),
        };
        assert!(err.is_transient());
        assert!(!AcquireError::Cancelled.is_transient());
    }
}
