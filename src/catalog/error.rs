//! Error types for the banner catalog

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors raised while loading, reconciling or updating the catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Persisted catalog exists but could not be read or parsed
    #[error("Catalog file {} is unreadable: {reason}", path.display())]
    CatalogUnreadable { path: PathBuf, reason: String },

    /// Candidate directory could not be listed
    #[error("Banner directory {} is unreadable: {reason}", path.display())]
    DirectoryUnreadable { path: PathBuf, reason: String },

    /// Reconciled or updated catalog could not be written back
    #[error("Failed to write catalog file {}: {reason}", path.display())]
    WriteFailed { path: PathBuf, reason: String },

    /// Identity is not part of the catalog
    #[error("Unknown banner identity: {identity}")]
    UnknownIdentity { identity: String },

    /// A usage timestamp would move an entry backwards in time
    #[error("Non-monotonic usage for {identity}: {attempted} is older than {current}")]
    NonMonotonicUsage {
        identity: String,
        current: i64,
        attempted: i64,
    },
}

impl CatalogError {
    pub fn unreadable(path: &Path, reason: impl ToString) -> Self {
        Self::CatalogUnreadable {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn directory_unreadable(path: &Path, reason: impl ToString) -> Self {
        Self::DirectoryUnreadable {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn write_failed(path: &Path, reason: impl ToString) -> Self {
        Self::WriteFailed {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub fn unknown_identity(identity: impl Into<String>) -> Self {
        Self::UnknownIdentity {
            identity: identity.into(),
        }
    }

    /// Check if the error is recoverable
    ///
    /// Only write failures are worth another attempt on the next cycle; a
    /// corrupt catalog or a missing directory needs an operator.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::WriteFailed { .. } | Self::UnknownIdentity { .. })
    }
}
