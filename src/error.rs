//! Unified error handling for the skybanner crate
//!
//! Catalog, scheduler and publisher errors stay in their modules. This module
//! folds them into one [`Error`] that the binary classifies at startup.
//!
//! ```rust,ignore
//! use skybanner::error::{Error, SkybannerErrorTrait};
//!
//! let err: Error = store.reconcile(dir).unwrap_err().into();
//! eprintln!("{} failure (recoverable: {}): {err}", err.category(), err.is_recoverable());
//! ```

use std::fmt;
use thiserror::Error;

// Domain errors, reachable from one place
pub use crate::catalog::error::CatalogError;
pub use crate::publisher::PublishError;
pub use crate::scheduler::error::SchedulerError;

/// Common trait for all skybanner error types
pub trait SkybannerErrorTrait: std::error::Error {
    /// Check if this error is recoverable (a later cycle may succeed)
    fn is_recoverable(&self) -> bool;

    /// Which part of the system failed
    fn category(&self) -> ErrorCategory;
}

/// Where an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Catalog file and banner directory errors
    Storage,
    /// Selection and timing errors
    Scheduler,
    /// Image processing and remote profile errors
    Publisher,
    /// Bad settings: schedule mode, service URL, credentials
    Config,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Storage => "storage",
            Self::Scheduler => "scheduler",
            Self::Publisher => "publisher",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified error type for the skybanner crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),
}

impl SkybannerErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Catalog(e) => e.is_recoverable(),
            Self::Scheduler(e) => e.is_recoverable(),
            Self::Publish(e) => e.is_recoverable(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Catalog(_) => ErrorCategory::Storage,
            Self::Scheduler(SchedulerError::UnknownScheduleMode { .. }) => ErrorCategory::Config,
            Self::Scheduler(_) => ErrorCategory::Scheduler,
            Self::Publish(PublishError::InvalidConfig(_)) => ErrorCategory::Config,
            Self::Publish(_) => ErrorCategory::Publisher,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_error_category() {
        let err: Error = CatalogError::unreadable(Path::new("bannerData.json"), "bad json").into();
        assert_eq!(err.category(), ErrorCategory::Storage);

        let err: Error = SchedulerError::EmptyCatalog.into();
        assert_eq!(err.category(), ErrorCategory::Scheduler);

        let err: Error = SchedulerError::unknown_mode("yearly").into();
        assert_eq!(err.category(), ErrorCategory::Config);

        let err: Error = PublishError::UploadRejected("413".into()).into();
        assert_eq!(err.category(), ErrorCategory::Publisher);
    }

    #[test]
    fn test_is_recoverable() {
        let err: Error = PublishError::UploadRejected("500".into()).into();
        assert!(err.is_recoverable());

        let err: Error = SchedulerError::EmptyCatalog.into();
        assert!(!err.is_recoverable());

        let err: Error = CatalogError::unknown_identity("gone.png").into();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_error_conversion() {
        let unified: Error = PublishError::Authentication("bad password".into()).into();
        assert!(matches!(unified, Error::Publish(_)));
        assert!(unified.to_string().contains("bad password"));
    }

    #[test]
    fn test_invalid_publisher_config_is_config() {
        let err: Error = PublishError::InvalidConfig("BLUESKY_IDENTIFIER is not set".into()).into();
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(!err.is_recoverable());
        assert_eq!(err.category().to_string(), "config");
    }
}
