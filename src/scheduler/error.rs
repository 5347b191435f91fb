//! Error types for the scheduler module

use std::fmt;

use super::schedule::ScheduleMode;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
#[derive(Debug)]
pub enum SchedulerError {
    /// Schedule mode name not recognized
    UnknownScheduleMode {
        mode: String,
        valid_options: Vec<String>,
    },

    /// No candidate banners to select from
    EmptyCatalog,

    /// No future fire time could be computed for the mode
    NoUpcomingFire {
        mode: String,
    },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownScheduleMode {
                mode,
                valid_options,
            } => {
                write!(
                    f,
                    "Unknown schedule mode '{}'. Valid options: {}",
                    mode,
                    valid_options.join(", ")
                )
            }
            Self::EmptyCatalog => {
                write!(f, "No banners available to rotate")
            }
            Self::NoUpcomingFire { mode } => {
                write!(f, "No upcoming fire time for {} schedule", mode)
            }
        }
    }
}

impl std::error::Error for SchedulerError {}

impl SchedulerError {
    /// Create an unknown schedule mode error
    pub fn unknown_mode(mode: impl Into<String>) -> Self {
        Self::UnknownScheduleMode {
            mode: mode.into(),
            valid_options: ScheduleMode::all()
                .iter()
                .map(|m| m.id().to_string())
                .collect(),
        }
    }

    /// Check if the error is recoverable
    ///
    /// None are: each needs a settings change or new banners first.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::UnknownScheduleMode { .. } | Self::EmptyCatalog | Self::NoUpcomingFire { .. } => {
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_mode_lists_options() {
        let err = SchedulerError::unknown_mode("fortnightly");
        let msg = err.to_string();
        assert!(msg.contains("fortnightly"));
        assert!(msg.contains("hourly"));
        assert!(msg.contains("biweekly"));
        assert!(msg.contains("monthly"));
    }

    #[test]
    fn test_empty_catalog_message() {
        assert!(SchedulerError::EmptyCatalog
            .to_string()
            .contains("No banners"));
    }

    #[test]
    fn test_is_recoverable() {
        let no_fire = SchedulerError::NoUpcomingFire {
            mode: "monthly".into(),
        };
        assert!(!no_fire.is_recoverable());
        assert!(!SchedulerError::EmptyCatalog.is_recoverable());
        assert!(!SchedulerError::unknown_mode("x").is_recoverable());
    }
}
