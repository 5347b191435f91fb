//! Cycle reports
//!
//! Every cycle, successful or not, produces an ordered list of
//! human-readable status lines: a timestamped header, one line per completed
//! step, and the error line at which the cycle stopped. It is an audit
//! trail for operators, not a machine-parsed format.

use chrono::{DateTime, Utc};
use std::fmt;

const OK_MARK: &str = "✅";
const ERROR_MARK: &str = "❌";
const SKIP_MARK: &str = "⏭️";

/// How a cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Banner published and its usage recorded
    Published { identity: String, used_at: i64 },

    /// Publisher failed; the catalog is unchanged
    PublisherFailure { identity: String, reason: String },

    /// Published, but recording the usage failed
    RecordFailed { identity: String, reason: String },

    /// Fire skipped by the biweekly parity rule
    Skipped { iso_week: u32 },

    /// Nothing could be selected
    SelectionFailed { reason: String },
}

impl CycleOutcome {
    /// Whether the banner reached the remote profile
    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. } | Self::RecordFailed { .. })
    }

    /// Whether the cycle ended in an error
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::PublisherFailure { .. } | Self::RecordFailed { .. } | Self::SelectionFailed { .. }
        )
    }

    /// Identity of the banner the cycle worked on, if any
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::Published { identity, .. }
            | Self::PublisherFailure { identity, .. }
            | Self::RecordFailed { identity, .. } => Some(identity),
            Self::Skipped { .. } | Self::SelectionFailed { .. } => None,
        }
    }
}

/// Ordered status lines for one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    started_at: DateTime<Utc>,
    lines: Vec<String>,
}

impl CycleReport {
    /// Start a report with its timestamp header
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            lines: vec![format!("Update Report - {}", started_at.to_rfc3339())],
        }
    }

    /// Record a completed step
    pub fn success(&mut self, message: impl AsRef<str>) {
        self.lines.push(format!("{OK_MARK} {}", message.as_ref()));
    }

    /// Record the step at which the cycle stopped
    pub fn error(&mut self, message: impl AsRef<str>) {
        self.lines.push(format!("{ERROR_MARK} Error: {}", message.as_ref()));
    }

    /// Record a skipped fire
    pub fn skipped(&mut self, message: impl AsRef<str>) {
        self.lines.push(format!("{SKIP_MARK} {}", message.as_ref()));
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Whether any step reported an error
    pub fn has_errors(&self) -> bool {
        self.lines.iter().any(|l| l.starts_with(ERROR_MARK))
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.lines.join("\n"))
    }
}

/// A finished cycle: its outcome and the report it produced
#[derive(Debug, Clone)]
pub struct CycleResult {
    pub outcome: CycleOutcome,
    pub report: CycleReport,
}
