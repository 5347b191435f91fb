//! Schedule modes and fire-time computation
//!
//! A [`ScheduleMode`] is chosen once at startup. Each mode answers two
//! questions: when is the next fire after a given instant, and does a fire on
//! a given date actually publish. Only `Biweekly` ever says no to the second
//! question: it fires weekly but publishes on even ISO-8601 weeks only.
//!
//! All computations work on the wall clock of the time zone carried by the
//! `DateTime`, so the production trigger passes `chrono::Local` and tests
//! pass `Utc`.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::{SchedulerError, SchedulerResult};

/// Weekday on which weekly and biweekly schedules fire
pub const FIRE_WEEKDAY: Weekday = Weekday::Sun;

// ============================================================================
// Schedule Mode
// ============================================================================

/// Recurring cadence for banner rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    /// Every hour at minute 0
    Hourly,
    /// Every day at midnight
    Daily,
    /// Every Sunday at midnight
    Weekly,
    /// Every Sunday at midnight, publishing on even ISO weeks only
    Biweekly,
    /// The first day of every month at midnight
    Monthly,
}

impl ScheduleMode {
    /// Get all schedule modes
    pub fn all() -> Vec<Self> {
        vec![
            Self::Hourly,
            Self::Daily,
            Self::Weekly,
            Self::Biweekly,
            Self::Monthly,
        ]
    }

    /// Get mode ID as string
    pub fn id(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
        }
    }

    /// Human-readable cadence
    pub fn description(&self) -> &'static str {
        match self {
            Self::Hourly => "every hour at minute 0",
            Self::Daily => "every day at midnight",
            Self::Weekly => "every Sunday at midnight",
            Self::Biweekly => "every other Sunday at midnight (even ISO weeks)",
            Self::Monthly => "on the first day of every month at midnight",
        }
    }

    /// Parse from string
    pub fn from_id(id: &str) -> SchedulerResult<Self> {
        match id.trim().to_lowercase().as_str() {
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "biweekly" | "bi-weekly" => Ok(Self::Biweekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(SchedulerError::unknown_mode(id)),
        }
    }

    /// Compute the first fire strictly after `after`
    ///
    /// Returns `None` only when the calendar runs out (dates near the end of
    /// chrono's supported range).
    pub fn next_fire_after<Tz: TimeZone>(&self, after: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let tz = after.timezone();
        let mut base = after.naive_local();

        // A DST fold can map the candidate back onto or before `after`; step
        // past it and try again.
        for _ in 0..4 {
            let candidate = self.next_local_after(base)?;
            let fire = resolve_local(&tz, candidate)?;
            if fire > *after {
                return Some(fire);
            }
            base = candidate;
        }

        None
    }

    /// Whether a fire on `fire_date` runs a publish cycle
    pub fn executes_on(&self, fire_date: NaiveDate) -> bool {
        match self {
            Self::Biweekly => is_even_iso_week(fire_date),
            _ => true,
        }
    }

    /// Next fire after `after` that actually publishes
    pub fn next_execution_after<Tz: TimeZone>(
        &self,
        after: &DateTime<Tz>,
    ) -> Option<DateTime<Tz>> {
        let mut cursor = after.clone();
        // Biweekly can skip at most two weeks in a row (week 53 followed by week 1).
        for _ in 0..4 {
            let fire = self.next_fire_after(&cursor)?;
            if self.executes_on(fire.date_naive()) {
                return Some(fire);
            }
            cursor = fire;
        }
        None
    }

    /// The next `count` fires after `after`, including ones the parity rule skips
    pub fn upcoming_fires<Tz: TimeZone>(
        &self,
        after: &DateTime<Tz>,
        count: usize,
    ) -> Vec<DateTime<Tz>> {
        let mut fires = Vec::with_capacity(count);
        let mut cursor = after.clone();
        while fires.len() < count {
            match self.next_fire_after(&cursor) {
                Some(fire) => {
                    cursor = fire.clone();
                    fires.push(fire);
                }
                None => break,
            }
        }
        fires
    }

    /// Next wall-clock slot strictly after `local`, ignoring time zone gaps
    fn next_local_after(&self, local: NaiveDateTime) -> Option<NaiveDateTime> {
        let date = local.date();
        match self {
            Self::Hourly => {
                let top_of_hour = date.and_hms_opt(local.hour(), 0, 0)?;
                top_of_hour.checked_add_signed(Duration::hours(1))
            }
            Self::Daily => date.succ_opt()?.and_hms_opt(0, 0, 0),
            Self::Weekly | Self::Biweekly => {
                let today = date.weekday().num_days_from_monday();
                let target = FIRE_WEEKDAY.num_days_from_monday();
                let days_ahead = match (7 + target - today) % 7 {
                    0 => 7,
                    n => n,
                };
                date.checked_add_signed(Duration::days(i64::from(days_ahead)))?
                    .and_hms_opt(0, 0, 0)
            }
            Self::Monthly => {
                let (year, month) = if date.month() == 12 {
                    (date.year() + 1, 1)
                } else {
                    (date.year(), date.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)
            }
        }
    }
}

impl fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for ScheduleMode {
    type Err = SchedulerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s)
    }
}

impl Default for ScheduleMode {
    fn default() -> Self {
        Self::Hourly
    }
}

// ============================================================================
// ISO Week Helpers
// ============================================================================

/// ISO-8601 week number of `date` (week 1 contains the year's first Thursday)
pub fn iso_week_number(date: NaiveDate) -> u32 {
    date.iso_week().week()
}

/// Whether `date` falls in an even-numbered ISO week
///
/// Parity is relative to the ISO calendar year, so years with 53 weeks
/// produce two odd weeks in a row (53, then 1).
pub fn is_even_iso_week(date: NaiveDate) -> bool {
    iso_week_number(date) % 2 == 0
}

/// Map a wall-clock time to an instant, skipping forward over DST gaps and
/// taking the earlier instant inside a fold
fn resolve_local<Tz: TimeZone>(tz: &Tz, local: NaiveDateTime) -> Option<DateTime<Tz>> {
    (0..=3).find_map(|hours| {
        let shifted = local.checked_add_signed(Duration::hours(hours))?;
        tz.from_local_datetime(&shifted).earliest()
    })
}

// ============================================================================
// Tests
// ============================================================================
