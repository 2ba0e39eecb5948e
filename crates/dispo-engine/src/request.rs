//! Typed availability requests and engine configuration.

use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::dst::DstPolicy;
use crate::error::{DispoError, Result};

/// Daily clock-time range within which meetings may be scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkWindow {
    start: NaiveTime,
    end: NaiveTime,
}

impl WorkWindow {
    /// Returns `None` unless `start < end`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }
}

impl Default for WorkWindow {
    /// 09:00 to 18:00.
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
        }
    }
}

/// A fully parsed request: which days to search and what counts as a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityRequest {
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
    pub duration: Duration,
    pub window: WorkWindow,
    pub allow_weekends: bool,
    pub excluded_dates: BTreeSet<NaiveDate>,
    pub include_all_day_events: bool,
}

impl AvailabilityRequest {
    /// Weekdays only, no exclusions, all-day events ignored.
    pub fn new(range_start: NaiveDate, range_end: NaiveDate, duration: Duration, window: WorkWindow) -> Self {
        Self {
            range_start,
            range_end,
            duration,
            window,
            allow_weekends: false,
            excluded_dates: BTreeSet::new(),
            include_all_day_events: false,
        }
    }

    /// Check the range and duration invariants.
    pub fn validate(&self) -> Result<()> {
        if self.range_end < self.range_start {
            return Err(DispoError::field(
                "date_1",
                format!(
                    "range end {} is before range start {}",
                    self.range_end, self.range_start
                ),
            ));
        }
        if self.duration <= Duration::zero() {
            return Err(DispoError::field("duree", "duration must be positive"));
        }
        Ok(())
    }

    /// Every date of the range, inclusive, that the request asks to search.
    pub fn searched_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let mut next = Some(self.range_start);
        std::iter::from_fn(move || {
            let day = next.filter(|d| *d <= self.range_end)?;
            next = day.succ_opt();
            Some(day)
        })
        .filter(move |day| !self.excluded_dates.contains(day))
        .filter(move |day| self.allow_weekends || !is_weekend(*day))
    }
}

fn is_weekend(day: NaiveDate) -> bool {
    matches!(day.weekday(), Weekday::Sat | Weekday::Sun)
}

/// What to do when free-space extraction fails for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The whole request fails and the response reports the error.
    #[default]
    AbortRequest,
    /// The failing day is logged and left out; other days are still reported.
    SkipDay,
}

/// Engine settings threaded explicitly through every computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityConfig {
    pub timezone: Tz,
    pub dst_policy: DstPolicy,
    pub failure_policy: FailurePolicy,
}

impl AvailabilityConfig {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            dst_policy: DstPolicy::default(),
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Build a config from an IANA zone name such as `"Europe/Paris"`.
    pub fn for_timezone(name: &str) -> Result<Self> {
        let tz: Tz = name
            .parse()
            .map_err(|_| DispoError::InvalidTimezone(name.to_string()))?;
        Ok(Self::new(tz))
    }
}
