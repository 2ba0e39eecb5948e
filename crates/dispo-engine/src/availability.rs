//! Day-by-day free slot computation.
//!
//! For every searched day, the merged busy set is clipped to that day's
//! working window and the gaps between busy spans become candidate slots.
//! Candidates shorter than the requested duration are discarded.

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::dst;
use crate::error::{DispoError, Result};
use crate::event::CalendarEvent;
use crate::interval::TimeInterval;
use crate::normalize::busy_intervals;
use crate::request::{AvailabilityConfig, AvailabilityRequest, FailurePolicy, WorkWindow};

/// A free interval inside a working window, at least as long as requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilitySlot {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
    pub duration_minutes: i64,
}

impl AvailabilitySlot {
    fn from_interval(interval: &TimeInterval) -> Self {
        Self {
            start: interval.start(),
            end: interval.end(),
            duration_minutes: interval.duration().num_minutes(),
        }
    }

    /// The local calendar date the slot starts on.
    pub fn date(&self) -> NaiveDate {
        self.start.date_naive()
    }
}

/// Compute every slot for `request` given raw calendar events.
///
/// Validates the request, normalizes and merges the events, then walks the
/// searched days in order. The result is chronological and non-overlapping.
///
/// # Errors
/// Returns the validation error for an invalid request, or
/// `DispoError::Computation` when a day fails under
/// [`FailurePolicy::AbortRequest`].
pub fn find_availability(
    events: &[CalendarEvent],
    request: &AvailabilityRequest,
    config: &AvailabilityConfig,
) -> Result<Vec<AvailabilitySlot>> {
    request.validate()?;
    let busy = busy_intervals(events, request, config);
    debug!(
        events = events.len(),
        busy = busy.len(),
        "normalized busy intervals"
    );
    slots_from_busy(&busy, request, config)
}

/// Compute slots from an already merged busy set (sorted and disjoint).
pub fn slots_from_busy(
    busy: &[TimeInterval],
    request: &AvailabilityRequest,
    config: &AvailabilityConfig,
) -> Result<Vec<AvailabilitySlot>> {
    let mut slots = Vec::new();

    for day in request.searched_days() {
        let window = match day_window(day, &request.window, config) {
            Ok(window) => window,
            Err(err) => match config.failure_policy {
                FailurePolicy::AbortRequest => return Err(err),
                FailurePolicy::SkipDay => {
                    warn!(%day, error = %err, "skipping day");
                    continue;
                }
            },
        };

        let before = slots.len();
        slots.extend(
            free_spans(busy, &window)
                .iter()
                .filter(|span| span.duration() >= request.duration)
                .map(AvailabilitySlot::from_interval),
        );
        debug!(%day, slots = slots.len() - before, "computed day");
    }

    Ok(slots)
}

/// The working window of `day`, localized to the configured timezone.
///
/// # Errors
/// Returns `DispoError::Computation` if a window bound does not exist on that
/// day (DST gap under [`dst::DstPolicy::Skip`]).
pub fn day_window(
    day: NaiveDate,
    window: &WorkWindow,
    config: &AvailabilityConfig,
) -> Result<TimeInterval> {
    let localize = |time| {
        dst::localize(config.timezone, day.and_time(time), config.dst_policy).ok_or_else(|| {
            DispoError::Computation(format!(
                "{} on {} does not exist in {}",
                time,
                day,
                config.timezone.name()
            ))
        })
    };
    let start = localize(window.start())?;
    let end = localize(window.end())?;
    Ok(TimeInterval::clamped(start, end))
}

/// Free spans of `window` given a sorted, disjoint busy set.
///
/// Busy intervals that merely touch the window bounds leave it untouched.
/// With no busy span inside the window, the whole window is free.
pub fn free_spans(busy: &[TimeInterval], window: &TimeInterval) -> Vec<TimeInterval> {
    // Busy ends are sorted too, so skip everything ending at or before the window.
    let first = busy.partition_point(|iv| iv.end() <= window.start());

    let mut free = Vec::new();
    let mut cursor = window.start();

    for occupied in busy[first..]
        .iter()
        .take_while(|iv| iv.start() < window.end())
        .filter_map(|iv| iv.clip_to(window))
    {
        if cursor < occupied.start() {
            free.extend(TimeInterval::new(cursor, occupied.start()));
        }
        cursor = cursor.max(occupied.end());
    }

    // Trailing free span after the last busy period.
    if cursor < window.end() {
        free.extend(TimeInterval::new(cursor, window.end()));
    }

    free
}
