//! Convert calendar events into busy intervals in the target timezone.
//!
//! Each event yields at most one interval. Anything that cannot be resolved
//! (date-only markers on a timed event, end before start, a recurrence rule
//! that does not parse) is dropped so one bad entry never sinks the batch.

use chrono::{DateTime, Days, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use tracing::debug;

use crate::dst::{self, DstPolicy};
use crate::event::{CalendarEvent, EventTime};
use crate::interval::TimeInterval;
use crate::merge::merge_intervals;
use crate::recurrence;
use crate::request::{AvailabilityConfig, AvailabilityRequest};

/// Normalize one event into a `[start, end)` interval.
///
/// All-day events produce `None` when `include_all_day` is false. Naive
/// markers are read as local time in `tz`; aware markers are converted.
pub fn normalize_event(
    event: &CalendarEvent,
    tz: Tz,
    dst_policy: DstPolicy,
    include_all_day: bool,
) -> Option<TimeInterval> {
    if event.is_all_day {
        if !include_all_day {
            return None;
        }
        return all_day_interval(event.start.date(), event.end.date(), tz, dst_policy);
    }

    let start = resolve_instant(&event.start, tz, dst_policy)?;
    let end = resolve_instant(&event.end, tz, dst_policy)?;
    TimeInterval::new(start, end)
}

/// Local midnight of `start` up to local midnight of the exclusive end date.
/// An end date that is not after the start date covers the start date only.
fn all_day_interval(
    start: NaiveDate,
    end: NaiveDate,
    tz: Tz,
    dst_policy: DstPolicy,
) -> Option<TimeInterval> {
    let end = if end > start {
        end
    } else {
        start.checked_add_days(Days::new(1))?
    };
    let from = dst::localize(tz, start.and_time(NaiveTime::MIN), dst_policy)?;
    let to = dst::localize(tz, end.and_time(NaiveTime::MIN), dst_policy)?;
    TimeInterval::new(from, to)
}

fn resolve_instant(marker: &EventTime, tz: Tz, dst_policy: DstPolicy) -> Option<DateTime<Tz>> {
    match marker {
        EventTime::Date(_) => None,
        EventTime::Naive(ndt) => dst::localize(tz, *ndt, dst_policy),
        EventTime::Aware(dt) => Some(dt.with_timezone(&tz)),
    }
}

/// Build the merged busy set for a request.
///
/// Recurring events are expanded over the request range first; the
/// resulting intervals are merged into an ordered, disjoint list.
pub fn busy_intervals(
    events: &[CalendarEvent],
    request: &AvailabilityRequest,
    config: &AvailabilityConfig,
) -> Vec<TimeInterval> {
    let mut intervals = Vec::with_capacity(events.len());

    for event in events {
        let occurrences = match recurrence::expand_event(
            event,
            config.timezone,
            request.range_start,
            request.range_end,
        ) {
            Ok(occurrences) => occurrences,
            Err(err) => {
                debug!(label = %event.label, error = %err, "dropping event with invalid recurrence");
                continue;
            }
        };

        for occurrence in &occurrences {
            match normalize_event(
                occurrence,
                config.timezone,
                config.dst_policy,
                request.include_all_day_events,
            ) {
                Some(interval) => intervals.push(interval),
                None if occurrence.is_all_day && !request.include_all_day_events => {}
                None => debug!(label = %occurrence.label, "dropping malformed event"),
            }
        }
    }

    merge_intervals(intervals)
}
