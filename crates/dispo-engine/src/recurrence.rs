//! Recurring event expansion.
//!
//! Wraps the `rrule` crate to turn an event carrying an RFC 5545 RRULE into
//! the concrete occurrences that fall inside a request's date range. Rules
//! are evaluated in the target timezone so occurrences keep their local
//! wall-clock time across DST transitions.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use rrule::RRuleSet;

use crate::dst::{self, DstPolicy};
use crate::error::{DispoError, Result};
use crate::event::{CalendarEvent, EventTime, Recurrence};

/// Upper bound on instances pulled from one rule inside the requested range.
const MAX_INSTANCES: u16 = 10_000;

/// Expand a recurring event into one-off occurrences starting on or before
/// `range_end` and ending on or after `range_start`.
///
/// Events without a recurrence are returned unchanged. Occurrences keep the
/// shape of the original markers: all-day events stay date-only, timed
/// events become naive local times in `tz`.
///
/// # Errors
/// Returns `DispoError::InvalidRule` if the rule cannot be parsed.
pub fn expand_event(
    event: &CalendarEvent,
    tz: Tz,
    range_start: NaiveDate,
    range_end: NaiveDate,
) -> Result<Vec<CalendarEvent>> {
    let Some(recurrence) = &event.recurrence else {
        return Ok(vec![event.clone()]);
    };

    let local_start = local_wall_time(&event.start, tz);
    let local_end = local_wall_time(&event.end, tz);
    let length = (local_end - local_start).max(Duration::zero());

    if local_start.date() > range_end {
        return Ok(Vec::new());
    }

    let first_day = range_start.pred_opt().unwrap_or(range_start);
    let starts = expand_starts(recurrence, local_start, tz, first_day, range_end, length)?;

    let occurrences = starts
        .into_iter()
        .filter(|start| (*start + length).date() >= first_day)
        .map(|start| {
            let end = start + length;
            let (start, end) = if event.is_all_day {
                (EventTime::Date(start.date()), EventTime::Date(end.date()))
            } else {
                (EventTime::Naive(start), EventTime::Naive(end))
            };
            CalendarEvent {
                start,
                end,
                is_all_day: event.is_all_day,
                label: event.label.clone(),
                recurrence: None,
            }
        })
        .collect();

    Ok(occurrences)
}

/// The marker as wall-clock time in `tz`.
fn local_wall_time(marker: &EventTime, tz: Tz) -> NaiveDateTime {
    match marker {
        EventTime::Date(d) => d.and_time(NaiveTime::MIN),
        EventTime::Naive(ndt) => *ndt,
        EventTime::Aware(dt) => dt.with_timezone(&tz).naive_local(),
    }
}

/// Local start times of the instances that can touch `first_day..=range_end`.
///
/// The set is bounded on both sides before expansion, so the instance cap
/// counts from the range rather than from DTSTART.
fn expand_starts(
    recurrence: &Recurrence,
    dtstart: NaiveDateTime,
    tz: Tz,
    first_day: NaiveDate,
    range_end: NaiveDate,
    length: Duration,
) -> Result<Vec<NaiveDateTime>> {
    let rule = recurrence.rule.trim().trim_start_matches("RRULE:");
    if rule.is_empty() {
        return Err(DispoError::InvalidRule("empty RRULE string".to_string()));
    }

    let timezone = tz.name();
    let mut rule_str = anchor_until(rule, tz);
    let last = range_end.and_time(NaiveTime::MIN) + Duration::days(1);

    // Bound the expansion at the end of the requested range. With a TZID on
    // DTSTART, UNTIL has to be given in UTC.
    let upper = rule_str.to_uppercase();
    if !upper.contains("UNTIL=") && !upper.contains("COUNT=") {
        let until = utc_wall_time(tz, last).unwrap_or(last);
        rule_str = format!("{};UNTIL={}Z", rule_str, until.format("%Y%m%dT%H%M%S"));
    }

    let mut rrule_text = format!(
        "DTSTART;TZID={}:{}\nRRULE:{}",
        timezone,
        dtstart.format("%Y%m%dT%H%M%S"),
        rule_str
    );

    if !recurrence.exdates.is_empty() {
        let exdates: Vec<String> = recurrence
            .exdates
            .iter()
            .map(|d| d.replace(['-', ':'], ""))
            .collect();
        rrule_text.push_str(&format!("\nEXDATE;TZID={}:{}", timezone, exdates.join(",")));
    }

    let rrule_set: RRuleSet = rrule_text
        .parse()
        .map_err(|e| DispoError::InvalidRule(format!("{}", e)))?;

    let window_start = first_day.and_time(NaiveTime::MIN) - length;
    let bounds = rrule::Tz::Tz(tz);
    let (Some(after), Some(before)) = (
        dst::localize(tz, window_start, DstPolicy::ShiftForward),
        dst::localize(tz, last, DstPolicy::ShiftForward),
    ) else {
        return Err(DispoError::InvalidRule(format!(
            "cannot bound expansion to {}..{} in {}",
            first_day, range_end, timezone
        )));
    };

    let starts = rrule_set
        .after(after.with_timezone(&bounds))
        .before(before.with_timezone(&bounds))
        .all(MAX_INSTANCES)
        .dates
        .into_iter()
        .map(|dt| dt.with_timezone(&tz).naive_local())
        .take_while(|start| *start < last)
        .collect();

    Ok(starts)
}

/// Rewrite a floating `UNTIL` (no trailing `Z`) as UTC, reading it as
/// wall-clock time in `tz`. A date-only `UNTIL` covers that whole day.
fn anchor_until(rule: &str, tz: Tz) -> String {
    rule.split(';')
        .map(|part| match part.split_once('=') {
            Some((key, value))
                if key.trim().eq_ignore_ascii_case("UNTIL")
                    && !value.trim().to_uppercase().ends_with('Z') =>
            {
                floating_until(value.trim(), tz)
                    .map(|utc| format!("UNTIL={}Z", utc.format("%Y%m%dT%H%M%S")))
                    .unwrap_or_else(|| part.to_string())
            }
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn floating_until(value: &str, tz: Tz) -> Option<NaiveDateTime> {
    let local = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y%m%d")
                .ok()
                .and_then(|day| day.and_hms_opt(23, 59, 59))
        })?;
    utc_wall_time(tz, local)
}

/// The UTC wall-clock time of local `local` in `tz`.
fn utc_wall_time(tz: Tz, local: NaiveDateTime) -> Option<NaiveDateTime> {
    dst::localize(tz, local, DstPolicy::ShiftForward).map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floating_until_becomes_utc() {
        let paris = chrono_tz::Europe::Paris;
        assert_eq!(
            anchor_until("FREQ=DAILY;UNTIL=20261231T235959", paris),
            "FREQ=DAILY;UNTIL=20261231T225959Z"
        );
        // Summer time: UTC+2.
        assert_eq!(
            anchor_until("FREQ=WEEKLY;UNTIL=20260701", paris),
            "FREQ=WEEKLY;UNTIL=20260701T215959Z"
        );
    }

    #[test]
    fn utc_until_is_left_alone() {
        let rule = "FREQ=DAILY;UNTIL=20261231T235959Z;BYDAY=MO";
        assert_eq!(anchor_until(rule, chrono_tz::Europe::Paris), rule);
    }
}
