//! iCalendar (`.ics`) calendar files.
//!
//! Parsing is done by the `icalendar` crate; this module maps each VEVENT
//! onto a [`CalendarEvent`]. Zoned DTSTART/DTEND become offset-aware
//! markers, floating ones stay naive, `VALUE=DATE` ones make all-day events.
//! RRULE and EXDATE carry over as a [`Recurrence`] whose exdates are wall
//! times in the target zone.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use dispo_engine::dst::{localize, DstPolicy};
use dispo_engine::event::{Recurrence, UNTITLED};
use dispo_engine::{CalendarEvent, EventTime};
use icalendar::{
    Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, Event, EventLike,
};
use tracing::debug;

use crate::source::{read_calendar_file, EventSource, SourceError};

const ICAL_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Events stored in an iCalendar file. A file may hold several VCALENDAR blocks.
#[derive(Debug, Clone)]
pub struct IcsFileSource {
    path: PathBuf,
}

impl IcsFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EventSource for IcsFileSource {
    fn fetch_events(
        &self,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> Result<Vec<CalendarEvent>, SourceError> {
        debug!(path = %self.path.display(), %start, %end, "reading iCalendar file");
        let text = read_calendar_file(&self.path)?;
        parse_ics(&text, start.timezone())
            .map_err(|e| SourceError::Permanent(format!("{}: {}", self.path.display(), e)))
    }
}

/// Parse every VEVENT of `text`. `tz` is the zone floating times and
/// exdates are expressed in.
///
/// Events without a DTSTART, cancelled events and transparent (free) events
/// are left out.
pub fn parse_ics(text: &str, tz: Tz) -> Result<Vec<CalendarEvent>, String> {
    let mut events = Vec::new();
    for block in calendar_blocks(text) {
        let calendar: Calendar = block.parse()?;
        for component in &calendar.components {
            if let CalendarComponent::Event(event) = component {
                match to_calendar_event(event, tz) {
                    Some(event) => events.push(event),
                    None => debug!(uid = ?event.property_value("UID"), "skipping VEVENT"),
                }
            }
        }
    }
    Ok(events)
}

/// Split on `BEGIN:VCALENDAR` so concatenated calendars all get read.
fn calendar_blocks(text: &str) -> Vec<&str> {
    let starts: Vec<usize> = text.match_indices("BEGIN:VCALENDAR").map(|(i, _)| i).collect();
    if starts.is_empty() {
        return vec![text];
    }
    starts
        .iter()
        .enumerate()
        .map(|(n, &from)| {
            let to = starts.get(n + 1).copied().unwrap_or(text.len());
            &text[from..to]
        })
        .collect()
}

fn to_calendar_event(event: &Event, tz: Tz) -> Option<CalendarEvent> {
    let status = event.property_value("STATUS").unwrap_or_default();
    let transparency = event.property_value("TRANSP").unwrap_or_default();
    if status.eq_ignore_ascii_case("CANCELLED") || transparency.eq_ignore_ascii_case("TRANSPARENT")
    {
        return None;
    }

    let raw_start = event.get_start()?;
    let is_all_day = matches!(raw_start, DatePerhapsTime::Date(_));
    let source_zone = zone_of(&raw_start);
    let start = marker(raw_start, tz)?;
    let end = match event.get_end() {
        Some(end) => marker(end, tz)?,
        None => start,
    };

    let recurrence = event.property_value("RRULE").map(|rule| Recurrence {
        rule: rule.to_string(),
        exdates: event
            .property_value("EXDATE")
            .map(|list| exdates(list, source_zone, tz, wall_time(&start, tz)))
            .unwrap_or_default(),
    });

    Some(CalendarEvent {
        start,
        end,
        is_all_day,
        label: event.get_summary().unwrap_or(UNTITLED).to_string(),
        recurrence,
    })
}

fn marker(value: DatePerhapsTime, tz: Tz) -> Option<EventTime> {
    match value {
        DatePerhapsTime::Date(day) => Some(EventTime::Date(day)),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(local)) => {
            Some(EventTime::Naive(local))
        }
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(utc)) => {
            Some(EventTime::Aware(utc.fixed_offset()))
        }
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            match tzid.parse::<Tz>() {
                Ok(zone) => localize(zone, date_time, DstPolicy::ShiftForward)
                    .map(|dt| EventTime::Aware(dt.fixed_offset())),
                // Unknown TZID (e.g. a Windows zone name): read as target-zone time.
                Err(_) => {
                    debug!(%tzid, target = tz.name(), "unknown TZID");
                    Some(EventTime::Naive(date_time))
                }
            }
        }
    }
}

fn zone_of(value: &DatePerhapsTime) -> Option<Tz> {
    match value {
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { tzid, .. }) => tzid.parse().ok(),
        _ => None,
    }
}

/// Time of day of a marker in the target zone.
fn wall_time(marker: &EventTime, tz: Tz) -> NaiveTime {
    match marker {
        EventTime::Date(_) => NaiveTime::MIN,
        EventTime::Naive(local) => local.time(),
        EventTime::Aware(dt) => dt.with_timezone(&tz).time(),
    }
}

/// EXDATE values (comma separated) as target-zone wall times.
///
/// `Z` values are UTC; other values are in the DTSTART zone (`source_zone`),
/// or already target-zone time when DTSTART is floating. Date-only values
/// take the series' time of day.
fn exdates(list: &str, source_zone: Option<Tz>, tz: Tz, time_of_day: NaiveTime) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .filter_map(|value| {
            let local = if let Some(utc) = value.strip_suffix('Z') {
                let utc = NaiveDateTime::parse_from_str(utc, ICAL_FORMAT).ok()?;
                utc.and_utc().with_timezone(&tz).naive_local()
            } else if let Ok(day) = NaiveDate::parse_from_str(value, "%Y%m%d") {
                day.and_time(time_of_day)
            } else {
                let local = NaiveDateTime::parse_from_str(value, ICAL_FORMAT).ok()?;
                match source_zone {
                    Some(zone) => localize(zone, local, DstPolicy::ShiftForward)?
                        .with_timezone(&tz)
                        .naive_local(),
                    None => local,
                }
            };
            Some(local.format(ICAL_FORMAT).to_string())
        })
        .collect()
}
