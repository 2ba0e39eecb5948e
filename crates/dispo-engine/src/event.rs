//! Calendar events as supplied by an event source.
//!
//! Event markers come in three shapes: date-only (all-day entries), naive
//! wall-clock datetimes, and offset-aware datetimes. They are kept as a
//! tagged [`EventTime`] until normalization resolves them into one zone.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::debug;

use crate::error::{DispoError, Result};

/// Label used for events that carry no subject.
pub const UNTITLED: &str = "Sans titre";

/// A start or end marker of a calendar event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTime {
    /// Date-only marker.
    Date(NaiveDate),
    /// Wall-clock time with no zone attached; read as target-zone local time.
    Naive(NaiveDateTime),
    /// Instant with an explicit UTC offset.
    Aware(DateTime<FixedOffset>),
}

impl EventTime {
    /// Classify a marker string. Returns `None` for unrecognized shapes.
    ///
    /// Accepted: `2026-03-02`, `2026-03-02T10:00`, `2026-03-02T10:00:00`
    /// (space separator also accepted), and RFC 3339 with `Z` or an offset.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(EventTime::Aware(dt));
        }
        for fmt in [
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M:%S%.f",
            "%Y-%m-%d %H:%M",
        ] {
            if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(EventTime::Naive(ndt));
            }
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .map(EventTime::Date)
    }

    /// The calendar date of the marker, as written (no zone conversion).
    pub fn date(&self) -> NaiveDate {
        match self {
            EventTime::Date(d) => *d,
            EventTime::Naive(ndt) => ndt.date(),
            EventTime::Aware(dt) => dt.date_naive(),
        }
    }

    pub fn is_date_only(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }
}

/// Recurrence attached to an event: an RFC 5545 RRULE plus excluded occurrences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recurrence {
    pub rule: String,
    /// Local datetimes (`YYYY-MM-DDTHH:MM:SS`) of occurrences to drop.
    pub exdates: Vec<String>,
}

/// A single calendar entry. Read-only input to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub start: EventTime,
    pub end: EventTime,
    pub is_all_day: bool,
    pub label: String,
    pub recurrence: Option<Recurrence>,
}

impl CalendarEvent {
    /// A one-off timed or all-day event.
    pub fn new(start: EventTime, end: EventTime, is_all_day: bool, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            is_all_day,
            label: label.into(),
            recurrence: None,
        }
    }
}

/// Wire shape of one event in an events JSON document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventInput {
    start: String,
    end: String,
    #[serde(default)]
    is_all_day: bool,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    rrule: Option<String>,
    #[serde(default)]
    exdates: Vec<String>,
}

impl EventInput {
    fn into_event(self) -> Option<CalendarEvent> {
        let start = EventTime::parse(&self.start)?;
        let end = EventTime::parse(&self.end)?;
        let recurrence = self
            .rrule
            .filter(|r| !r.trim().is_empty())
            .map(|rule| Recurrence {
                rule,
                exdates: self.exdates,
            });
        Some(CalendarEvent {
            start,
            end,
            is_all_day: self.is_all_day,
            label: self.subject.unwrap_or_else(|| UNTITLED.to_string()),
            recurrence,
        })
    }
}

/// Parse a JSON array of events.
///
/// The document itself must be a JSON array; individual entries that do not
/// have a recognizable shape are dropped rather than failing the batch.
pub fn parse_events_json(json: &str) -> Result<Vec<CalendarEvent>> {
    let values: Vec<serde_json::Value> =
        serde_json::from_str(json).map_err(|e| DispoError::InvalidEvents(e.to_string()))?;
    let total = values.len();

    let events: Vec<CalendarEvent> = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| {
            let parsed = serde_json::from_value::<EventInput>(value)
                .ok()
                .and_then(EventInput::into_event);
            if parsed.is_none() {
                debug!(index, "dropping malformed calendar event");
            }
            parsed
        })
        .collect();

    debug!(total, kept = events.len(), "parsed calendar events");
    Ok(events)
}
