//! Calendar event sources and the retry wrapper around them.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use dispo_engine::dst::{localize, DstPolicy};
use dispo_engine::{parse_events_json, AvailabilityRequest, CalendarEvent};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::config::RetryConfig;
use crate::ics::IcsFileSource;

#[derive(Error, Debug)]
pub enum SourceError {
    /// Worth retrying: the source may answer on a later attempt.
    #[error("Transient source error: {0}")]
    Transient(String),

    #[error("Source error: {0}")]
    Permanent(String),
}

impl SourceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Transient(_))
    }
}

/// Anything that can list the calendar events of a period.
pub trait EventSource {
    fn fetch_events(
        &self,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> Result<Vec<CalendarEvent>, SourceError>;
}

/// The period to ask a source for: local midnight of the first searched day
/// to local midnight after the last one.
pub fn fetch_period(request: &AvailabilityRequest, tz: Tz) -> (DateTime<Tz>, DateTime<Tz>) {
    let end_day = request
        .range_end
        .checked_add_days(Days::new(1))
        .unwrap_or(request.range_end);
    (midnight(request.range_start, tz), midnight(end_day, tz))
}

fn midnight(day: NaiveDate, tz: Tz) -> DateTime<Tz> {
    let local = day.and_time(NaiveTime::MIN);
    localize(tz, local, DstPolicy::ShiftForward).unwrap_or_else(|| tz.from_utc_datetime(&local))
}

/// Read a calendar file, classifying I/O failures.
pub(crate) fn read_calendar_file(path: &Path) -> Result<String, SourceError> {
    std::fs::read_to_string(path).map_err(|e| {
        let message = format!("{}: {}", path.display(), e);
        match e.kind() {
            ErrorKind::NotFound | ErrorKind::PermissionDenied | ErrorKind::InvalidData => {
                SourceError::Permanent(message)
            }
            _ => SourceError::Transient(message),
        }
    })
}

/// Events stored as a JSON array in a file.
///
/// The whole file is returned; the engine clips events to the request range.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EventSource for JsonFileSource {
    fn fetch_events(
        &self,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> Result<Vec<CalendarEvent>, SourceError> {
        debug!(path = %self.path.display(), %start, %end, "reading calendar file");
        let json = read_calendar_file(&self.path)?;
        parse_events_json(&json)
            .map_err(|e| SourceError::Permanent(format!("{}: {}", self.path.display(), e)))
    }
}

/// A calendar file, read as iCalendar or JSON depending on its extension.
#[derive(Debug, Clone)]
pub enum CalendarFile {
    Ics(IcsFileSource),
    Json(JsonFileSource),
}

impl CalendarFile {
    /// `.ics` and `.ical` files are iCalendar; anything else is JSON.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let is_ics = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ics") || ext.eq_ignore_ascii_case("ical"));
        if is_ics {
            CalendarFile::Ics(IcsFileSource::new(path))
        } else {
            CalendarFile::Json(JsonFileSource::new(path))
        }
    }
}

impl EventSource for CalendarFile {
    fn fetch_events(
        &self,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> Result<Vec<CalendarEvent>, SourceError> {
        match self {
            CalendarFile::Ics(source) => source.fetch_events(start, end),
            CalendarFile::Json(source) => source.fetch_events(start, end),
        }
    }
}

/// Retries transient failures of the wrapped source with exponential backoff.
#[derive(Debug, Clone)]
pub struct Retrying<S> {
    inner: S,
    max_attempts: u32,
    initial_delay: Duration,
}

impl<S: EventSource> Retrying<S> {
    pub fn new(inner: S, config: &RetryConfig) -> Self {
        Self {
            inner,
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
        }
    }
}

impl<S: EventSource> EventSource for Retrying<S> {
    fn fetch_events(
        &self,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
    ) -> Result<Vec<CalendarEvent>, SourceError> {
        let mut attempt = 1;
        loop {
            match self.inner.fetch_events(start, end) {
                Ok(events) => return Ok(events),
                Err(e) if e.is_transient() && attempt < self.max_attempts => {
                    let delay = self
                        .initial_delay
                        .saturating_mul(2u32.saturating_pow(attempt - 1));
                    warn!(attempt, ?delay, "event source failed, retrying: {}", e);
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_transient() {
                        error!(attempts = attempt, "giving up on event source: {}", e);
                    }
                    return Err(e);
                }
            }
        }
    }
}
