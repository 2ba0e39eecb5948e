//! # dispo-engine
//!
//! Meeting availability computation for an automated scheduling assistant.
//!
//! Given calendar events and a request (date range, daily working window,
//! minimum duration, excluded days), the engine answers "which windows are
//! free?". It is pure: no I/O, no global state, and the target timezone is an
//! explicit [`AvailabilityConfig`] value.
//!
//! ## Pipeline
//!
//! 1. [`event`] — events with date-only, naive or offset-aware markers
//! 2. [`recurrence`] — RRULE expansion over the requested range
//! 3. [`normalize`] — one `[start, end)` interval per event, in the target zone
//! 4. [`merge`] — sorted, disjoint busy set
//! 5. [`availability`] — per-day clipping to the working window, gaps, duration filter
//! 6. [`format`] — reply text
//!
//! [`payload`] parses the JSON request record into an [`AvailabilityRequest`].
//!
//! ## Example
//!
//! ```rust
//! use dispo_engine::{answer_request, parse_events_json, parse_request};
//! use dispo_engine::{AvailabilityConfig, ResponseFormat};
//!
//! let request = parse_request(
//!     r#"{"date":"2026-03-02","date_1":"2026-03-02","duree":"1"}"#,
//! ).unwrap();
//! let events = parse_events_json(
//!     r#"[{"start":"2026-03-02T10:00:00","end":"2026-03-02T11:00:00","subject":"Standup"}]"#,
//! ).unwrap();
//! let config = AvailabilityConfig::for_timezone("Europe/Paris").unwrap();
//!
//! let reply = answer_request(&events, &request, &config, &ResponseFormat::default()).unwrap();
//! assert_eq!(reply.lines().count(), 3);
//! assert!(reply.contains("lundi 02/03/2026 de 09:00 à 10:00"));
//! assert!(reply.contains("lundi 02/03/2026 de 11:00 à 18:00"));
//! ```

pub mod availability;
pub mod dst;
pub mod error;
pub mod event;
pub mod format;
pub mod interval;
pub mod merge;
pub mod normalize;
pub mod payload;
pub mod recurrence;
pub mod request;

use tracing::warn;

pub use availability::{find_availability, AvailabilitySlot};
pub use dst::DstPolicy;
pub use error::DispoError;
pub use event::{parse_events_json, CalendarEvent, EventTime};
pub use format::{Locale, ResponseFormat};
pub use interval::TimeInterval;
pub use merge::merge_intervals;
pub use payload::{parse_request, RequestPayload};
pub use request::{AvailabilityConfig, AvailabilityRequest, FailurePolicy, WorkWindow};

/// Compute availability and render the reply for one request.
///
/// Invalid request parameters are returned as errors before any computation.
/// A failure during the computation itself is reported inside the reply text
/// instead, so the caller can always deliver an answer.
pub fn answer_request(
    events: &[CalendarEvent],
    request: &AvailabilityRequest,
    config: &AvailabilityConfig,
    format: &ResponseFormat,
) -> error::Result<String> {
    request.validate()?;
    match find_availability(events, request, config) {
        Ok(slots) => Ok(format.render(request, &slots)),
        Err(err) => {
            warn!(error = %err, "availability computation failed");
            Ok(format.render_error(&err))
        }
    }
}
