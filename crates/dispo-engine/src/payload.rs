//! Request payload parsing and validation.
//!
//! A payload is the JSON object dropped by the requesting workflow. Field
//! names are fixed by that workflow (`date`, `date_1`, `duree`, ...). Scalar
//! fields may arrive as strings, numbers or booleans, so every field goes
//! through [`Scalar`] before being interpreted.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::Deserialize;

use crate::error::{DispoError, Result};
use crate::request::{AvailabilityRequest, WorkWindow};

const DEFAULT_DAY_START: &str = "09:00";
const DEFAULT_DAY_END: &str = "18:00";

/// A JSON scalar as the requesting workflow may encode it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Number(f64),
    Flag(bool),
}

impl Scalar {
    fn to_text(&self) -> String {
        match self {
            Scalar::Text(s) => s.trim().to_string(),
            Scalar::Number(n) => n.to_string(),
            Scalar::Flag(b) => b.to_string(),
        }
    }
}

/// The raw request record. Unknown fields are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestPayload {
    pub date: Scalar,
    pub date_1: Scalar,
    pub duree: Scalar,
    #[serde(rename = "heureDebutTravail", default)]
    pub heure_debut_travail: Option<Scalar>,
    #[serde(rename = "heureFinTravail", default)]
    pub heure_fin_travail: Option<Scalar>,
    #[serde(default)]
    pub weekend: Option<Scalar>,
    #[serde(rename = "excludedDates", default)]
    pub excluded_dates: Option<Scalar>,
    #[serde(rename = "includeAllDayEvents", default)]
    pub include_all_day_events: Option<Scalar>,
}

impl RequestPayload {
    /// Parse a payload from JSON text without interpreting its fields.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Interpret and validate every field.
    ///
    /// Errors name the offending payload field.
    pub fn into_request(self) -> Result<AvailabilityRequest> {
        let range_start = parse_iso_date("date", &self.date)?;
        let range_end = parse_iso_date("date_1", &self.date_1)?;
        let duration = parse_duration_hours("duree", &self.duree)?;

        let start = parse_clock_time(
            "heureDebutTravail",
            self.heure_debut_travail.as_ref(),
            DEFAULT_DAY_START,
        )?;
        let end = parse_clock_time(
            "heureFinTravail",
            self.heure_fin_travail.as_ref(),
            DEFAULT_DAY_END,
        )?;
        let window = WorkWindow::new(start, end).ok_or_else(|| {
            DispoError::field(
                "heureFinTravail",
                format!(
                    "working day must end after it starts ({} - {})",
                    start.format("%H:%M"),
                    end.format("%H:%M")
                ),
            )
        })?;

        let request = AvailabilityRequest {
            range_start,
            range_end,
            duration,
            window,
            allow_weekends: parse_flag("weekend", self.weekend.as_ref())?,
            excluded_dates: parse_excluded_dates("excludedDates", self.excluded_dates.as_ref())?,
            include_all_day_events: parse_flag(
                "includeAllDayEvents",
                self.include_all_day_events.as_ref(),
            )?,
        };
        request.validate()?;
        Ok(request)
    }
}

/// Parse a JSON payload straight into a validated request.
pub fn parse_request(json: &str) -> Result<AvailabilityRequest> {
    RequestPayload::from_json(json)?.into_request()
}

fn parse_iso_date(field: &str, value: &Scalar) -> Result<NaiveDate> {
    let text = value.to_text();
    NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .map_err(|_| DispoError::field(field, format!("expected YYYY-MM-DD, got {:?}", text)))
}

/// Decimal hours; both `1.5` and `1,5` are accepted.
fn parse_duration_hours(field: &str, value: &Scalar) -> Result<Duration> {
    let text = value.to_text();
    let hours: f64 = text
        .replace(',', ".")
        .parse()
        .map_err(|_| DispoError::field(field, format!("expected a number of hours, got {:?}", text)))?;
    if !hours.is_finite() || hours <= 0.0 {
        return Err(DispoError::field(
            field,
            format!("duration must be a positive number of hours, got {:?}", text),
        ));
    }
    // Whole seconds are plenty of resolution for meeting lengths.
    let seconds = (hours * 3600.0).round();
    if seconds < 1.0 || seconds > (i64::MAX / 1000) as f64 {
        return Err(DispoError::field(field, format!("duration out of range: {:?}", text)));
    }
    Ok(Duration::seconds(seconds as i64))
}

/// `HH`, `HH:MM` or `HHhMM`. Missing or blank values fall back to `default`.
fn parse_clock_time(field: &str, value: Option<&Scalar>, default: &str) -> Result<NaiveTime> {
    let text = value.map(Scalar::to_text).unwrap_or_default();
    let text = if text.is_empty() { default.to_string() } else { text };

    let invalid = || DispoError::field(field, format!("expected HH or HH:MM, got {:?}", text));

    let mut parts = text.splitn(2, [':', 'h', 'H']);
    let hours: u32 = parts
        .next()
        .and_then(|h| h.trim().parse().ok())
        .ok_or_else(invalid)?;
    let minutes: u32 = match parts.next().map(str::trim) {
        None | Some("") => 0,
        Some(m) => m.parse().map_err(|_| invalid())?,
    };
    NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(invalid)
}

fn parse_flag(field: &str, value: Option<&Scalar>) -> Result<bool> {
    let Some(value) = value else {
        return Ok(false);
    };
    if let Scalar::Flag(b) = value {
        return Ok(*b);
    }
    let text = value.to_text().to_lowercase();
    match text.as_str() {
        "" | "false" | "0" | "non" | "no" => Ok(false),
        "true" | "1" | "oui" | "yes" => Ok(true),
        _ => Err(DispoError::field(
            field,
            format!("expected a boolean, got {:?}", text),
        )),
    }
}

/// Comma-separated `DD-MM-YYYY` dates.
fn parse_excluded_dates(field: &str, value: Option<&Scalar>) -> Result<BTreeSet<NaiveDate>> {
    let text = value.map(Scalar::to_text).unwrap_or_default();
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            NaiveDate::parse_from_str(s, "%d-%m-%Y")
                .map_err(|_| DispoError::field(field, format!("expected DD-MM-YYYY, got {:?}", s)))
        })
        .collect()
}
