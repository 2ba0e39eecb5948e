//! Render slots into the human-readable reply.
//!
//! The reply is one confirmation line restating the search (range, duration,
//! working hours), then one line per slot in chronological order.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::availability::AvailabilitySlot;
use crate::request::AvailabilityRequest;

/// Language of the rendered reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "en")]
    English,
}

/// How replies are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFormat {
    pub locale: Locale,
    /// Joins the reply lines; `"\n"` for text files, `"<br>"` for HTML mail bodies.
    pub separator: String,
}

impl Default for ResponseFormat {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            separator: "\n".to_string(),
        }
    }
}

impl ResponseFormat {
    /// The full reply for a successful search. Zero slots yields only the
    /// confirmation line.
    pub fn render(&self, request: &AvailabilityRequest, slots: &[AvailabilitySlot]) -> String {
        let mut lines = Vec::with_capacity(slots.len() + 1);
        lines.push(self.confirmation_line(request));
        lines.extend(slots.iter().map(|slot| self.slot_line(slot)));
        lines.join(&self.separator)
    }

    /// A single-line reply reporting a failure.
    pub fn render_error(&self, error: &dyn std::fmt::Display) -> String {
        match self.locale {
            Locale::French => format!("Erreur lors de la recherche des disponibilités : {}", error),
            Locale::English => format!("Error while searching for availability: {}", error),
        }
    }

    /// A single-line reply rejecting an invalid request.
    pub fn render_rejection(&self, error: &dyn std::fmt::Display) -> String {
        match self.locale {
            Locale::French => format!("Demande invalide : {}", error),
            Locale::English => format!("Invalid request: {}", error),
        }
    }

    pub fn confirmation_line(&self, request: &AvailabilityRequest) -> String {
        let from = request.window.start().format("%H:%M");
        let to = request.window.end().format("%H:%M");
        let duration = format_duration(request.duration);
        match self.locale {
            Locale::French => format!(
                "Recherche du {} au {}, durée {}, horaire {} - {} : voici mes disponibilités",
                self.date(request.range_start),
                self.date(request.range_end),
                duration,
                from,
                to
            ),
            Locale::English => format!(
                "Search from {} to {}, duration {}, working hours {} - {}: here are my available slots",
                self.date(request.range_start),
                self.date(request.range_end),
                duration,
                from,
                to
            ),
        }
    }

    pub fn slot_line(&self, slot: &AvailabilitySlot) -> String {
        let day = slot.date();
        let start = slot.start.format("%H:%M");
        let end = slot.end.format("%H:%M");
        match self.locale {
            Locale::French => format!(
                "{} {} de {} à {}",
                weekday_name(day.weekday(), self.locale),
                self.date(day),
                start,
                end
            ),
            Locale::English => format!(
                "{} {} from {} to {}",
                weekday_name(day.weekday(), self.locale),
                self.date(day),
                start,
                end
            ),
        }
    }

    fn date(&self, day: NaiveDate) -> String {
        match self.locale {
            Locale::French => day.format("%d/%m/%Y").to_string(),
            Locale::English => day.format("%Y-%m-%d").to_string(),
        }
    }
}

fn weekday_name(day: Weekday, locale: Locale) -> &'static str {
    match locale {
        Locale::French => match day {
            Weekday::Mon => "lundi",
            Weekday::Tue => "mardi",
            Weekday::Wed => "mercredi",
            Weekday::Thu => "jeudi",
            Weekday::Fri => "vendredi",
            Weekday::Sat => "samedi",
            Weekday::Sun => "dimanche",
        },
        Locale::English => match day {
            Weekday::Mon => "Monday",
            Weekday::Tue => "Tuesday",
            Weekday::Wed => "Wednesday",
            Weekday::Thu => "Thursday",
            Weekday::Fri => "Friday",
            Weekday::Sat => "Saturday",
            Weekday::Sun => "Sunday",
        },
    }
}

/// `1 h`, `1 h 30`, `45 min`.
fn format_duration(duration: Duration) -> String {
    let minutes = duration.num_minutes();
    match (minutes / 60, minutes % 60) {
        (0, m) => format!("{} min", m),
        (h, 0) => format!("{} h", h),
        (h, m) => format!("{} h {:02}", h, m),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_render_compactly() {
        assert_eq!(format_duration(Duration::minutes(60)), "1 h");
        assert_eq!(format_duration(Duration::minutes(90)), "1 h 30");
        assert_eq!(format_duration(Duration::minutes(125)), "2 h 05");
        assert_eq!(format_duration(Duration::minutes(45)), "45 min");
    }
}
