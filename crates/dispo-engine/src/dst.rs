//! DST transition policies for localizing wall-clock times.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Policy for local times that fall in a DST gap (e.g., 02:30 during spring forward).
///
/// Ambiguous local times (the repeated hour in autumn) always resolve to the
/// earlier instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DstPolicy {
    /// Nonexistent local times cannot be localized.
    Skip,
    /// Move forward by the length of the gap (02:30 becomes 03:30).
    #[default]
    ShiftForward,
}

/// Localize a wall-clock time into `tz` under the given policy.
///
/// Returns `None` only for a time inside a DST gap under [`DstPolicy::Skip`].
pub fn localize(tz: Tz, local: NaiveDateTime, policy: DstPolicy) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => match policy {
            DstPolicy::Skip => None,
            DstPolicy::ShiftForward => shift_past_gap(tz, local),
        },
    }
}

/// Read `local` with the UTC offset in force before the gap; converting that
/// instant back into `tz` lands the same distance past the transition.
fn shift_past_gap(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Tz>> {
    let before = tz
        .from_local_datetime(&(local - Duration::hours(6)))
        .earliest()?;
    let offset = before.offset().fix().local_minus_utc();
    let utc = local - Duration::seconds(i64::from(offset));
    Some(tz.from_utc_datetime(&utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn regular_time_is_unchanged() {
        let dt = localize(chrono_tz::Europe::Paris, local(2026, 6, 1, 9, 0), DstPolicy::Skip).unwrap();
        assert_eq!(dt.naive_local(), local(2026, 6, 1, 9, 0));
    }

    #[test]
    fn gap_time_shifts_forward_by_gap_length() {
        // Paris springs forward at 02:00 on 2026-03-29.
        let dt = localize(
            chrono_tz::Europe::Paris,
            local(2026, 3, 29, 2, 30),
            DstPolicy::ShiftForward,
        )
        .unwrap();
        assert_eq!(dt.hour(), 3);
        assert_eq!(dt.minute(), 30);
    }

    #[test]
    fn gap_time_is_rejected_under_skip() {
        let dt = localize(chrono_tz::Europe::Paris, local(2026, 3, 29, 2, 30), DstPolicy::Skip);
        assert!(dt.is_none());
    }

    #[test]
    fn ambiguous_time_resolves_to_earliest() {
        // Paris falls back at 03:00 on 2026-10-25; 02:30 happens twice.
        let dt = localize(
            chrono_tz::Europe::Paris,
            local(2026, 10, 25, 2, 30),
            DstPolicy::ShiftForward,
        )
        .unwrap();
        assert_eq!(dt.offset().fix().local_minus_utc(), 7200);
    }
}
