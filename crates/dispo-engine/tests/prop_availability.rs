//! Property-based tests for availability computation using proptest.
//!
//! These tests verify invariants that should hold for *any* event list and
//! request, not just the scenarios in `availability_tests.rs`.

use chrono::{Duration, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use dispo_engine::availability::day_window;
use dispo_engine::{
    find_availability, AvailabilityConfig, AvailabilityRequest, CalendarEvent, EventTime,
    WorkWindow,
};
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_timezone() -> impl Strategy<Value = Tz> {
    prop_oneof![
        Just(chrono_tz::UTC),
        Just(chrono_tz::Europe::Paris),
        Just(chrono_tz::America::New_York),
        Just(chrono_tz::Asia::Tokyo),
    ]
}

/// An event within March 2026, 5 to 600 minutes long: date-only, naive or UTC markers.
fn arb_event() -> impl Strategy<Value = CalendarEvent> {
    (1u32..=31, 0u32..=23, 0u32..4, 5i64..=600, any::<bool>(), any::<bool>()).prop_map(
        |(day, hour, quarter, minutes, aware, all_day)| {
            let start = NaiveDate::from_ymd_opt(2026, 3, day)
                .unwrap()
                .and_hms_opt(hour, quarter * 15, 0)
                .unwrap();
            let end = start + Duration::minutes(minutes);
            let marker = |ndt: chrono::NaiveDateTime| {
                if all_day {
                    EventTime::Date(ndt.date())
                } else if aware {
                    EventTime::Aware(ndt.and_utc().fixed_offset())
                } else {
                    EventTime::Naive(ndt)
                }
            };
            CalendarEvent::new(marker(start), marker(end), all_day, "busy")
        },
    )
}

fn arb_request() -> impl Strategy<Value = AvailabilityRequest> {
    (
        1u32..=20,
        0u32..=10,
        6u32..=11,
        13u32..=20,
        1i64..=8,
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(day, span, from, to, quarters, weekends, all_day)| {
            let start = NaiveDate::from_ymd_opt(2026, 3, day).unwrap();
            let window = WorkWindow::new(
                NaiveTime::from_hms_opt(from, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(to, 0, 0).unwrap(),
            )
            .unwrap();
            let mut request = AvailabilityRequest::new(
                start,
                start + Duration::days(i64::from(span)),
                Duration::minutes(15 * quarters),
                window,
            );
            request.allow_weekends = weekends;
            request.include_all_day_events = all_day;
            request
        })
}

fn config() -> ProptestConfig {
    ProptestConfig {
        cases: 256,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Property 1: every slot is long enough and inside its day's working window
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn slots_are_long_enough_and_inside_the_window(
        events in prop::collection::vec(arb_event(), 0..20),
        request in arb_request(),
        tz in arb_timezone(),
    ) {
        let cfg = AvailabilityConfig::new(tz);
        let slots = find_availability(&events, &request, &cfg).unwrap();

        for slot in &slots {
            prop_assert!(slot.end - slot.start >= request.duration);
            let window = day_window(slot.date(), &request.window, &cfg).unwrap();
            prop_assert!(slot.start >= window.start());
            prop_assert!(slot.end <= window.end());
        }
    }
}

// ---------------------------------------------------------------------------
// Property 2: slots are strictly ordered and never overlap
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn slots_are_ordered_and_disjoint(
        events in prop::collection::vec(arb_event(), 0..20),
        request in arb_request(),
        tz in arb_timezone(),
    ) {
        let slots = find_availability(&events, &request, &AvailabilityConfig::new(tz)).unwrap();

        for pair in slots.windows(2) {
            prop_assert!(pair[0].end <= pair[1].start, "{:?} overlaps {:?}", pair[0], pair[1]);
            prop_assert!(pair[0].start < pair[1].start);
        }
    }
}

// ---------------------------------------------------------------------------
// Property 3: the computation is pure and insensitive to event order
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn result_is_deterministic_and_order_independent(
        events in prop::collection::vec(arb_event(), 0..20),
        request in arb_request(),
        tz in arb_timezone(),
        rotation in 0usize..20,
    ) {
        let cfg = AvailabilityConfig::new(tz);
        let first = find_availability(&events, &request, &cfg).unwrap();
        let second = find_availability(&events, &request, &cfg).unwrap();
        prop_assert_eq!(&first, &second);

        let mut shuffled = events.clone();
        shuffled.reverse();
        if !shuffled.is_empty() {
            let by = rotation % shuffled.len();
            shuffled.rotate_left(by);
        }
        let reordered = find_availability(&shuffled, &request, &cfg).unwrap();
        prop_assert_eq!(first, reordered);
    }
}

// ---------------------------------------------------------------------------
// Property 4: no slot overlaps a busy timed event
// ---------------------------------------------------------------------------
proptest! {
    #![proptest_config(config())]

    #[test]
    fn slots_never_overlap_timed_events(
        events in prop::collection::vec(arb_event(), 0..20),
        request in arb_request(),
    ) {
        let tz = chrono_tz::UTC;
        let slots = find_availability(&events, &request, &AvailabilityConfig::new(tz)).unwrap();

        for event in events.iter().filter(|e| !e.is_all_day) {
            let to_utc = |marker: &EventTime| match marker {
                EventTime::Naive(ndt) => ndt.and_utc(),
                EventTime::Aware(dt) => dt.with_timezone(&Utc),
                EventTime::Date(_) => unreachable!("timed events carry datetimes"),
            };
            let (start, end) = (to_utc(&event.start), to_utc(&event.end));
            for slot in &slots {
                let (slot_start, slot_end) = (slot.start.with_timezone(&Utc), slot.end.with_timezone(&Utc));
                prop_assert!(
                    !(slot_start < end && start < slot_end),
                    "slot {:?} overlaps event {:?}-{:?}", slot, start, end
                );
            }
        }
    }
}
