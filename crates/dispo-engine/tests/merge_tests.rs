//! Tests for busy interval merging.

use chrono::TimeZone;
use chrono_tz::Europe::Paris;
use dispo_engine::{merge_intervals, TimeInterval};

fn iv(start_hour: u32, start_min: u32, end_hour: u32, end_min: u32) -> TimeInterval {
    TimeInterval::new(
        Paris.with_ymd_and_hms(2026, 3, 2, start_hour, start_min, 0).unwrap(),
        Paris.with_ymd_and_hms(2026, 3, 2, end_hour, end_min, 0).unwrap(),
    )
    .unwrap()
}

#[test]
fn empty_input_gives_empty_output() {
    assert!(merge_intervals(Vec::new()).is_empty());
}

#[test]
fn overlapping_intervals_merge() {
    let merged = merge_intervals(vec![iv(10, 0, 12, 0), iv(11, 0, 13, 0)]);
    assert_eq!(merged, vec![iv(10, 0, 13, 0)]);
}

#[test]
fn touching_intervals_merge() {
    let merged = merge_intervals(vec![iv(10, 0, 11, 0), iv(11, 0, 12, 0)]);
    assert_eq!(merged, vec![iv(10, 0, 12, 0)]);
}

#[test]
fn contained_interval_is_absorbed() {
    let merged = merge_intervals(vec![iv(9, 0, 17, 0), iv(10, 0, 11, 0)]);
    assert_eq!(merged, vec![iv(9, 0, 17, 0)]);
}

#[test]
fn disjoint_intervals_are_sorted() {
    let merged = merge_intervals(vec![iv(15, 0, 16, 0), iv(9, 0, 10, 0), iv(12, 0, 13, 0)]);
    assert_eq!(merged, vec![iv(9, 0, 10, 0), iv(12, 0, 13, 0), iv(15, 0, 16, 0)]);
}

#[test]
fn cascading_overlaps_collapse_to_one() {
    let merged = merge_intervals(vec![
        iv(11, 0, 12, 0),
        iv(9, 0, 10, 30),
        iv(10, 0, 11, 30),
    ]);
    assert_eq!(merged, vec![iv(9, 0, 12, 0)]);
}

#[test]
fn merged_result_is_strictly_separated() {
    let merged = merge_intervals(vec![
        iv(9, 0, 9, 30),
        iv(9, 15, 10, 0),
        iv(10, 30, 11, 0),
        iv(14, 0, 15, 0),
        iv(14, 30, 14, 45),
    ]);
    for pair in merged.windows(2) {
        assert!(pair[0].end() < pair[1].start(), "{:?} touches {:?}", pair[0], pair[1]);
    }
    assert_eq!(merged.len(), 3);
}
