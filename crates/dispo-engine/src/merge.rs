//! Coalesce busy intervals into a minimal, ordered, disjoint set.

use crate::interval::TimeInterval;

/// Merge overlapping or touching intervals.
///
/// Returns a list sorted by start in which every interval ends strictly
/// before the next one begins. Input order does not affect the result.
pub fn merge_intervals(mut intervals: Vec<TimeInterval>) -> Vec<TimeInterval> {
    if intervals.is_empty() {
        return Vec::new();
    }

    // Sort by start time (then by end time for stability).
    intervals.sort_by_key(|iv| (iv.start(), iv.end()));

    let mut merged: Vec<TimeInterval> = Vec::with_capacity(intervals.len());
    for iv in intervals {
        if let Some(last) = merged.last_mut() {
            if iv.start() <= last.end() {
                // Overlapping or adjacent: extend the current interval.
                last.extend_end(iv.end());
                continue;
            }
        }
        merged.push(iv);
    }

    merged
}
