//! Half-open time intervals in the target timezone.

use chrono::{DateTime, Duration};
use chrono_tz::Tz;

/// A half-open span `[start, end)`. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeInterval {
    start: DateTime<Tz>,
    end: DateTime<Tz>,
}

impl TimeInterval {
    /// Returns `None` when `end` precedes `start`.
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// An interval from `start` to `end`, or empty at `start` if `end` is earlier.
    pub fn clamped(start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    pub fn start(&self) -> DateTime<Tz> {
        self.start
    }

    pub fn end(&self) -> DateTime<Tz> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Strict overlap: intervals that only touch at a boundary do not overlap.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Push the end out to `end` if that is later.
    pub(crate) fn extend_end(&mut self, end: DateTime<Tz>) {
        self.end = self.end.max(end);
    }

    /// The part of `self` inside `bounds`, or `None` if they do not overlap.
    pub fn clip_to(&self, bounds: &TimeInterval) -> Option<TimeInterval> {
        if !self.overlaps(bounds) {
            return None;
        }
        Some(TimeInterval {
            start: self.start.max(bounds.start),
            end: self.end.min(bounds.end),
        })
    }
}
