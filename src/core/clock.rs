//! Virtual minute clock driven by sample timestamps.

use std::time::Duration;

/// Produces bucket ticks from the timestamps it is shown.
///
/// The first timestamp anchors the clock; after that every whole period that
/// has elapsed yields one tick, so a gap in the input produces one tick per
/// missed period. A gap longer than the catch-up limit yields only the most
/// recent `limit` ticks: older empty minutes would be purged from the history
/// straight away and cannot move a streak that has already fired.
#[derive(Debug, Clone)]
pub struct MinuteClock {
    period_ms: i64,
    max_catch_up: i64,
    next_tick_ms: Option<i64>,
}

impl MinuteClock {
    /// Create an unanchored clock with an unlimited catch-up.
    pub fn new(period: Duration) -> Self {
        Self {
            period_ms: (period.as_millis() as i64).max(1),
            max_catch_up: i64::MAX,
            next_tick_ms: None,
        }
    }

    /// Limit the number of ticks a single call to [`due`](Self::due) returns.
    pub fn with_catch_up_limit(mut self, limit: usize) -> Self {
        self.max_catch_up = i64::try_from(limit).unwrap_or(i64::MAX).max(1);
        self
    }

    /// Catch-up limit that still covers a full retention window and the
    /// longest streak.
    pub fn catch_up_limit(period: Duration, retention: Duration, longest_streak: u32) -> usize {
        let period_ms = period.as_millis().max(1);
        let window = (retention.as_millis() / period_ms) as usize + 1;
        window.max(longest_streak as usize + 1)
    }

    /// Anchor the clock so the first tick falls one period after `origin`.
    pub fn anchor(&mut self, origin: i64) {
        self.next_tick_ms = Some(origin.saturating_add(self.period_ms));
    }

    /// Forget the anchor; the next call to [`due`](Self::due) re-anchors.
    pub fn reset(&mut self) {
        self.next_tick_ms = None;
    }

    /// Timestamp of the next tick, if anchored.
    pub fn next_tick(&self) -> Option<i64> {
        self.next_tick_ms
    }

    /// Ticks due at or before `now`, oldest first.
    pub fn due(&mut self, now: i64) -> Vec<i64> {
        let Some(next) = self.next_tick_ms else {
            self.anchor(now);
            return Vec::new();
        };
        if next > now {
            return Vec::new();
        }

        let missed = (now.saturating_sub(next) / self.period_ms).saturating_add(1);
        let skipped = missed.saturating_sub(self.max_catch_up);
        if skipped > 0 {
            tracing::warn!(
                skipped,
                kept = self.max_catch_up,
                "Sample time jumped, collapsing missed minutes"
            );
        }

        let first = next + skipped * self.period_ms;
        let ticks: Vec<i64> = (0..missed - skipped)
            .map(|i| first + i * self.period_ms)
            .collect();
        let last = ticks.last().copied().unwrap_or(first);
        self.next_tick_ms = Some(last.saturating_add(self.period_ms));
        ticks
    }
}
