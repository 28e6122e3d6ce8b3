//! Blink detection from eye openness.
//!
//! Two states, open and closed, split by a single threshold. A closed
//! interval only counts as a blink when its length falls inside the
//! configured bounds: shorter intervals are flutter, longer ones are eyes
//! shut or the user looking away.

use crate::config::BlinkConfig;
use crate::source::types::Sample;
use serde::{Deserialize, Serialize};

/// A closed-then-open interval accepted as a blink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlinkEvent {
    /// Time at which the eyes reopened
    pub timestamp_ms: i64,
    /// Length of the closed interval
    pub duration_ms: i64,
}

/// Eye state tracked across samples.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeState {
    pub is_closed: bool,
    pub closed_since: Option<i64>,
    pub total_blink_count: u64,
}

/// Outcome of feeding one sample to the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlinkStep {
    /// Openness missing or unusable
    Ignored,
    /// Sample older than the last accepted one
    ClockRegression,
    /// Eyes went from open to closed
    Closed,
    /// Closed interval accepted as a blink
    Blink(BlinkEvent),
    /// Closed interval outside the blink bounds
    Discarded { duration_ms: i64 },
    /// No transition
    Steady,
}

/// Open/closed state machine with duration-gated blink classification.
#[derive(Debug, Clone)]
pub struct BlinkDetector {
    closed_threshold: f64,
    min_duration_ms: i64,
    max_duration_ms: i64,
    state: EyeState,
    last_timestamp_ms: Option<i64>,
}

impl BlinkDetector {
    /// Create a detector with open eyes and no blinks counted.
    pub fn new(config: &BlinkConfig) -> Self {
        Self {
            closed_threshold: config.closed_threshold,
            min_duration_ms: config.min_duration.as_millis() as i64,
            max_duration_ms: config.max_duration.as_millis() as i64,
            state: EyeState::default(),
            last_timestamp_ms: None,
        }
    }

    /// Feed one sample; returns a blink when one just completed.
    pub fn observe(&mut self, sample: &Sample) -> Option<BlinkEvent> {
        match self.step(sample) {
            BlinkStep::Blink(event) => Some(event),
            _ => None,
        }
    }

    /// Feed one sample and report what happened.
    pub fn step(&mut self, sample: &Sample) -> BlinkStep {
        let Some(openness) = sample.openness() else {
            return BlinkStep::Ignored;
        };
        let now = sample.timestamp_ms;
        if self.last_timestamp_ms.is_some_and(|last| now < last) {
            return BlinkStep::ClockRegression;
        }
        self.last_timestamp_ms = Some(now);

        let closed = openness < self.closed_threshold;
        match (self.state.is_closed, closed) {
            (false, true) => {
                self.state.is_closed = true;
                self.state.closed_since = Some(now);
                BlinkStep::Closed
            }
            (true, false) => {
                self.state.is_closed = false;
                let since = self.state.closed_since.take().unwrap_or(now);
                let duration_ms = now - since;
                if (self.min_duration_ms..=self.max_duration_ms).contains(&duration_ms) {
                    self.state.total_blink_count += 1;
                    BlinkStep::Blink(BlinkEvent {
                        timestamp_ms: now,
                        duration_ms,
                    })
                } else {
                    BlinkStep::Discarded { duration_ms }
                }
            }
            _ => BlinkStep::Steady,
        }
    }

    /// Current open/closed state.
    pub fn state(&self) -> &EyeState {
        &self.state
    }

    /// Blinks accepted since the detector was created.
    pub fn total_blink_count(&self) -> u64 {
        self.state.total_blink_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn detector() -> BlinkDetector {
        BlinkDetector::new(&BlinkConfig {
            closed_threshold: 0.25,
            min_duration: Duration::from_millis(50),
            max_duration: Duration::from_millis(500),
        })
    }

    fn eye(ts: i64, openness: f64) -> Sample {
        Sample::face(ts, openness, 0.1)
    }

    /// Close at `start`, reopen at `start + closed_ms`.
    fn closed_interval(detector: &mut BlinkDetector, start: i64, closed_ms: i64) -> usize {
        let samples = [
            eye(start - 10, 0.3),
            eye(start, 0.1),
            eye(start + closed_ms, 0.3),
        ];
        samples
            .iter()
            .filter_map(|s| detector.observe(s))
            .count()
    }

    #[test]
    fn test_open_eyes_never_blink() {
        let mut d = detector();
        for i in 0..500 {
            let openness = 0.25 + (i % 7) as f64 * 0.1;
            assert!(d.observe(&eye(i * 33, openness)).is_none());
        }
        assert_eq!(d.total_blink_count(), 0);
    }

    #[test]
    fn test_min_duration_is_inclusive() {
        let mut d = detector();
        assert_eq!(closed_interval(&mut d, 100, 50), 1);

        let mut d = detector();
        assert_eq!(closed_interval(&mut d, 100, 49), 0);
        assert_eq!(d.total_blink_count(), 0);
    }

    #[test]
    fn test_max_duration_bound() {
        let mut d = detector();
        assert_eq!(closed_interval(&mut d, 100, 500), 1);

        let mut d = detector();
        assert_eq!(closed_interval(&mut d, 100, 501), 0);
        assert!(!d.state().is_closed);
    }

    #[test]
    fn test_repeated_closed_samples_keep_start() {
        let mut d = detector();
        d.observe(&eye(0, 0.1));
        d.observe(&eye(50, 0.1));
        d.observe(&eye(100, 0.1));
        assert_eq!(d.state().closed_since, Some(0));
        let event = d.observe(&eye(150, 0.3)).unwrap();
        assert_eq!(event.duration_ms, 150);
    }

    #[test]
    fn test_missing_openness_is_ignored() {
        let mut d = detector();
        d.observe(&eye(0, 0.1));
        assert_eq!(d.step(&Sample::no_face(40)), BlinkStep::Ignored);
        assert!(d.state().is_closed);
        assert!(d.observe(&eye(100, 0.3)).is_some());
    }

    #[test]
    fn test_clock_regression_is_dropped() {
        let mut d = detector();
        d.observe(&eye(1000, 0.1));
        assert_eq!(d.step(&eye(900, 0.3)), BlinkStep::ClockRegression);
        assert!(d.state().is_closed);
        assert_eq!(d.observe(&eye(1100, 0.3)).map(|e| e.duration_ms), Some(100));
    }

    #[test]
    fn test_sequence_from_recording() {
        let mut d = detector();
        let openness = [0.30, 0.20, 0.20, 0.20, 0.30];
        let blinks: Vec<BlinkEvent> = openness
            .iter()
            .enumerate()
            .filter_map(|(i, &o)| d.observe(&eye(i as i64 * 50, o)))
            .collect();
        assert_eq!(blinks.len(), 1);
        assert_eq!(blinks[0].duration_ms, 150);
    }
}
