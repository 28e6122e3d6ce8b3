//! Drives a [`MonitorEngine`] from a sample stream.
//!
//! The monitor feeds samples to the engine, runs minute ticks, and hands
//! every alert that survives debouncing to the sink. Ticks come either from
//! a [`MinuteClock`] following the sample timestamps, or from the caller.
//!
//! Caller ticks driven by a wall-clock timer go through [`Monitor::tick_at`],
//! which maps the timer's `Instant` onto the sample timeline: the last sample
//! timestamp plus the time elapsed since that sample arrived.

use crate::config::{Config, ConfigError};
use crate::core::clock::MinuteClock;
use crate::core::engine::{MonitorEngine, MonitorStatus, Observation, StartOutcome, TickOutcome};
use crate::sink::AlertSink;
use crate::source::types::Sample;
use crate::stats::{create_shared_stats, SharedSessionStats};
use std::time::Instant;

/// Where minute ticks come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickSource {
    /// Derived from sample timestamps
    Samples,
    /// Supplied through [`Monitor::tick`]
    External,
}

/// A monitoring session wired to an alert sink.
pub struct Monitor<S: AlertSink> {
    engine: MonitorEngine,
    clock: Option<MinuteClock>,
    sink: S,
    stats: SharedSessionStats,
    /// Timestamp of the newest sample and when it arrived
    time_base: Option<(i64, Instant)>,
}

impl<S: AlertSink> Monitor<S> {
    /// Create a stopped monitor. Invalid configuration is rejected here.
    pub fn new(config: Config, ticks: TickSource, sink: S) -> Result<Self, ConfigError> {
        let clock = match ticks {
            TickSource::Samples => {
                let limit = MinuteClock::catch_up_limit(
                    config.rate.bucket_period,
                    config.rate.retention,
                    config.health.micro_streak.max(config.health.macro_streak),
                );
                Some(MinuteClock::new(config.rate.bucket_period).with_catch_up_limit(limit))
            }
            TickSource::External => None,
        };
        Ok(Self {
            engine: MonitorEngine::new(config)?,
            clock,
            sink,
            stats: create_shared_stats(),
            time_base: None,
        })
    }

    /// Start a session. Statistics restart with every new session.
    pub fn start(&mut self, now: i64) -> StartOutcome {
        let outcome = self.engine.start(now);
        if let StartOutcome::Started(_) = outcome {
            self.stats.reset();
            if let Some(clock) = self.clock.as_mut() {
                clock.anchor(now);
            }
        }
        outcome
    }

    /// Stop the session and forget the clock anchor.
    pub fn stop(&mut self) -> bool {
        if let Some(clock) = self.clock.as_mut() {
            clock.reset();
        }
        self.time_base = None;
        self.engine.stop()
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    /// Run any ticks that are due, then process the sample.
    pub fn process(&mut self, sample: &Sample) -> Observation {
        if !self.engine.is_running() {
            return Observation::default();
        }

        if let Some(clock) = self.clock.as_mut() {
            for tick in clock.due(sample.timestamp_ms) {
                let outcome = self.engine.tick(tick);
                self.dispatch_tick(&outcome);
            }
        }

        let observation = self.engine.observe(sample);
        if !observation.out_of_order {
            self.time_base = Some((sample.timestamp_ms, Instant::now()));
        }
        self.stats.record_sample();
        if observation.out_of_order {
            self.stats.record_out_of_order();
        }
        if observation.blink.is_some() {
            self.stats.record_blink();
        }
        for alert in &observation.alerts {
            self.sink.deliver(alert);
        }
        self.stats
            .record_alerts(observation.alerts.len(), observation.suppressed);
        observation
    }

    /// Close a minute bucket at `now`.
    pub fn tick(&mut self, now: i64) -> TickOutcome {
        let outcome = self.engine.tick(now);
        self.dispatch_tick(&outcome);
        outcome
    }

    /// Sample time corresponding to `instant`, once a sample has arrived.
    pub fn sample_time_at(&self, instant: Instant) -> Option<i64> {
        self.time_base.map(|(timestamp_ms, arrived)| {
            let elapsed = instant.saturating_duration_since(arrived).as_millis();
            timestamp_ms.saturating_add(i64::try_from(elapsed).unwrap_or(i64::MAX))
        })
    }

    /// Close a minute bucket at the sample time of `instant`. Nothing happens
    /// before the first sample.
    pub fn tick_at(&mut self, instant: Instant) -> Option<TickOutcome> {
        let now = self.sample_time_at(instant)?;
        Some(self.tick(now))
    }

    fn dispatch_tick(&mut self, outcome: &TickOutcome) {
        if outcome.bucket.is_some() {
            self.stats.record_minute();
        }
        for alert in &outcome.alerts {
            self.sink.deliver(alert);
        }
        self.stats
            .record_alerts(outcome.alerts.len(), outcome.suppressed);
    }

    /// Snapshot of the session as of `now`.
    pub fn status(&self, now: i64) -> MonitorStatus {
        self.engine.status(now)
    }

    /// Shared handle to this session's counters.
    pub fn stats(&self) -> SharedSessionStats {
        self.stats.clone()
    }

    pub fn engine(&self) -> &MonitorEngine {
        &self.engine
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the monitor and return its sink.
    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alert::{AlertIntent, AlertKind};
    use std::time::Duration;

    fn monitor(ticks: TickSource) -> Monitor<Vec<AlertIntent>> {
        Monitor::new(Config::default(), ticks, Vec::new()).unwrap()
    }

    #[test]
    fn test_sample_clock_drives_ticks() {
        let mut m = monitor(TickSource::Samples);
        m.start(0);
        // Six minutes of open eyes at 10 Hz, no blinks.
        for i in 0..3_601 {
            m.process(&Sample::face(i * 100, 0.3, 0.1));
        }
        let kinds: Vec<AlertKind> = m.sink().iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![AlertKind::LowBlinkMicro, AlertKind::LowBlinkMacro]);
        assert_eq!(m.stats().stats().minutes_closed, 6);
        assert_eq!(m.stats().stats().samples_processed, 3_601);
    }

    #[test]
    fn test_external_ticks() {
        let mut m = monitor(TickSource::External);
        m.start(0);
        m.process(&Sample::face(600_000, 0.3, 0.1));
        assert_eq!(m.engine().history_len(), 0);
        m.tick(60_000);
        m.tick(120_000);
        assert_eq!(m.engine().history_len(), 2);
        assert_eq!(m.sink().len(), 1);
    }

    #[test]
    fn test_timestamp_jump_is_bounded() {
        let mut m = monitor(TickSource::Samples);
        m.start(0);
        m.process(&Sample::face(0, 0.3, 0.1));
        m.process(&Sample::face(i64::MAX - 10, 0.3, 0.1));
        assert_eq!(m.engine().history_len(), 31);
        assert_eq!(m.stats().stats().minutes_closed, 31);

        // Epoch timestamps after a recording that started at zero.
        let mut m = monitor(TickSource::Samples);
        m.start(0);
        m.process(&Sample::face(0, 0.3, 0.1));
        m.process(&Sample::face(1_700_000_000_000, 0.3, 0.1));
        assert_eq!(m.engine().history_len(), 31);
        let kinds: Vec<AlertKind> = m.sink().iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![AlertKind::LowBlinkMicro, AlertKind::LowBlinkMacro]);
    }

    #[test]
    fn test_wall_ticks_follow_sample_time() {
        let mut m = monitor(TickSource::External);
        assert!(m.tick_at(Instant::now()).is_none());

        // Recorded timestamps start near zero while the timer runs on its own clock.
        m.start(5_000);
        let arrived = Instant::now();
        m.process(&Sample::no_face(5_000));

        let outcome = m
            .tick_at(arrived + Duration::from_secs(60))
            .expect("a sample has arrived");
        let bucket = outcome.bucket.expect("minute closed");
        assert!((64_000..=65_000).contains(&bucket.timestamp_ms));

        let status = m.status(bucket.timestamp_ms);
        assert!(status.session_duration_ms <= 60_000);
        assert!(status.no_face_duration_ms.is_some_and(|d| d <= 60_000));
        assert_eq!(status.blink_stats.minute_count, 1);
    }

    #[test]
    fn test_stopped_monitor_does_nothing() {
        let mut m = monitor(TickSource::Samples);
        m.process(&Sample::face(0, 0.3, 0.9));
        assert!(m.sink().is_empty());
        assert_eq!(m.stats().stats().samples_processed, 0);
    }

    #[test]
    fn test_restart_resets_clock_and_stats() {
        let mut m = monitor(TickSource::Samples);
        m.start(0);
        m.process(&Sample::face(90_000, 0.3, 0.1));
        assert_eq!(m.stats().stats().minutes_closed, 1);

        m.stop();
        m.start(1_000_000);
        m.process(&Sample::face(1_030_000, 0.3, 0.1));
        assert_eq!(m.stats().stats().minutes_closed, 0);
        assert_eq!(m.engine().history_len(), 0);
    }
}
