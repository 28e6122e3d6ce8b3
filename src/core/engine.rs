//! The monitoring engine.
//!
//! [`MonitorEngine`] owns every piece of session state: eye state, blink
//! history, health streaks, the posture window and the alert cooldowns. All
//! of it lives in a single [`Session`] that is created by `start()` and
//! dropped by `stop()`, so nothing leaks from one session into the next.
//!
//! The engine never reads a clock. Samples and ticks carry their own
//! timestamps in milliseconds and every duration is computed from those.

use crate::config::{Config, ConfigError};
use crate::core::alert::AlertIntent;
use crate::core::blink::{BlinkDetector, BlinkEvent, BlinkStep};
use crate::core::debounce::AlertDebouncer;
use crate::core::health::{BlinkHealthEvaluator, HealthStreakState};
use crate::core::posture::{
    PostureAggregator, PostureAlert, PostureClass, PostureClassifier, PostureFractions,
};
use crate::core::rate::{BlinkRateAggregator, BlinkStats, MinuteBucket};
use crate::source::types::Sample;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Engine shared between a sampling thread and a ticking thread.
pub type SharedEngine = Arc<Mutex<MonitorEngine>>;

/// Result of a `start()` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started(Uuid),
    AlreadyRunning(Uuid),
}

/// What one sample produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    pub blink: Option<BlinkEvent>,
    pub posture: Option<PostureClass>,
    /// Alerts that passed the debouncer
    pub alerts: Vec<AlertIntent>,
    /// Alerts held back by the debouncer
    pub suppressed: usize,
    /// The sample was older than the previous one
    pub out_of_order: bool,
}

/// What one tick produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    /// The bucket closed by this tick; `None` when the tick was dropped
    pub bucket: Option<MinuteBucket>,
    pub alerts: Vec<AlertIntent>,
    pub suppressed: usize,
}

/// Read-only view of the running session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorStatus {
    pub running: bool,
    pub session_id: Option<Uuid>,
    pub session_duration_ms: i64,
    pub posture: Option<PostureClass>,
    pub posture_alert: Option<PostureAlert>,
    pub posture_fractions: PostureFractions,
    pub face_detected: bool,
    pub face_size: Option<f64>,
    pub smoothed_face_size: Option<f64>,
    /// Time since a face was last seen, while none is in view
    pub no_face_duration_ms: Option<i64>,
    pub total_blinks: u64,
    pub current_minute_blinks: u32,
    pub blink_stats: BlinkStats,
    pub streaks: HealthStreakState,
}

/// All state belonging to one monitoring session.
struct Session {
    id: Uuid,
    started_at_ms: i64,
    detector: BlinkDetector,
    rate: BlinkRateAggregator,
    health: BlinkHealthEvaluator,
    classifier: PostureClassifier,
    posture: PostureAggregator,
    debouncer: AlertDebouncer,
    last_sample_ms: Option<i64>,
    last_posture: Option<PostureClass>,
    last_face_size: Option<f64>,
    face_detected: bool,
    last_face_ms: Option<i64>,
}

impl Session {
    fn new(config: &Config, now: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at_ms: now,
            detector: BlinkDetector::new(&config.blink),
            rate: BlinkRateAggregator::new(&config.rate),
            health: BlinkHealthEvaluator::new(&config.health),
            classifier: PostureClassifier::new(&config.posture),
            posture: PostureAggregator::new(&config.posture),
            debouncer: AlertDebouncer::new(config.alerts.cooldown),
            last_sample_ms: None,
            last_posture: None,
            last_face_size: None,
            face_detected: false,
            last_face_ms: None,
        }
    }

    fn latest_time(&self) -> i64 {
        let tick = self.rate.latest().map(|b| b.timestamp_ms);
        [Some(self.started_at_ms), self.last_sample_ms, tick]
            .into_iter()
            .flatten()
            .max()
            .unwrap_or(self.started_at_ms)
    }
}

/// Turns samples and minute ticks into debounced alerts.
pub struct MonitorEngine {
    config: Config,
    session: Option<Session>,
}

impl MonitorEngine {
    /// Create a stopped engine. Invalid configuration is rejected here.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            session: None,
        })
    }

    /// Wrap the engine for use from several threads.
    pub fn into_shared(self) -> SharedEngine {
        Arc::new(Mutex::new(self))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Begin a session with fresh state. A no-op while one is running.
    pub fn start(&mut self, now: i64) -> StartOutcome {
        if let Some(session) = &self.session {
            tracing::debug!(session = %session.id, "Monitoring already running");
            return StartOutcome::AlreadyRunning(session.id);
        }
        let session = Session::new(&self.config, now);
        let id = session.id;
        self.session = Some(session);
        tracing::info!(session = %id, "Monitoring started");
        StartOutcome::Started(id)
    }

    /// End the session and drop all of its state. Returns whether one was running.
    pub fn stop(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                tracing::info!(
                    session = %session.id,
                    blinks = session.detector.total_blink_count(),
                    "Monitoring stopped"
                );
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Process one frame. Samples arriving while stopped are ignored.
    pub fn observe(&mut self, sample: &Sample) -> Observation {
        let Some(session) = self.session.as_mut() else {
            return Observation::default();
        };
        let now = sample.timestamp_ms;
        let mut observation = Observation::default();

        if session.last_sample_ms.is_some_and(|last| now < last) {
            observation.out_of_order = true;
            tracing::warn!(
                timestamp_ms = now,
                last_ms = session.last_sample_ms,
                "Sample timestamp went backwards"
            );
        } else {
            session.last_sample_ms = Some(now);
        }

        match session.detector.step(sample) {
            BlinkStep::Blink(event) => {
                session.rate.record_blink();
                tracing::debug!(
                    duration_ms = event.duration_ms,
                    total = session.detector.total_blink_count(),
                    "Blink"
                );
                observation.blink = Some(event);
            }
            BlinkStep::Discarded { duration_ms } => {
                tracing::trace!(duration_ms, "Closed interval outside blink bounds");
            }
            _ => {}
        }

        let class = session.classifier.classify(sample);
        observation.posture = Some(class);
        // The status reflects the newest frame, not a late one.
        if !observation.out_of_order {
            session.last_posture = Some(class);
            session.face_detected = sample.face_detected;
            if sample.face_detected {
                session.last_face_size = sample.face_size();
                session.last_face_ms = Some(now);
            } else {
                session.last_face_size = None;
            }
        }

        let alert = session.posture.record_frame(class);
        if let Some(alert) = alert {
            if observation.out_of_order {
                observation.suppressed += 1;
            } else {
                let intent = match alert {
                    PostureAlert::Bad => AlertIntent::bad_posture(now),
                    PostureAlert::Warning => AlertIntent::posture_warning(now),
                    PostureAlert::NoFace => AlertIntent::no_face(now),
                };
                if session.debouncer.try_emit(intent.kind, now) {
                    tracing::debug!(kind = %intent.kind, "Posture alert");
                    observation.alerts.push(intent);
                } else {
                    observation.suppressed += 1;
                }
            }
        }

        observation
    }

    /// Close the current minute bucket and evaluate blink health.
    pub fn tick(&mut self, now: i64) -> TickOutcome {
        let Some(session) = self.session.as_mut() else {
            return TickOutcome::default();
        };
        let Some(bucket) = session.rate.tick(now) else {
            tracing::warn!(tick_ms = now, "Dropping tick that is not after the previous one");
            return TickOutcome::default();
        };

        let level = session.health.classify(bucket.blink_count);
        tracing::debug!(
            blinks = bucket.blink_count,
            ?level,
            history = session.rate.history_len(),
            "Minute closed"
        );

        let mut outcome = TickOutcome {
            bucket: Some(bucket),
            ..TickOutcome::default()
        };
        for intent in session.health.evaluate(&bucket) {
            let alert = AlertIntent::blink_break(
                intent.severity,
                intent.message,
                intent.suggested_duration_sec,
                now,
            );
            if session.debouncer.try_emit(alert.kind, now) {
                outcome.alerts.push(alert);
            } else {
                outcome.suppressed += 1;
            }
        }
        outcome
    }

    /// Blink rate over the retention window, or the "no data" sentinel.
    pub fn blink_stats(&self, now: i64) -> BlinkStats {
        self.session
            .as_ref()
            .map(|s| s.rate.stats_over_window(now))
            .unwrap_or_default()
    }

    pub fn total_blink_count(&self) -> u64 {
        self.session
            .as_ref()
            .map(|s| s.detector.total_blink_count())
            .unwrap_or(0)
    }

    /// Number of closed buckets currently retained.
    pub fn history_len(&self) -> usize {
        self.session.as_ref().map(|s| s.rate.history_len()).unwrap_or(0)
    }

    pub fn history(&self) -> Vec<MinuteBucket> {
        self.session
            .as_ref()
            .map(|s| s.rate.history().copied().collect())
            .unwrap_or_default()
    }

    /// Snapshot of the session as of `now`.
    pub fn status(&self, now: i64) -> MonitorStatus {
        let Some(session) = self.session.as_ref() else {
            return MonitorStatus::default();
        };
        let now = now.max(session.latest_time());

        let no_face_duration_ms = if session.face_detected {
            None
        } else {
            Some(now - session.last_face_ms.unwrap_or(session.started_at_ms))
        };

        MonitorStatus {
            running: true,
            session_id: Some(session.id),
            session_duration_ms: now - session.started_at_ms,
            posture: session.last_posture,
            posture_alert: session.posture.evaluate(),
            posture_fractions: session.posture.window().fractions(),
            face_detected: session.face_detected,
            face_size: session.last_face_size,
            smoothed_face_size: session.classifier.smoothed_face_size(),
            no_face_duration_ms,
            total_blinks: session.detector.total_blink_count(),
            current_minute_blinks: session.rate.current_count(),
            blink_stats: session.rate.stats_over_window(now),
            streaks: session.health.streaks(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alert::AlertKind;

    fn engine() -> MonitorEngine {
        let mut engine = MonitorEngine::new(Config::default()).unwrap();
        engine.start(0);
        engine
    }

    fn blink_at(engine: &mut MonitorEngine, start: i64) {
        engine.observe(&Sample::face(start, 0.1, 0.1));
        engine.observe(&Sample::face(start + 100, 0.3, 0.1));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.blink.min_duration = config.blink.max_duration;
        assert!(MonitorEngine::new(config).is_err());
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut engine = MonitorEngine::new(Config::default()).unwrap();
        let StartOutcome::Started(id) = engine.start(0) else {
            panic!("expected a new session");
        };
        assert_eq!(engine.start(10), StartOutcome::AlreadyRunning(id));
        assert!(engine.stop());
        assert!(!engine.stop());
    }

    #[test]
    fn test_stopped_engine_ignores_input() {
        let mut engine = MonitorEngine::new(Config::default()).unwrap();
        let obs = engine.observe(&Sample::face(0, 0.1, 0.9));
        assert_eq!(obs, Observation::default());
        assert!(engine.tick(60_000).bucket.is_none());
        assert!(!engine.status(0).running);
    }

    #[test]
    fn test_restart_clears_state() {
        let mut engine = engine();
        blink_at(&mut engine, 1_000);
        blink_at(&mut engine, 2_000);
        engine.tick(60_000);
        assert_eq!(engine.total_blink_count(), 2);
        assert_eq!(engine.history_len(), 1);

        engine.stop();
        engine.start(100_000);
        assert_eq!(engine.total_blink_count(), 0);
        assert_eq!(engine.history_len(), 0);
        assert_eq!(engine.status(100_000).streaks, HealthStreakState::default());
        assert_eq!(engine.status(100_000).posture_fractions.frames, 0);
    }

    #[test]
    fn test_restart_clears_cooldowns() {
        let mut engine = engine();
        let obs = engine.observe(&Sample::face(0, 0.3, 0.9));
        assert_eq!(obs.alerts.len(), 1);
        engine.stop();
        engine.start(10);
        let obs = engine.observe(&Sample::face(10, 0.3, 0.9));
        assert_eq!(obs.alerts.len(), 1);
    }

    #[test]
    fn test_blinks_feed_minute_buckets() {
        let mut engine = engine();
        for i in 0..15 {
            blink_at(&mut engine, i * 3_000);
        }
        let outcome = engine.tick(60_000);
        assert_eq!(outcome.bucket.unwrap().blink_count, 15);
        assert!(outcome.alerts.is_empty());
        assert_eq!(engine.blink_stats(60_000).avg_per_minute, 15.0);
    }

    #[test]
    fn test_low_blink_rate_alerts() {
        let mut engine = engine();
        let mut kinds = Vec::new();
        for minute in 1..=6 {
            let outcome = engine.tick(minute * 60_000);
            kinds.push(outcome.alerts.iter().map(|a| a.kind).collect::<Vec<_>>());
        }
        assert_eq!(kinds[1], vec![AlertKind::LowBlinkMicro]);
        assert_eq!(kinds[4], vec![AlertKind::LowBlinkMacro]);
        assert!(kinds[5].is_empty());
        assert_eq!(kinds.iter().flatten().count(), 2);
    }

    #[test]
    fn test_posture_alerts_are_debounced() {
        let mut engine = engine();
        let mut emitted = Vec::new();
        // 10 seconds of bad posture at 10 Hz.
        for i in 0..100 {
            let obs = engine.observe(&Sample::face(i * 100, 0.3, 0.9));
            emitted.extend(obs.alerts.into_iter().map(|a| a.timestamp_ms));
        }
        assert_eq!(emitted, vec![0, 3_000, 6_000, 9_000]);
    }

    #[test]
    fn test_out_of_order_sample_emits_nothing() {
        let mut engine = engine();
        let obs = engine.observe(&Sample::no_face(5_000));
        assert_eq!(obs.alerts.len(), 1);

        let obs = engine.observe(&Sample::face(1_000, 0.3, 0.9));
        assert!(obs.out_of_order);
        assert!(obs.alerts.is_empty());
        assert_eq!(obs.posture, Some(PostureClass::Bad));
        // The frame still counts towards the window: one bad of two.
        assert_eq!(engine.status(5_000).posture_fractions.frames, 2);
        assert_eq!(obs.suppressed, 0);
    }

    #[test]
    fn test_late_sample_does_not_replace_current_state() {
        let mut engine = engine();
        engine.observe(&Sample::face(4_000, 0.3, 0.1));
        engine.observe(&Sample::no_face(5_000));

        let obs = engine.observe(&Sample::face(1_000, 0.3, 0.9));
        assert!(obs.out_of_order);

        let status = engine.status(6_000);
        assert!(!status.face_detected);
        assert_eq!(status.face_size, None);
        assert_eq!(status.posture, Some(PostureClass::NoFace));
        assert_eq!(status.no_face_duration_ms, Some(2_000));
    }

    #[test]
    fn test_no_face_duration() {
        let mut engine = engine();
        engine.observe(&Sample::face(1_000, 0.3, 0.1));
        engine.observe(&Sample::no_face(2_000));
        engine.observe(&Sample::no_face(31_000));
        let status = engine.status(31_000);
        assert!(!status.face_detected);
        assert_eq!(status.no_face_duration_ms, Some(30_000));
        assert_eq!(status.posture, Some(PostureClass::NoFace));
    }

    #[test]
    fn test_no_face_alert() {
        let mut engine = engine();
        let mut kinds = Vec::new();
        for i in 0..20 {
            let obs = engine.observe(&Sample::no_face(i * 100));
            kinds.extend(obs.alerts.into_iter().map(|a| a.kind));
        }
        assert_eq!(kinds, vec![AlertKind::NoFace]);
    }
}
