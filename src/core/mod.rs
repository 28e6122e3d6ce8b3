//! Core signal monitoring for the posture monitor.
//!
//! This module contains:
//! - Blink detection and per-minute blink rate aggregation
//! - Blink health streak evaluation
//! - Posture classification and the posture frame window
//! - Alert debouncing and the engine that ties them together

pub mod alert;
pub mod blink;
pub mod clock;
pub mod debounce;
pub mod engine;
pub mod health;
pub mod posture;
pub mod rate;

// Re-export commonly used types
pub use alert::{AlertIntent, AlertKind, BreakSeverity, Severity};
pub use blink::{BlinkDetector, BlinkEvent, EyeState};
pub use clock::MinuteClock;
pub use debounce::AlertDebouncer;
pub use engine::{
    MonitorEngine, MonitorStatus, Observation, SharedEngine, StartOutcome, TickOutcome,
};
pub use health::{BlinkHealthEvaluator, BreakIntent, HealthStreakState, RateLevel};
pub use posture::{PostureAggregator, PostureAlert, PostureClass, PostureClassifier, PostureWindow};
pub use rate::{BlinkRateAggregator, BlinkStats, MinuteBucket};
