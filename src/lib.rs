//! Posture Monitor - debounced screen-health alerts from per-frame face data.
//!
//! This library turns a noisy stream of per-frame measurements (eye openness
//! and face size) into a small number of alerts: bad posture, posture
//! warning, face not detected, and low blink rate breaks.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          Posture Monitor                          │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌────────┐   ┌─────────┐   ┌──────────┐   ┌────────┐            │
//! │  │ Source │──▶│  Blink  │──▶│  Minute  │──▶│ Health │──┐         │
//! │  │        │   │Detector │   │ Buckets  │   │        │  │         │
//! │  └────────┘   └─────────┘   └──────────┘   └────────┘  ▼         │
//! │       │       ┌─────────┐   ┌──────────┐          ┌──────────┐   │
//! │       └──────▶│ Posture │──▶│  Frame   │─────────▶│ Debounce │──▶ Sink
//! │               │Classify │   │  Window  │          └──────────┘   │
//! │               └─────────┘   └──────────┘                         │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use posture_monitor::{Config, MonitorEngine, Sample};
//!
//! let mut engine = MonitorEngine::new(Config::default()).unwrap();
//! engine.start(0);
//!
//! let observation = engine.observe(&Sample::face(0, 0.31, 0.12));
//! assert!(observation.alerts.is_empty());
//!
//! let outcome = engine.tick(60_000);
//! assert_eq!(outcome.bucket.unwrap().blink_count, 0);
//! ```

pub mod config;
pub mod core;
pub mod runtime;
pub mod sink;
pub mod source;
pub mod stats;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use crate::core::{
    AlertIntent, AlertKind, MonitorEngine, MonitorStatus, Observation, SharedEngine,
    StartOutcome, TickOutcome,
};
pub use runtime::{Monitor, TickSource};
pub use sink::{AlertSink, JsonLinesSink, LogSink};
pub use source::{ReplaySource, Sample, SourceError};
pub use stats::{SessionStats, SharedSessionStats, StatsSnapshot};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Description of the alerts, shown by `posture-monitor alerts`.
pub const ALERT_GUIDE: &str = r#"
╔══════════════════════════════════════════════════════════════════╗
║                   POSTURE MONITOR - ALERT GUIDE                  ║
╠══════════════════════════════════════════════════════════════════╣
║                                                                  ║
║  bad              Your face fills too much of the frame for      ║
║                   most of the last ~10 seconds. Move back.       ║
║  warning          You are leaning in for most of the window.     ║
║  no_face          No face seen for most of the window.           ║
║  low_blink_micro  Blink rate low two minutes in a row.           ║
║                   Look 20 feet away for 20 seconds.              ║
║  low_blink_macro  Blink rate very low five minutes in a row.     ║
║                   Take a five minute break.                      ║
║                                                                  ║
║  Each alert kind is repeated at most once every 3 seconds.       ║
║  Nothing is stored: all state is dropped when monitoring stops.  ║
║                                                                  ║
╚══════════════════════════════════════════════════════════════════╝
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_guide_lists_every_kind() {
        for kind in [
            AlertKind::BadPosture,
            AlertKind::PostureWarning,
            AlertKind::NoFace,
            AlertKind::LowBlinkMicro,
            AlertKind::LowBlinkMacro,
        ] {
            assert!(ALERT_GUIDE.contains(kind.as_str()), "missing {kind}");
        }
    }
}
