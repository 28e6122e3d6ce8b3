//! Per-kind alert cooldown.

use crate::core::alert::AlertKind;
use std::collections::HashMap;
use std::time::Duration;

/// Lets an alert kind through at most once per cooldown interval.
#[derive(Debug, Clone)]
pub struct AlertDebouncer {
    cooldown_ms: i64,
    last_emitted: HashMap<AlertKind, i64>,
}

impl AlertDebouncer {
    /// Create a debouncer that has emitted nothing yet.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown_ms: cooldown.as_millis() as i64,
            last_emitted: HashMap::new(),
        }
    }

    /// Returns true and records `now` when `kind` may be emitted.
    ///
    /// A `now` earlier than the last emission of `kind` is suppressed
    /// without touching the recorded time.
    pub fn try_emit(&mut self, kind: AlertKind, now: i64) -> bool {
        if let Some(&last) = self.last_emitted.get(&kind) {
            if now < last || now - last < self.cooldown_ms {
                return false;
            }
        }
        self.last_emitted.insert(kind, now);
        true
    }

    /// When `kind` was last let through.
    pub fn last_emitted(&self, kind: AlertKind) -> Option<i64> {
        self.last_emitted.get(&kind).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debouncer() -> AlertDebouncer {
        AlertDebouncer::new(Duration::from_millis(3000))
    }

    #[test]
    fn test_within_cooldown_is_suppressed() {
        let mut d = debouncer();
        assert!(d.try_emit(AlertKind::BadPosture, 1_000));
        assert!(!d.try_emit(AlertKind::BadPosture, 3_999));
        assert_eq!(d.last_emitted(AlertKind::BadPosture), Some(1_000));
    }

    #[test]
    fn test_cooldown_boundary_passes() {
        let mut d = debouncer();
        assert!(d.try_emit(AlertKind::BadPosture, 1_000));
        assert!(d.try_emit(AlertKind::BadPosture, 4_000));
    }

    #[test]
    fn test_kinds_are_independent() {
        let mut d = debouncer();
        assert!(d.try_emit(AlertKind::LowBlinkMicro, 0));
        assert!(d.try_emit(AlertKind::LowBlinkMacro, 0));
        assert!(d.try_emit(AlertKind::NoFace, 10));
        assert!(!d.try_emit(AlertKind::LowBlinkMicro, 10));
    }

    #[test]
    fn test_regressing_clock_is_suppressed() {
        let mut d = debouncer();
        assert!(d.try_emit(AlertKind::PostureWarning, 10_000));
        assert!(!d.try_emit(AlertKind::PostureWarning, 2_000));
        assert_eq!(d.last_emitted(AlertKind::PostureWarning), Some(10_000));
    }
}
