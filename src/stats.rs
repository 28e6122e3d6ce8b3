//! Run statistics.
//!
//! Counts what a monitoring run has processed and emitted. Counters reset
//! with every new session and are never written to disk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Counters for the current session.
#[derive(Debug)]
pub struct SessionStats {
    samples_processed: AtomicU64,
    samples_out_of_order: AtomicU64,
    blinks_detected: AtomicU64,
    minutes_closed: AtomicU64,
    alerts_emitted: AtomicU64,
    alerts_suppressed: AtomicU64,
    session_start: Mutex<DateTime<Utc>>,
}

impl SessionStats {
    /// Create zeroed counters starting now.
    pub fn new() -> Self {
        Self {
            samples_processed: AtomicU64::new(0),
            samples_out_of_order: AtomicU64::new(0),
            blinks_detected: AtomicU64::new(0),
            minutes_closed: AtomicU64::new(0),
            alerts_emitted: AtomicU64::new(0),
            alerts_suppressed: AtomicU64::new(0),
            session_start: Mutex::new(Utc::now()),
        }
    }

    /// Record a processed sample.
    pub fn record_sample(&self) {
        self.samples_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a sample that arrived behind the newest one.
    pub fn record_out_of_order(&self) {
        self.samples_out_of_order.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an accepted blink.
    pub fn record_blink(&self) {
        self.blinks_detected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a closed minute bucket.
    pub fn record_minute(&self) {
        self.minutes_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record alerts delivered and alerts held back by the cooldown.
    pub fn record_alerts(&self, emitted: usize, suppressed: usize) {
        self.alerts_emitted
            .fetch_add(emitted as u64, Ordering::Relaxed);
        self.alerts_suppressed
            .fetch_add(suppressed as u64, Ordering::Relaxed);
    }

    fn session_start(&self) -> DateTime<Utc> {
        match self.session_start.lock() {
            Ok(start) => *start,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Get the current statistics.
    pub fn stats(&self) -> StatsSnapshot {
        let session_start = self.session_start();
        StatsSnapshot {
            samples_processed: self.samples_processed.load(Ordering::Relaxed),
            samples_out_of_order: self.samples_out_of_order.load(Ordering::Relaxed),
            blinks_detected: self.blinks_detected.load(Ordering::Relaxed),
            minutes_closed: self.minutes_closed.load(Ordering::Relaxed),
            alerts_emitted: self.alerts_emitted.load(Ordering::Relaxed),
            alerts_suppressed: self.alerts_suppressed.load(Ordering::Relaxed),
            session_start,
            session_duration_secs: (Utc::now() - session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Samples processed: {}\n\
             - Samples out of order: {}\n\
             - Blinks detected: {}\n\
             - Minutes closed: {}\n\
             - Alerts emitted: {}\n\
             - Alerts suppressed: {}\n\
             - Session duration: {} seconds",
            stats.samples_processed,
            stats.samples_out_of_order,
            stats.blinks_detected,
            stats.minutes_closed,
            stats.alerts_emitted,
            stats.alerts_suppressed,
            stats.session_duration_secs
        )
    }

    /// Reset all counters and restart the session clock.
    pub fn reset(&self) {
        self.samples_processed.store(0, Ordering::Relaxed);
        self.samples_out_of_order.store(0, Ordering::Relaxed);
        self.blinks_detected.store(0, Ordering::Relaxed);
        self.minutes_closed.store(0, Ordering::Relaxed);
        self.alerts_emitted.store(0, Ordering::Relaxed);
        self.alerts_suppressed.store(0, Ordering::Relaxed);
        match self.session_start.lock() {
            Ok(mut start) => *start = Utc::now(),
            Err(poisoned) => *poisoned.into_inner() = Utc::now(),
        }
    }
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the session statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub samples_processed: u64,
    pub samples_out_of_order: u64,
    pub blinks_detected: u64,
    pub minutes_closed: u64,
    pub alerts_emitted: u64,
    pub alerts_suppressed: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Thread-safe shared statistics.
pub type SharedSessionStats = Arc<SessionStats>;

/// Create new shared statistics.
pub fn create_shared_stats() -> SharedSessionStats {
    Arc::new(SessionStats::new())
}
