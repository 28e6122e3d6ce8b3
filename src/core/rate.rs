//! Per-minute blink rate aggregation.
//!
//! Blinks are counted into the open bucket until the next tick closes it.
//! Closed buckets are kept in insertion order and purged once they fall out
//! of the retention window.

use crate::config::RateConfig;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::VecDeque;

/// One closed bucket of blink counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinuteBucket {
    /// Tick time that closed the bucket
    pub timestamp_ms: i64,
    pub blink_count: u32,
}

/// Blink rate over the retention window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BlinkStats {
    pub avg_per_minute: f64,
    pub std_dev_per_minute: f64,
    /// Number of buckets that contributed; zero means "no data yet"
    pub minute_count: usize,
}

/// Counts blinks into buckets and keeps a bounded history of them.
#[derive(Debug, Clone)]
pub struct BlinkRateAggregator {
    retention_ms: i64,
    live_count: u32,
    history: VecDeque<MinuteBucket>,
}

impl BlinkRateAggregator {
    /// Create an aggregator with an empty history.
    pub fn new(config: &RateConfig) -> Self {
        Self {
            retention_ms: config.retention.as_millis() as i64,
            live_count: 0,
            history: VecDeque::new(),
        }
    }

    /// Count one blink into the open bucket.
    pub fn record_blink(&mut self) {
        self.live_count = self.live_count.saturating_add(1);
    }

    /// Close the open bucket at `now`.
    ///
    /// Returns `None` when `now` is not after the last closed bucket; the
    /// tick is dropped and the open bucket keeps counting.
    pub fn tick(&mut self, now: i64) -> Option<MinuteBucket> {
        if self.history.back().is_some_and(|last| now <= last.timestamp_ms) {
            return None;
        }

        let bucket = MinuteBucket {
            timestamp_ms: now,
            blink_count: self.live_count,
        };
        self.history.push_back(bucket);
        self.live_count = 0;
        self.purge(now);

        Some(bucket)
    }

    /// Average blinks per minute over buckets still inside the retention window.
    pub fn stats_over_window(&self, now: i64) -> BlinkStats {
        let counts: Vec<f64> = self
            .history
            .iter()
            .filter(|b| now - b.timestamp_ms <= self.retention_ms)
            .map(|b| b.blink_count as f64)
            .collect();

        if counts.is_empty() {
            return BlinkStats::default();
        }

        let std_dev_per_minute = if counts.len() >= 2 {
            counts.iter().std_dev()
        } else {
            0.0
        };

        BlinkStats {
            avg_per_minute: counts.iter().mean(),
            std_dev_per_minute,
            minute_count: counts.len(),
        }
    }

    /// Drop buckets older than the retention window, oldest first.
    pub fn purge(&mut self, now: i64) {
        while let Some(front) = self.history.front() {
            if now - front.timestamp_ms > self.retention_ms {
                self.history.pop_front();
            } else {
                break;
            }
        }
    }

    /// Blinks counted in the still-open bucket.
    pub fn current_count(&self) -> u32 {
        self.live_count
    }

    /// Closed buckets, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &MinuteBucket> {
        self.history.iter()
    }

    /// Number of closed buckets retained.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Most recently closed bucket.
    pub fn latest(&self) -> Option<&MinuteBucket> {
        self.history.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const MINUTE: i64 = 60_000;

    fn aggregator() -> BlinkRateAggregator {
        BlinkRateAggregator::new(&RateConfig {
            bucket_period: Duration::from_secs(60),
            retention: Duration::from_secs(30 * 60),
        })
    }

    #[test]
    fn test_tick_closes_bucket() {
        let mut agg = aggregator();
        for _ in 0..14 {
            agg.record_blink();
        }
        let bucket = agg.tick(MINUTE).unwrap();
        assert_eq!(bucket.blink_count, 14);
        assert_eq!(agg.current_count(), 0);
        assert_eq!(agg.latest(), Some(&bucket));
    }

    #[test]
    fn test_empty_history_reports_no_data() {
        let agg = aggregator();
        let stats = agg.stats_over_window(0);
        assert_eq!(stats.minute_count, 0);
        assert_eq!(stats.avg_per_minute, 0.0);
    }

    #[test]
    fn test_average_over_window() {
        let mut agg = aggregator();
        for (minute, count) in [10, 20, 15].into_iter().enumerate() {
            for _ in 0..count {
                agg.record_blink();
            }
            agg.tick((minute as i64 + 1) * MINUTE);
        }
        let stats = agg.stats_over_window(3 * MINUTE);
        assert_eq!(stats.minute_count, 3);
        assert!((stats.avg_per_minute - 15.0).abs() < 1e-9);
        assert!((stats.std_dev_per_minute - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_history_never_exceeds_retention() {
        let mut agg = aggregator();
        let mut now = 0;
        // Irregular tick spacing, including gaps longer than the window.
        for step in [60_000, 59_000, 61_000, 45 * MINUTE, 1, 60_000].iter().cycle().take(200) {
            now += step;
            agg.tick(now);
            assert!(agg.history().all(|b| now - b.timestamp_ms <= 30 * MINUTE));
        }
        assert!(agg.history_len() <= 31);
    }

    #[test]
    fn test_bucket_exactly_at_retention_is_kept() {
        let mut agg = aggregator();
        agg.tick(MINUTE);
        agg.tick(MINUTE + 30 * MINUTE);
        assert_eq!(agg.history_len(), 2);
        agg.tick(MINUTE + 30 * MINUTE + 1);
        assert_eq!(agg.history_len(), 2);
    }

    #[test]
    fn test_regressing_tick_is_dropped() {
        let mut agg = aggregator();
        agg.tick(2 * MINUTE);
        agg.record_blink();
        assert!(agg.tick(MINUTE).is_none());
        assert!(agg.tick(2 * MINUTE).is_none());
        assert_eq!(agg.current_count(), 1);
        assert_eq!(agg.history_len(), 1);
    }
}
