//! Blink health evaluation over closed minute buckets.
//!
//! Each closed bucket is classified as very low, low or normal and extends
//! or resets two streak counters. A break intent fires when a streak reaches
//! its length exactly, so a single fatigue episode yields each break once; a
//! later episode has to build its streak up from zero again.

use crate::config::HealthConfig;
use crate::core::alert::BreakSeverity;
use crate::core::rate::MinuteBucket;
use serde::{Deserialize, Serialize};

/// Blink rate class of a single minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLevel {
    VeryLow,
    Low,
    Normal,
}

/// Consecutive low-minute streaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStreakState {
    pub consecutive_low_minutes: u32,
    pub consecutive_very_low_minutes: u32,
}

/// A suggested break.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakIntent {
    pub severity: BreakSeverity,
    pub message: String,
    pub suggested_duration_sec: u32,
}

#[derive(Debug, Clone)]
pub struct BlinkHealthEvaluator {
    config: HealthConfig,
    streaks: HealthStreakState,
}

impl BlinkHealthEvaluator {
    /// Create an evaluator with both streaks at zero.
    pub fn new(config: &HealthConfig) -> Self {
        Self {
            config: config.clone(),
            streaks: HealthStreakState::default(),
        }
    }

    /// Rate level of a minute with `blink_count` blinks.
    pub fn classify(&self, blink_count: u32) -> RateLevel {
        if blink_count <= self.config.very_low_max {
            RateLevel::VeryLow
        } else if blink_count <= self.config.low_max {
            RateLevel::Low
        } else {
            RateLevel::Normal
        }
    }

    /// Update the streaks with the newest bucket and return any breaks due.
    pub fn evaluate(&mut self, latest: &MinuteBucket) -> Vec<BreakIntent> {
        let level = self.classify(latest.blink_count);
        let streaks = &mut self.streaks;
        match level {
            RateLevel::VeryLow => {
                streaks.consecutive_low_minutes += 1;
                streaks.consecutive_very_low_minutes += 1;
            }
            RateLevel::Low => {
                streaks.consecutive_low_minutes += 1;
                streaks.consecutive_very_low_minutes = 0;
            }
            RateLevel::Normal => {
                *streaks = HealthStreakState::default();
            }
        }

        let mut intents = Vec::new();
        if self.streaks.consecutive_low_minutes == self.config.micro_streak {
            intents.push(BreakIntent {
                severity: BreakSeverity::Micro,
                message: format!(
                    "Your blink rate has been low for {} minutes. Look at something 20 feet away for {} seconds.",
                    self.config.micro_streak, self.config.micro_break_secs
                ),
                suggested_duration_sec: self.config.micro_break_secs,
            });
        }
        if self.streaks.consecutive_very_low_minutes == self.config.macro_streak {
            intents.push(BreakIntent {
                severity: BreakSeverity::Macro,
                message: format!(
                    "Your blink rate has been very low for {} minutes. Take a {} break away from the screen.",
                    self.config.macro_streak,
                    break_length(self.config.macro_break_secs)
                ),
                suggested_duration_sec: self.config.macro_break_secs,
            });
        }
        intents
    }

    /// Current streak counters.
    pub fn streaks(&self) -> HealthStreakState {
        self.streaks
    }
}

/// "5 minute" for whole minutes, "90 second" otherwise.
fn break_length(secs: u32) -> String {
    if secs >= 60 && secs % 60 == 0 {
        format!("{} minute", secs / 60)
    } else {
        format!("{secs} second")
    }
}
