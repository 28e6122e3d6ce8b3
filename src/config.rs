//! Configuration for the posture monitor.
//!
//! Every threshold the engine uses lives here. A configuration is validated
//! once, when the engine is constructed; nothing is re-checked at runtime.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for the monitor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Blink state machine bounds
    #[serde(default)]
    pub blink: BlinkConfig,

    /// Per-minute blink aggregation
    #[serde(default)]
    pub rate: RateConfig,

    /// Low blink rate streak thresholds
    #[serde(default)]
    pub health: HealthConfig,

    /// Posture classification and frame window
    #[serde(default)]
    pub posture: PostureConfig,

    /// Alert debouncing
    #[serde(default)]
    pub alerts: AlertConfig,
}

/// Blink detector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlinkConfig {
    /// Eye openness below this value counts as closed
    pub closed_threshold: f64,

    /// Shortest closed interval counted as a blink
    #[serde(with = "duration_ms_serde")]
    pub min_duration: Duration,

    /// Longest closed interval counted as a blink
    #[serde(with = "duration_ms_serde")]
    pub max_duration: Duration,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            closed_threshold: 0.25,
            min_duration: Duration::from_millis(50),
            max_duration: Duration::from_millis(500),
        }
    }
}

/// Blink rate aggregation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateConfig {
    /// Width of one bucket (the tick period)
    #[serde(with = "duration_ms_serde")]
    pub bucket_period: Duration,

    /// How long buckets are retained
    #[serde(with = "duration_ms_serde")]
    pub retention: Duration,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            bucket_period: Duration::from_secs(60),
            retention: Duration::from_secs(30 * 60),
        }
    }
}

/// Blink health thresholds. Counts are inclusive upper bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    pub very_low_max: u32,
    pub low_max: u32,
    /// Low-minute streak length that fires a micro break
    pub micro_streak: u32,
    /// Very-low-minute streak length that fires a macro break
    pub macro_streak: u32,
    pub micro_break_secs: u32,
    pub macro_break_secs: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            very_low_max: 6,
            low_max: 11,
            micro_streak: 2,
            macro_streak: 5,
            micro_break_secs: 20,
            macro_break_secs: 300,
        }
    }
}

/// Posture classifier and frame window settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostureConfig {
    /// Smoothed face-size ratio above this is bad posture (too close)
    pub distance_threshold: f64,
    /// Fraction of `distance_threshold` above which posture is a warning
    pub warning_ratio: f64,
    /// Number of face-size samples averaged per classification
    pub smoothing_frames: usize,
    /// Frame capacity of the posture window (~10s at 30fps)
    pub window_capacity: usize,
    pub bad_fraction: f64,
    pub warning_fraction: f64,
    pub no_face_fraction: f64,
}

impl Default for PostureConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 0.5,
            warning_ratio: 0.75,
            smoothing_frames: 10,
            window_capacity: 300,
            bad_fraction: 0.5,
            warning_fraction: 0.6,
            no_face_fraction: 0.8,
        }
    }
}

/// Alert debouncing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Minimum spacing between two alerts of the same kind
    #[serde(with = "duration_ms_serde")]
    pub cooldown: Duration,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_millis(3000),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(config_path)
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("posture-monitor")
            .join("config.json")
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let blink = &self.blink;
        check_unit("blink.closed_threshold", blink.closed_threshold)?;
        if blink.min_duration >= blink.max_duration {
            return Err(ConfigError::Invalid(format!(
                "blink.min_duration ({}ms) must be shorter than blink.max_duration ({}ms)",
                blink.min_duration.as_millis(),
                blink.max_duration.as_millis()
            )));
        }

        if self.rate.bucket_period.is_zero() {
            return Err(ConfigError::Invalid(
                "rate.bucket_period must be non-zero".to_string(),
            ));
        }
        if self.rate.retention < self.rate.bucket_period {
            return Err(ConfigError::Invalid(
                "rate.retention must cover at least one bucket".to_string(),
            ));
        }

        let health = &self.health;
        if health.very_low_max > health.low_max {
            return Err(ConfigError::Invalid(
                "health.very_low_max must not exceed health.low_max".to_string(),
            ));
        }
        if health.micro_streak == 0 || health.macro_streak == 0 {
            return Err(ConfigError::Invalid(
                "health streak lengths must be at least 1".to_string(),
            ));
        }

        let posture = &self.posture;
        check_unit("posture.distance_threshold", posture.distance_threshold)?;
        check_unit("posture.warning_ratio", posture.warning_ratio)?;
        check_unit("posture.bad_fraction", posture.bad_fraction)?;
        check_unit("posture.warning_fraction", posture.warning_fraction)?;
        check_unit("posture.no_face_fraction", posture.no_face_fraction)?;
        if posture.smoothing_frames == 0 || posture.window_capacity == 0 {
            return Err(ConfigError::Invalid(
                "posture.smoothing_frames and posture.window_capacity must be non-zero"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

fn check_unit(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{name} must be within [0, 1], got {value}"
        )))
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration as whole milliseconds.
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.alerts.cooldown, Duration::from_millis(3000));
        assert_eq!(config.rate.retention, Duration::from_secs(1800));
        assert_eq!(config.posture.window_capacity, 300);
    }

    #[test]
    fn test_rejects_inverted_blink_bounds() {
        let mut config = Config::default();
        config.blink.min_duration = Duration::from_millis(500);
        config.blink.max_duration = Duration::from_millis(500);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_out_of_range_threshold() {
        let mut config = Config::default();
        config.blink.closed_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.posture.bad_fraction = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let mut config = Config::default();
        config.posture.window_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_durations_serialize_as_millis() {
        let config = Config::default();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["alerts"]["cooldown"], 3000);
        assert_eq!(json["blink"]["min_duration"], 50);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"alerts": {"cooldown": 1000}}"#).unwrap();
        assert_eq!(config.alerts.cooldown, Duration::from_millis(1000));
        assert_eq!(config.health.low_max, 11);
    }
}
