//! Alert intents handed to the alert sink.

use serde::{Deserialize, Serialize};

/// The distinct kinds of alert. Each kind is debounced independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Face too close to the screen for most of the window
    BadPosture,
    /// Face closer than comfortable for most of the window
    PostureWarning,
    /// No face found for most of the window
    NoFace,
    /// Blink rate low for a short streak of minutes
    LowBlinkMicro,
    /// Blink rate very low for a long streak of minutes
    LowBlinkMacro,
}

impl AlertKind {
    /// Stable short name, used as the debounce key in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::BadPosture => "bad",
            AlertKind::PostureWarning => "warning",
            AlertKind::NoFace => "no_face",
            AlertKind::LowBlinkMicro => "low_blink_micro",
            AlertKind::LowBlinkMacro => "low_blink_macro",
        }
    }
}

impl std::fmt::Display for AlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How urgently the sink should present an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// A break suggestion derived from the blink rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakSeverity {
    Micro,
    Macro,
}

/// An alert that has passed the debouncer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertIntent {
    pub kind: AlertKind,
    pub severity: Severity,
    pub title: String,
    pub message: String,
    /// Suggested break length, only set for blink-rate alerts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_duration_sec: Option<u32>,
    /// Engine time at which the alert was raised
    pub timestamp_ms: i64,
}

impl AlertIntent {
    pub fn bad_posture(timestamp_ms: i64) -> Self {
        Self {
            kind: AlertKind::BadPosture,
            severity: Severity::Critical,
            title: "Bad posture".to_string(),
            message: "You are too close to the screen - move back from the screen!".to_string(),
            suggested_duration_sec: None,
            timestamp_ms,
        }
    }

    pub fn posture_warning(timestamp_ms: i64) -> Self {
        Self {
            kind: AlertKind::PostureWarning,
            severity: Severity::Warning,
            title: "Posture warning".to_string(),
            message: "You are leaning toward the screen - adjust your posture.".to_string(),
            suggested_duration_sec: None,
            timestamp_ms,
        }
    }

    pub fn no_face(timestamp_ms: i64) -> Self {
        Self {
            kind: AlertKind::NoFace,
            severity: Severity::Info,
            title: "Face not detected".to_string(),
            message: "Face not detected - make sure you are in front of the camera.".to_string(),
            suggested_duration_sec: None,
            timestamp_ms,
        }
    }

    /// Blink-rate break alert.
    pub fn blink_break(
        severity: BreakSeverity,
        message: String,
        duration_sec: u32,
        timestamp_ms: i64,
    ) -> Self {
        let (kind, level, title) = match severity {
            BreakSeverity::Micro => (AlertKind::LowBlinkMicro, Severity::Warning, "Low blink rate"),
            BreakSeverity::Macro => (
                AlertKind::LowBlinkMacro,
                Severity::Critical,
                "Very low blink rate",
            ),
        };
        Self {
            kind,
            severity: level,
            title: title.to_string(),
            message,
            suggested_duration_sec: Some(duration_sec),
            timestamp_ms,
        }
    }
}
