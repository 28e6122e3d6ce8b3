//! Per-frame measurement types produced by a signal source.
//!
//! A sample carries only derived scalars; landmark geometry stays with the
//! source that computed them.

use serde::{Deserialize, Serialize};

/// One frame's worth of measurements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Capture time in milliseconds on a monotonic, caller-chosen clock
    pub timestamp_ms: i64,
    /// Eye openness ratio (EAR); `None` when no landmarks were available
    #[serde(default)]
    pub eye_openness: Option<f64>,
    /// Face bounding-box area relative to the frame area
    #[serde(default)]
    pub face_size_ratio: Option<f64>,
    /// Whether a face was found in this frame
    pub face_detected: bool,
}

impl Sample {
    /// A frame with a detected face.
    pub fn face(timestamp_ms: i64, eye_openness: f64, face_size_ratio: f64) -> Self {
        Self {
            timestamp_ms,
            eye_openness: Some(eye_openness),
            face_size_ratio: Some(face_size_ratio),
            face_detected: true,
        }
    }

    /// A frame in which no face was found.
    pub fn no_face(timestamp_ms: i64) -> Self {
        Self {
            timestamp_ms,
            eye_openness: None,
            face_size_ratio: None,
            face_detected: false,
        }
    }

    /// Eye openness, if present and usable.
    pub fn openness(&self) -> Option<f64> {
        self.eye_openness.filter(|v| v.is_finite())
    }

    /// Face-size ratio, if present and usable.
    pub fn face_size(&self) -> Option<f64> {
        self.face_size_ratio.filter(|v| v.is_finite())
    }
}
