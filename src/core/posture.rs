//! Posture and presence monitoring.
//!
//! Every frame is classified from the face-size ratio (a proxy for screen
//! distance) and pushed into a fixed-capacity frame window. The window is
//! re-evaluated after every frame.
//!
//! The window length is a frame count, not a duration: eviction is strictly
//! first in, first out by arrival. When the frame rate drops, the window
//! covers a longer stretch of time.

use crate::config::PostureConfig;
use crate::source::types::Sample;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Classification of a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostureClass {
    Bad,
    Warning,
    Ok,
    NoFace,
}

impl PostureClass {
    fn index(self) -> usize {
        match self {
            PostureClass::Bad => 0,
            PostureClass::Warning => 1,
            PostureClass::Ok => 2,
            PostureClass::NoFace => 3,
        }
    }
}

/// Which posture rule the window currently satisfies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostureAlert {
    Bad,
    Warning,
    NoFace,
}

/// Share of the window taken by each class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PostureFractions {
    pub bad: f64,
    pub warning: f64,
    pub ok: f64,
    pub no_face: f64,
    pub frames: usize,
}

/// Classifies frames by smoothed face size.
#[derive(Debug, Clone)]
pub struct PostureClassifier {
    distance_threshold: f64,
    warning_threshold: f64,
    smoothing_frames: usize,
    face_sizes: VecDeque<f64>,
}

impl PostureClassifier {
    pub fn new(config: &PostureConfig) -> Self {
        Self {
            distance_threshold: config.distance_threshold,
            warning_threshold: config.distance_threshold * config.warning_ratio,
            smoothing_frames: config.smoothing_frames,
            face_sizes: VecDeque::with_capacity(config.smoothing_frames),
        }
    }

    /// Classify one frame.
    ///
    /// Frames without a face are `NoFace` whatever else they carry. A face
    /// without a usable size is judged from the sizes seen so far.
    pub fn classify(&mut self, sample: &Sample) -> PostureClass {
        if !sample.face_detected {
            return PostureClass::NoFace;
        }
        if let Some(size) = sample.face_size() {
            if self.face_sizes.len() == self.smoothing_frames {
                self.face_sizes.pop_front();
            }
            self.face_sizes.push_back(size);
        }

        match self.smoothed_face_size() {
            Some(size) if size > self.distance_threshold => PostureClass::Bad,
            Some(size) if size > self.warning_threshold => PostureClass::Warning,
            _ => PostureClass::Ok,
        }
    }

    /// Mean of the recent face sizes.
    pub fn smoothed_face_size(&self) -> Option<f64> {
        if self.face_sizes.is_empty() {
            return None;
        }
        Some(self.face_sizes.iter().sum::<f64>() / self.face_sizes.len() as f64)
    }
}

/// Fixed-capacity FIFO of frame classifications with running counts.
#[derive(Debug, Clone)]
pub struct PostureWindow {
    capacity: usize,
    frames: VecDeque<PostureClass>,
    counts: [usize; 4],
}

impl PostureWindow {
    /// Create an empty window holding at most `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            frames: VecDeque::with_capacity(capacity),
            counts: [0; 4],
        }
    }

    /// Append a frame, evicting the oldest once the window is full.
    pub fn push(&mut self, class: PostureClass) {
        if self.frames.len() == self.capacity {
            if let Some(evicted) = self.frames.pop_front() {
                self.counts[evicted.index()] -= 1;
            }
        }
        self.frames.push_back(class);
        self.counts[class.index()] += 1;
    }

    /// Frames of `class` currently in the window.
    pub fn count(&self, class: PostureClass) -> usize {
        self.counts[class.index()]
    }

    /// Frames currently in the window.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() == self.capacity
    }

    /// Share of each class in the window.
    pub fn fractions(&self) -> PostureFractions {
        let total = self.frames.len();
        if total == 0 {
            return PostureFractions::default();
        }
        let share = |class| self.count(class) as f64 / total as f64;
        PostureFractions {
            bad: share(PostureClass::Bad),
            warning: share(PostureClass::Warning),
            ok: share(PostureClass::Ok),
            no_face: share(PostureClass::NoFace),
            frames: total,
        }
    }
}

/// Applies the percentage rules to the frame window.
#[derive(Debug, Clone)]
pub struct PostureAggregator {
    window: PostureWindow,
    bad_fraction: f64,
    warning_fraction: f64,
    no_face_fraction: f64,
}

impl PostureAggregator {
    pub fn new(config: &PostureConfig) -> Self {
        Self {
            window: PostureWindow::new(config.window_capacity),
            bad_fraction: config.bad_fraction,
            warning_fraction: config.warning_fraction,
            no_face_fraction: config.no_face_fraction,
        }
    }

    /// Record a frame and evaluate the window.
    ///
    /// Rules are checked in priority order bad, warning, no face; at most one
    /// alert is returned.
    pub fn record_frame(&mut self, class: PostureClass) -> Option<PostureAlert> {
        self.window.push(class);
        self.evaluate()
    }

    /// Alert for the current window, without recording a frame.
    pub fn evaluate(&self) -> Option<PostureAlert> {
        if self.window.is_empty() {
            return None;
        }
        let f = self.window.fractions();
        if f.bad > self.bad_fraction {
            Some(PostureAlert::Bad)
        } else if f.bad + f.warning > self.warning_fraction {
            Some(PostureAlert::Warning)
        } else if f.no_face > self.no_face_fraction {
            Some(PostureAlert::NoFace)
        } else {
            None
        }
    }

    pub fn window(&self) -> &PostureWindow {
        &self.window
    }
}
