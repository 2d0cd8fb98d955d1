//! Representative frame selection.
//!
//! [`FrameSelector`] turns either a scene list or a fixed time stride into
//! the ordered frame indices that will be materialized. Every selection is
//! strictly increasing, duplicate-free, and bounded by the frame count.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::detector::Scene;
use crate::error::SceneSnapError;

/// How representative frames are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// The first frame of every detected scene.
    #[default]
    Scene,
    /// One frame every N seconds, starting at frame 0.
    Interval,
}

impl SelectionMode {
    /// Lowercase name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            SelectionMode::Scene => "scene",
            SelectionMode::Interval => "interval",
        }
    }
}

impl Display for SelectionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for SelectionMode {
    type Err = SceneSnapError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "scene" | "scenes" => Ok(SelectionMode::Scene),
            "interval" => Ok(SelectionMode::Interval),
            other => Err(SceneSnapError::Configuration(format!(
                "unknown selection mode '{other}' (expected 'scene' or 'interval')"
            ))),
        }
    }
}

/// Chooses which frame indices to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSelector {
    mode: SelectionMode,
    interval_seconds: u32,
}

impl FrameSelector {
    /// Create a selector. `interval_seconds` only matters in interval mode.
    pub fn new(mode: SelectionMode, interval_seconds: u32) -> Self {
        Self {
            mode,
            interval_seconds,
        }
    }

    /// The mode this selector applies.
    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Select frames for a source of `frame_count` frames at `frame_rate`.
    ///
    /// `scenes` is only consulted in scene mode.
    pub fn select(&self, scenes: &[Scene], frame_rate: f64, frame_count: u64) -> Vec<u64> {
        let selected = match self.mode {
            SelectionMode::Scene => scene_starts(scenes, frame_count),
            SelectionMode::Interval => {
                interval_indices(frame_rate, self.interval_seconds, frame_count)
            }
        };
        log::debug!(
            "Selected {} frame(s) in {} mode",
            selected.len(),
            self.mode
        );
        selected
    }
}

/// First frame of each scene, ascending, deduplicated, and `< frame_count`.
pub fn scene_starts(scenes: &[Scene], frame_count: u64) -> Vec<u64> {
    let mut starts: Vec<u64> = scenes
        .iter()
        .map(|scene| scene.start_frame)
        .filter(|&start| start < frame_count)
        .collect();
    starts.sort_unstable();
    starts.dedup();
    starts
}

/// Frames `0, k, 2k, ...` below `frame_count`, where
/// `k = round(frame_rate) * interval_seconds`.
///
/// A stride that rounds to zero (missing or tiny frame rate) is treated as
/// one.
pub fn interval_indices(frame_rate: f64, interval_seconds: u32, frame_count: u64) -> Vec<u64> {
    let rounded_rate = if frame_rate.is_finite() && frame_rate > 0.0 {
        frame_rate.round() as u64
    } else {
        0
    };
    let step = rounded_rate
        .saturating_mul(u64::from(interval_seconds))
        .max(1);

    (0..frame_count).step_by(usize::try_from(step).unwrap_or(usize::MAX)).collect()
}
