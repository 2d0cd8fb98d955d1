//! Scene boundary detection.
//!
//! [`SceneBoundaryDetector`] consumes frames in increasing order and emits a
//! boundary whenever the [content-change score](crate::ContentSignal::change_score)
//! against the previous frame exceeds the threshold. Only the previous
//! frame's signal is retained, so memory use does not grow with video
//! length. [`detect_scenes`] drives a detector over one sequential scan of a
//! [`FrameSource`].
//!
//! # Example
//!
//! ```no_run
//! use scenesnap::{ExtractOptions, SceneSnapError, VideoSource, detect_scenes};
//!
//! let mut source = VideoSource::open("input.mp4")?;
//! let scenes = detect_scenes(&mut source, &ExtractOptions::new())?;
//! for scene in &scenes {
//!     println!("frames {}..{}", scene.start_frame, scene.end_frame);
//! }
//! # Ok::<(), SceneSnapError>(())
//! ```

use std::time::Duration;

use image::RgbImage;

use crate::configuration::ExtractOptions;
use crate::error::SceneSnapError;
use crate::progress::{OperationType, ProgressTracker};
use crate::signal::ContentSignal;
use crate::source::FrameSource;

/// Score assigned when consecutive frames cannot be compared (the stream
/// changed resolution): the maximum of the score scale.
const INCOMPARABLE_SCORE: f64 = 255.0;

/// A half-open frame interval `[start_frame, end_frame)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scene {
    /// First frame of the scene.
    pub start_frame: u64,
    /// One past the last frame of the scene.
    pub end_frame: u64,
}

impl Scene {
    /// Number of frames in the scene.
    pub fn len(&self) -> u64 {
        self.end_frame - self.start_frame
    }

    pub fn is_empty(&self) -> bool {
        self.start_frame == self.end_frame
    }

    /// Timestamp of the first frame at `frames_per_second`.
    pub fn start_time(&self, frames_per_second: f64) -> Duration {
        if frames_per_second > 0.0 {
            Duration::from_secs_f64(self.start_frame as f64 / frames_per_second)
        } else {
            Duration::ZERO
        }
    }
}

/// A detected scene start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneBoundary {
    /// Frame at which the new scene begins.
    pub frame_number: u64,
    /// Content-change score that triggered the cut (`0.0` for frame 0).
    pub score: f64,
}

/// Single-pass content-difference scene detector.
#[derive(Debug, Clone)]
pub struct SceneBoundaryDetector {
    threshold: f64,
    min_scene_len: u64,
    previous: Option<ContentSignal>,
    boundaries: Vec<SceneBoundary>,
    frames_seen: u64,
}

impl SceneBoundaryDetector {
    /// Create a detector.
    ///
    /// A cut is emitted when the score strictly exceeds `threshold` and at
    /// least `min_scene_len` frames have passed since the previous cut.
    pub fn new(threshold: f64, min_scene_len: u64) -> Self {
        Self {
            threshold,
            min_scene_len,
            previous: None,
            boundaries: Vec::new(),
            frames_seen: 0,
        }
    }

    /// Feed the next frame. Returns the boundary it opened, if any.
    ///
    /// Frame numbers must increase; a frame at or before the last seen
    /// boundary cannot open a new one.
    pub fn push(&mut self, frame_number: u64, image: &RgbImage) -> Option<SceneBoundary> {
        self.push_signal(frame_number, ContentSignal::from_image(image))
    }

    /// Feed a precomputed signal. See [`push`](SceneBoundaryDetector::push).
    pub fn push_signal(&mut self, frame_number: u64, signal: ContentSignal) -> Option<SceneBoundary> {
        self.frames_seen = self.frames_seen.max(frame_number + 1);

        let Some(previous) = self.previous.replace(signal) else {
            // The first frame always opens scene 0, even if frame 0 itself
            // failed to decode.
            let boundary = SceneBoundary {
                frame_number: 0,
                score: 0.0,
            };
            self.boundaries.push(boundary);
            return Some(boundary);
        };
        let current = self.previous.as_ref()?;

        let score = previous
            .change_score(current)
            .unwrap_or(INCOMPARABLE_SCORE);
        let last_cut = self.boundaries.last().map_or(0, |b| b.frame_number);

        if score > self.threshold
            && frame_number > last_cut
            && frame_number - last_cut >= self.min_scene_len
        {
            log::debug!("Scene cut at frame {frame_number} (score {score:.2})");
            let boundary = SceneBoundary {
                frame_number,
                score,
            };
            self.boundaries.push(boundary);
            return Some(boundary);
        }
        None
    }

    /// Boundaries found so far, in increasing frame order.
    pub fn boundaries(&self) -> &[SceneBoundary] {
        &self.boundaries
    }

    /// Number of frames covered so far (highest frame number seen + 1).
    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    /// Close the last scene and return the full scene list.
    ///
    /// Empty if no frame was ever pushed.
    pub fn finish(self) -> Vec<Scene> {
        let starts: Vec<u64> = self.boundaries.iter().map(|b| b.frame_number).collect();
        scenes_from_boundaries(&starts, self.frames_seen)
    }
}

/// Turn ordered scene-start indices into contiguous scenes covering
/// `[0, frame_count)`.
///
/// Starts are sorted and deduplicated, starts at or past `frame_count` are
/// dropped, and a start of 0 is implied. Returns an empty list when
/// `frame_count` is 0.
pub fn scenes_from_boundaries(starts: &[u64], frame_count: u64) -> Vec<Scene> {
    if frame_count == 0 {
        return Vec::new();
    }

    let mut starts: Vec<u64> = starts
        .iter()
        .copied()
        .filter(|&start| start < frame_count)
        .collect();
    starts.push(0);
    starts.sort_unstable();
    starts.dedup();

    starts
        .iter()
        .enumerate()
        .map(|(index, &start_frame)| Scene {
            start_frame,
            end_frame: starts.get(index + 1).copied().unwrap_or(frame_count),
        })
        .collect()
}

/// Scan `source` once and split it into scenes.
///
/// Frames are downscaled to the configured analysis width before their
/// signals are computed. A source that yields no frames produces an empty
/// list, not an error.
///
/// # Errors
///
/// Propagates failures of the scan itself (e.g. a closed source).
pub fn detect_scenes<S>(source: &mut S, options: &ExtractOptions) -> Result<Vec<Scene>, SceneSnapError>
where
    S: FrameSource + ?Sized,
{
    log::debug!(
        "Detecting scenes (threshold={}, min_scene_len={}, analysis_width={})",
        options.threshold,
        options.min_scene_len,
        options.analysis_width,
    );

    let mut detector = SceneBoundaryDetector::new(options.threshold, options.min_scene_len);
    let mut tracker = ProgressTracker::new(
        options.progress.clone(),
        OperationType::SceneDetection,
        Some(source.frame_count()).filter(|&count| count > 0),
        options.batch_size,
    );

    let scanned = source.scan(options.analysis_width, &mut |frame_number, image| {
        detector.push(frame_number, image);
        tracker.advance(Some(frame_number));
        Ok(())
    })?;
    tracker.finish();

    let scenes = detector.finish();
    log::info!("Detected {} scene(s) in {scanned} scanned frame(s)", scenes.len());
    Ok(scenes)
}
