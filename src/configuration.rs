//! Extraction configuration.
//!
//! [`ExtractOptions`] is a builder that carries the selection mode,
//! detector sensitivity, interval stride, output quality, and a progress
//! callback into [`ExtractionPipeline`](crate::ExtractionPipeline).
//!
//! # Example
//!
//! ```
//! use scenesnap::{ExtractOptions, SelectionMode};
//!
//! let options = ExtractOptions::new()
//!     .with_mode(SelectionMode::Interval)
//!     .with_interval_seconds(10)
//!     .with_jpeg_quality(85);
//! assert!(options.validate().is_ok());
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::error::SceneSnapError;
use crate::progress::{NoOpProgress, ProgressCallback};
use crate::selector::SelectionMode;

/// Default content-change threshold on the `0..=255` score scale.
pub const DEFAULT_THRESHOLD: f64 = 30.0;
/// Default stride for interval mode, in seconds.
pub const DEFAULT_INTERVAL_SECONDS: u32 = 5;
/// Default minimum distance between two cuts, in frames.
pub const DEFAULT_MIN_SCENE_LEN: u64 = 15;
/// Default width frames are scaled down to for boundary detection.
pub const DEFAULT_ANALYSIS_WIDTH: u32 = 256;
/// Default JPEG quality of extracted frames.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Options for one extraction.
///
/// All fields have defaults; [`validate`](ExtractOptions::validate) is
/// called by the pipeline before any file is touched.
#[derive(Clone)]
#[must_use]
pub struct ExtractOptions {
    pub(crate) mode: SelectionMode,
    pub(crate) threshold: f64,
    pub(crate) interval_seconds: u32,
    pub(crate) min_scene_len: u64,
    pub(crate) analysis_width: u32,
    pub(crate) jpeg_quality: u8,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    /// How often to fire the progress callback (every N items).
    pub(crate) batch_size: u64,
}

impl Debug for ExtractOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ExtractOptions")
            .field("mode", &self.mode)
            .field("threshold", &self.threshold)
            .field("interval_seconds", &self.interval_seconds)
            .field("min_scene_len", &self.min_scene_len)
            .field("analysis_width", &self.analysis_width)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractOptions {
    /// Scene mode, threshold 30, 5 s interval, 15-frame minimum scene,
    /// 256 px analysis width, JPEG quality 95, no progress callback.
    pub fn new() -> Self {
        Self {
            mode: SelectionMode::Scene,
            threshold: DEFAULT_THRESHOLD,
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
            min_scene_len: DEFAULT_MIN_SCENE_LEN,
            analysis_width: DEFAULT_ANALYSIS_WIDTH,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            progress: Arc::new(NoOpProgress),
            batch_size: 1,
        }
    }

    /// Choose between one frame per scene and one frame per interval.
    pub fn with_mode(mut self, mode: SelectionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Content-change score a frame must exceed to start a new scene.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Stride of interval mode, in seconds.
    pub fn with_interval_seconds(mut self, seconds: u32) -> Self {
        self.interval_seconds = seconds;
        self
    }

    /// Minimum number of frames between two cuts. `0` disables the check.
    pub fn with_min_scene_len(mut self, frames: u64) -> Self {
        self.min_scene_len = frames;
        self
    }

    /// Width frames are downscaled to before computing content signals.
    pub fn with_analysis_width(mut self, width: u32) -> Self {
        self.analysis_width = width;
        self
    }

    /// JPEG quality (1–100) of saved frames.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Attach a progress callback.
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Fire the progress callback every `size` items. Clamped to at least 1.
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn interval_seconds(&self) -> u32 {
        self.interval_seconds
    }

    pub fn min_scene_len(&self) -> u64 {
        self.min_scene_len
    }

    pub fn analysis_width(&self) -> u32 {
        self.analysis_width
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }

    /// Check every option is within range.
    ///
    /// # Errors
    ///
    /// [`SceneSnapError::Configuration`] naming the first offending option.
    pub fn validate(&self) -> Result<(), SceneSnapError> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(SceneSnapError::Configuration(format!(
                "threshold must be a finite, non-negative number (got {})",
                self.threshold
            )));
        }
        if self.interval_seconds == 0 {
            return Err(SceneSnapError::Configuration(
                "interval must be at least one second".to_string(),
            ));
        }
        if self.analysis_width == 0 {
            return Err(SceneSnapError::Configuration(
                "analysis width must be greater than zero".to_string(),
            ));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(SceneSnapError::Configuration(format!(
                "JPEG quality must be between 1 and 100 (got {})",
                self.jpeg_quality
            )));
        }
        Ok(())
    }
}
