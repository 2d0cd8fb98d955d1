//! Shared helpers for integration tests: an in-memory frame source with
//! scripted content and scripted decode failures.

#![allow(dead_code)]

use std::{collections::HashSet, path::Path};

use image::{Rgb, RgbImage, imageops::FilterType};
use scenesnap::{FrameSource, ScanVisitor, SceneSnapError};

pub const SAMPLE_VIDEO: &str = "tests/fixtures/sample_video.mp4";

/// Path of the sample video fixture, or `None` if it has not been generated.
pub fn sample_video() -> Option<&'static Path> {
    let path = Path::new(SAMPLE_VIDEO);
    path.exists().then_some(path)
}

/// Solid-colour video whose colour changes at scripted frames.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    width: u32,
    height: u32,
    frame_count: u64,
    frame_rate: f64,
    /// `(first_frame, colour)`, sorted by frame.
    segments: Vec<(u64, [u8; 3])>,
    failing: HashSet<u64>,
    /// Frames the sequential scan covers, when it differs from the
    /// declared frame count.
    scanned_frames: Option<u64>,
    pub closed: bool,
    pub close_calls: u32,
    pub scan_calls: u32,
    pub seeks: Vec<u64>,
}

impl SyntheticSource {
    /// A single-colour video.
    pub fn new(frame_count: u64, frame_rate: f64) -> Self {
        Self {
            width: 64,
            height: 36,
            frame_count,
            frame_rate,
            segments: vec![(0, [16, 16, 16])],
            failing: HashSet::new(),
            scanned_frames: None,
            closed: false,
            close_calls: 0,
            scan_calls: 0,
            seeks: Vec::new(),
        }
    }

    /// Switch to `colour` from `frame` onwards.
    pub fn cut_at(mut self, frame: u64, colour: [u8; 3]) -> Self {
        self.segments.push((frame, colour));
        self.segments.sort_by_key(|(start, _)| *start);
        self
    }

    /// Make `seek_and_decode` fail for these frames. The sequential scan
    /// still sees them.
    pub fn failing_seeks(mut self, frames: impl IntoIterator<Item = u64>) -> Self {
        self.failing.extend(frames);
        self
    }

    /// Let the scan run over `frames` frames regardless of the declared
    /// frame count, like a container whose count is only an estimate.
    pub fn scanning(mut self, frames: u64) -> Self {
        self.scanned_frames = Some(frames);
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    fn render(&self, frame_number: u64) -> RgbImage {
        let colour = self
            .segments
            .iter()
            .rev()
            .find(|(start, _)| *start <= frame_number)
            .map_or([0, 0, 0], |(_, colour)| *colour);
        RgbImage::from_pixel(self.width, self.height, Rgb(colour))
    }
}

impl FrameSource for SyntheticSource {
    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn seek_and_decode(&mut self, frame_number: u64) -> Result<RgbImage, SceneSnapError> {
        if self.closed {
            return Err(SceneSnapError::VideoDecode("source is closed".to_string()));
        }
        if frame_number >= self.frame_count {
            return Err(SceneSnapError::FrameOutOfRange {
                frame_number,
                total_frames: self.frame_count,
            });
        }
        self.seeks.push(frame_number);
        if self.failing.contains(&frame_number) {
            return Err(SceneSnapError::VideoDecode(format!(
                "corrupt group of pictures at {frame_number}"
            )));
        }
        Ok(self.render(frame_number))
    }

    fn scan(&mut self, max_width: u32, visitor: &mut ScanVisitor<'_>) -> Result<u64, SceneSnapError> {
        self.scan_calls += 1;
        let scanned = self.scanned_frames.unwrap_or(self.frame_count);
        for frame_number in 0..scanned {
            let image = self.render(frame_number);
            let width = max_width.min(self.width).max(1);
            let height = ((u64::from(self.height) * u64::from(width)) / u64::from(self.width)).max(1) as u32;
            let scaled = image::imageops::resize(&image, width, height, FilterType::Triangle);
            visitor(frame_number, &scaled)?;
        }
        Ok(scanned)
    }

    fn close(&mut self) {
        self.closed = true;
        self.close_calls += 1;
    }
}

/// A frame source that produces nothing at all despite claiming frames.
#[derive(Debug, Default)]
pub struct UndecodableSource {
    pub frame_count: u64,
    pub closed: bool,
}

impl FrameSource for UndecodableSource {
    fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn frame_rate(&self) -> f64 {
        30.0
    }

    fn seek_and_decode(&mut self, frame_number: u64) -> Result<RgbImage, SceneSnapError> {
        Err(SceneSnapError::VideoDecode(format!("frame {frame_number} is unreadable")))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
