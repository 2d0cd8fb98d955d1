//! Video stream metadata.
//!
//! Extracted once by [`VideoSource::open`](crate::VideoSource::open) and
//! cached for the lifetime of the source.

use std::time::Duration;

/// Metadata for the video stream a [`VideoSource`](crate::VideoSource)
/// decodes from.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct VideoMetadata {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Average frames per second (approximate for variable-frame-rate
    /// content; `0.0` if the container does not declare a rate).
    pub frames_per_second: f64,
    /// Total number of frames. Taken from the stream header when present,
    /// otherwise estimated from duration and frame rate.
    pub frame_count: u64,
    /// Duration of the video stream (or the container, if the stream has
    /// none).
    pub duration: Duration,
    /// Codec name (e.g. `"h264"`, `"vp9"`).
    pub codec: String,
    /// Container format name (e.g. `"mov,mp4,m4a,3gp,3g2,mj2"`).
    pub format: String,
}
