//! Internal conversion helpers.
//!
//! Pixel-data copying out of FFmpeg frames and the timestamp arithmetic
//! shared by the sequential scan and the seek-and-decode path.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy pixel data from a packed FFmpeg video frame into a tightly-packed
/// buffer, dropping any per-row stride padding.
pub(crate) fn frame_to_buffer(
    video_frame: &VideoFrame,
    width: u32,
    height: u32,
    bytes_per_pixel: usize,
) -> Vec<u8> {
    let stride = video_frame.stride(0);
    let row_length = (width as usize) * bytes_per_pixel;
    let data = video_frame.data(0);

    if stride == row_length {
        data[..row_length * (height as usize)].to_vec()
    } else {
        let mut buffer = Vec::with_capacity(row_length * (height as usize));
        for row in 0..(height as usize) {
            let row_start = row * stride;
            buffer.extend_from_slice(&data[row_start..row_start + row_length]);
        }
        buffer
    }
}

/// Rescale a PTS value from stream time base to seconds.
pub(crate) fn pts_to_seconds(pts: i64, time_base: Rational) -> f64 {
    pts as f64 * time_base.numerator() as f64 / time_base.denominator() as f64
}

/// Rescale a PTS value to a zero-based frame number.
///
/// `start_pts` is the stream's first presentation timestamp; rounding (not
/// truncation) keeps `n / fps` from landing on frame `n - 1` through
/// floating-point error.
pub(crate) fn pts_to_frame_number(
    pts: i64,
    start_pts: i64,
    time_base: Rational,
    frames_per_second: f64,
) -> u64 {
    let seconds = pts_to_seconds(pts.saturating_sub(start_pts), time_base);
    (seconds * frames_per_second).round().max(0.0) as u64
}

/// Numbers the frames of a sequential decode by presentation time, the same
/// way [`pts_to_frame_number`] numbers the target of a seek.
///
/// Frames without a timestamp, or every frame when the rate is unknown, take
/// the next number after the last one assigned. A frame whose number does
/// not advance past the previous one gets no number at all.
#[derive(Debug, Clone)]
pub(crate) struct FrameNumbering {
    start_pts: i64,
    time_base: Rational,
    frames_per_second: f64,
    last: Option<u64>,
}

impl FrameNumbering {
    pub(crate) fn new(start_pts: i64, time_base: Rational, frames_per_second: f64) -> Self {
        Self {
            start_pts,
            time_base,
            frames_per_second,
            last: None,
        }
    }

    /// Number of the next decoded frame, whose timestamp is `pts`.
    pub(crate) fn assign(&mut self, pts: Option<i64>) -> Option<u64> {
        let number = match pts {
            Some(pts) if self.frames_per_second > 0.0 => {
                pts_to_frame_number(pts, self.start_pts, self.time_base, self.frames_per_second)
            }
            _ => self.end(),
        };
        if self.last.is_some_and(|last| number <= last) {
            return None;
        }
        self.last = Some(number);
        Some(number)
    }

    /// One past the highest number assigned so far.
    pub(crate) fn end(&self) -> u64 {
        self.last.map_or(0, |last| last + 1)
    }
}

/// Convert a frame number to a container seek timestamp in AV_TIME_BASE
/// (microseconds), as expected by `Input::seek`.
pub(crate) fn frame_number_to_seek_timestamp(frame_number: u64, frames_per_second: f64) -> i64 {
    let seconds = frame_number as f64 / frames_per_second;
    (seconds * 1_000_000.0) as i64
}

/// Estimate a frame count from a duration in seconds and a frame rate.
pub(crate) fn estimate_frame_count(duration_seconds: f64, frames_per_second: f64) -> u64 {
    if duration_seconds > 0.0 && frames_per_second > 0.0 {
        (duration_seconds * frames_per_second).round() as u64
    } else {
        0
    }
}

/// Compute scaled dimensions that fit `max_width`, preserving aspect ratio.
///
/// Frames already narrower than `max_width` keep their size. Both output
/// dimensions are at least 1.
pub(crate) fn fit_to_width(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width || width == 0 {
        return (width.max(1), height.max(1));
    }
    let ratio = max_width as f64 / width as f64;
    let scaled_height = (height as f64 * ratio).round() as u32;
    (max_width, scaled_height.max(1))
}
