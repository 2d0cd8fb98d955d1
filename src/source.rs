//! Frame sources.
//!
//! [`FrameSource`] is the only capability the rest of the crate needs from a
//! video: a frame count, a frame rate, a sequential scan, and random-access
//! seek-and-decode of one frame. [`VideoSource`] implements it on top of
//! FFmpeg.
//!
//! # Example
//!
//! ```no_run
//! use scenesnap::{FrameSource, SceneSnapError, VideoSource};
//!
//! let mut source = VideoSource::open("input.mp4")?;
//! println!("{} frames @ {:.2} fps", source.frame_count(), source.frame_rate());
//! let first = source.seek_and_decode(0)?;
//! first.save("first.png")?;
//! source.close();
//! # Ok::<(), SceneSnapError>(())
//! ```

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    time::Duration,
};

use ffmpeg_next::{
    Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use ffmpeg_sys_next::AV_NOPTS_VALUE;
use image::{RgbImage, imageops::FilterType};

use crate::{
    conversion::{self, FrameNumbering},
    error::SceneSnapError,
    metadata::VideoMetadata,
};

/// Callback invoked by [`FrameSource::scan`] with each frame number and its
/// downscaled RGB image.
pub type ScanVisitor<'a> = dyn FnMut(u64, &RgbImage) -> Result<(), SceneSnapError> + 'a;

/// A decodable video, as seen by detection and extraction.
///
/// Implementations own their decoder resources until [`close`](FrameSource::close)
/// is called or the value is dropped. `close` must be idempotent.
pub trait FrameSource {
    /// Total number of frames (may be an estimate for some containers).
    fn frame_count(&self) -> u64;

    /// Frames per second. May be `0.0` when the container declares no rate.
    fn frame_rate(&self) -> f64;

    /// Seek to `frame_number` and decode that single frame at full
    /// resolution.
    ///
    /// # Errors
    ///
    /// [`SceneSnapError::FrameOutOfRange`] for an index past the end, or
    /// [`SceneSnapError::VideoDecode`] when no frame can be produced at
    /// that position.
    fn seek_and_decode(&mut self, frame_number: u64) -> Result<RgbImage, SceneSnapError>;

    /// Decode every frame in order, once, handing each to `visitor` scaled
    /// down to at most `max_width` pixels wide.
    ///
    /// Frame numbers increase strictly and match the numbering used by
    /// [`seek_and_decode`](FrameSource::seek_and_decode), so a number may be
    /// skipped where the stream drops or merges frames.
    ///
    /// Returns one past the highest frame number visited, or 0 if the scan
    /// produced nothing. The default implementation
    /// seeks to each index in turn and stops at the first frame that fails
    /// to decode; decoder-backed sources override it with a single
    /// sequential pass.
    fn scan(&mut self, max_width: u32, visitor: &mut ScanVisitor<'_>) -> Result<u64, SceneSnapError> {
        let mut visited = 0;
        for frame_number in 0..self.frame_count() {
            let image = match self.seek_and_decode(frame_number) {
                Ok(image) => image,
                Err(error) => {
                    log::debug!("Scan stopped at frame {frame_number}: {error}");
                    break;
                }
            };
            let (width, height) =
                conversion::fit_to_width(image.width(), image.height(), max_width);
            if (width, height) == image.dimensions() {
                visitor(frame_number, &image)?;
            } else {
                let scaled = image::imageops::resize(&image, width, height, FilterType::Triangle);
                visitor(frame_number, &scaled)?;
            }
            visited += 1;
        }
        Ok(visited)
    }

    /// Release decoder resources. Safe to call more than once, and after a
    /// failed operation.
    fn close(&mut self);
}

/// An FFmpeg-backed [`FrameSource`].
///
/// Created via [`VideoSource::open`], this holds the demuxer context and the
/// cached [`VideoMetadata`] of the best video stream. Each scan or seek
/// builds a fresh decoder from the stream parameters, which is dropped when
/// the call returns.
pub struct VideoSource {
    /// The opened FFmpeg input (demuxer) context; `None` once closed.
    input_context: Option<Input>,
    metadata: VideoMetadata,
    video_stream_index: usize,
    time_base: Rational,
    /// First presentation timestamp of the stream, in `time_base` units.
    start_pts: i64,
    /// The container declared no frame count; a full scan replaces the
    /// estimate with the number of frames it covered.
    frame_count_estimated: bool,
    file_path: PathBuf,
}

impl Debug for VideoSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoSource")
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .field("open", &self.input_context.is_some())
            .field("file_path", &self.file_path)
            .finish_non_exhaustive()
    }
}

impl VideoSource {
    /// Open a video file.
    ///
    /// Initializes FFmpeg (idempotent), opens the container, locates the
    /// best video stream, and caches its metadata.
    ///
    /// # Errors
    ///
    /// [`SceneSnapError::FileOpen`] if the file is missing, corrupt, or uses
    /// an unsupported codec, and [`SceneSnapError::NoVideoStream`] if it
    /// carries no video.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SceneSnapError> {
        let path = path.as_ref();
        let file_path = path.to_path_buf();

        log::debug!("Opening video file: {}", file_path.display());

        ffmpeg_next::init().map_err(|error| SceneSnapError::FileOpen {
            path: file_path.clone(),
            reason: format!("FFmpeg initialisation failed: {error}"),
        })?;

        let input_context =
            ffmpeg_next::format::input(&path).map_err(|error| SceneSnapError::FileOpen {
                path: file_path.clone(),
                reason: error.to_string(),
            })?;

        let stream = input_context
            .streams()
            .best(Type::Video)
            .ok_or_else(|| SceneSnapError::NoVideoStream(file_path.clone()))?;
        let video_stream_index = stream.index();
        let time_base = stream.time_base();

        let decoder_context =
            CodecContext::from_parameters(stream.parameters()).map_err(|error| {
                SceneSnapError::FileOpen {
                    path: file_path.clone(),
                    reason: format!("Failed to read video codec parameters: {error}"),
                }
            })?;
        let decoder =
            decoder_context
                .decoder()
                .video()
                .map_err(|error| SceneSnapError::FileOpen {
                    path: file_path.clone(),
                    reason: format!("Failed to create video decoder: {error}"),
                })?;

        let frames_per_second = rational_to_f64(stream.avg_frame_rate())
            .filter(|fps| *fps > 0.0)
            .or_else(|| rational_to_f64(stream.rate()))
            .unwrap_or(0.0);

        let start_pts = match stream.start_time() {
            AV_NOPTS_VALUE => 0,
            pts => pts,
        };

        let duration = match stream.duration() {
            duration if duration > 0 => {
                Duration::from_secs_f64(conversion::pts_to_seconds(duration, time_base))
            }
            _ if input_context.duration() > 0 => {
                Duration::from_micros(input_context.duration() as u64)
            }
            _ => Duration::ZERO,
        };

        let frame_count_estimated = stream.frames() <= 0;
        let frame_count = if frame_count_estimated {
            conversion::estimate_frame_count(duration.as_secs_f64(), frames_per_second)
        } else {
            stream.frames() as u64
        };

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let metadata = VideoMetadata {
            width: decoder.width(),
            height: decoder.height(),
            frames_per_second,
            frame_count,
            duration,
            codec,
            format: input_context.format().name().to_string(),
        };

        log::info!(
            "Opened video file: {} ({}x{}, {:.2} fps, ~{} frames, codec={})",
            file_path.display(),
            metadata.width,
            metadata.height,
            metadata.frames_per_second,
            metadata.frame_count,
            metadata.codec,
        );

        Ok(Self {
            input_context: Some(input_context),
            metadata,
            video_stream_index,
            time_base,
            start_pts,
            frame_count_estimated,
            file_path,
        })
    }

    /// Cached metadata of the decoded video stream.
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Path this source was opened from.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn input(&mut self) -> Result<&mut Input, SceneSnapError> {
        self.input_context.as_mut().ok_or_else(|| {
            SceneSnapError::VideoDecode(format!("{} is already closed", self.file_path.display()))
        })
    }

    fn new_decoder(&mut self) -> Result<VideoDecoder, SceneSnapError> {
        let stream_index = self.video_stream_index;
        let path = self.file_path.clone();
        let parameters = self
            .input()?
            .stream(stream_index)
            .ok_or(SceneSnapError::NoVideoStream(path))?
            .parameters();
        CodecContext::from_parameters(parameters)
            .and_then(|context| context.decoder().video())
            .map_err(|error| SceneSnapError::VideoDecode(format!("decoder setup: {error}")))
    }
}

impl FrameSource for VideoSource {
    fn frame_count(&self) -> u64 {
        self.metadata.frame_count
    }

    fn frame_rate(&self) -> f64 {
        self.metadata.frames_per_second
    }

    fn seek_and_decode(&mut self, frame_number: u64) -> Result<RgbImage, SceneSnapError> {
        let total_frames = self.metadata.frame_count;
        if frame_number >= total_frames {
            return Err(SceneSnapError::FrameOutOfRange {
                frame_number,
                total_frames,
            });
        }
        if self.metadata.frames_per_second <= 0.0 {
            return Err(SceneSnapError::VideoDecode(
                "cannot seek by frame number without a frame rate".to_string(),
            ));
        }

        let mut decoder = self.new_decoder()?;
        let mut converter = RgbConverter::new(None);
        let video_stream_index = self.video_stream_index;

        // Seek to the nearest keyframe at or before the target.
        let target_timestamp = conversion::frame_number_to_seek_timestamp(
            frame_number,
            self.metadata.frames_per_second,
        );
        self.input()?
            .seek(target_timestamp, ..target_timestamp)
            .map_err(|error| SceneSnapError::VideoDecode(format!("seek to frame {frame_number}: {error}")))?;

        let start_pts = self.start_pts;
        let time_base = self.time_base;
        let frames_per_second = self.metadata.frames_per_second;
        let reached_target = |frame: &VideoFrame| {
            presentation_frame_number(frame, start_pts, time_base, frames_per_second)
                >= frame_number
        };

        let mut decoded_frame = VideoFrame::empty();

        // Decode forward until we reach (or pass) the target.
        for (stream, packet) in self.input()?.packets() {
            if stream.index() != video_stream_index {
                continue;
            }
            if let Err(error) = decoder.send_packet(&packet) {
                log::debug!("Dropping undecodable packet while seeking: {error}");
                continue;
            }

            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                if reached_target(&decoded_frame) {
                    return converter.convert(&decoded_frame);
                }
            }
        }

        let _ = decoder.send_eof();
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            if reached_target(&decoded_frame) {
                return converter.convert(&decoded_frame);
            }
        }

        Err(SceneSnapError::VideoDecode(format!(
            "could not locate frame {frame_number} in {}",
            self.file_path.display()
        )))
    }

    fn scan(&mut self, max_width: u32, visitor: &mut ScanVisitor<'_>) -> Result<u64, SceneSnapError> {
        let mut decoder = self.new_decoder()?;
        let mut converter = RgbConverter::new(Some(max_width));
        let video_stream_index = self.video_stream_index;

        log::debug!(
            "Scanning {} (stream={}, analysis width={})",
            self.file_path.display(),
            video_stream_index,
            max_width,
        );

        if let Err(error) = self.input()?.seek(0, ..0) {
            log::debug!("Rewind before scan failed, scanning from current position: {error}");
        }

        let mut decoded_frame = VideoFrame::empty();
        let mut numbering = FrameNumbering::new(
            self.start_pts,
            self.time_base,
            self.metadata.frames_per_second,
        );
        for (stream, packet) in self.input()?.packets() {
            if stream.index() != video_stream_index {
                continue;
            }
            if let Err(error) = decoder.send_packet(&packet) {
                log::warn!("Skipping undecodable packet during scan: {error}");
                continue;
            }
            drain_decoder(
                &mut decoder,
                &mut decoded_frame,
                &mut converter,
                &mut numbering,
                visitor,
            )?;
        }

        let _ = decoder.send_eof();
        drain_decoder(
            &mut decoder,
            &mut decoded_frame,
            &mut converter,
            &mut numbering,
            visitor,
        )?;

        let scanned = numbering.end();
        if self.frame_count_estimated && scanned > 0 && scanned != self.metadata.frame_count {
            log::debug!(
                "Frame count of {} refined from estimate {} to {scanned}",
                self.file_path.display(),
                self.metadata.frame_count,
            );
            self.metadata.frame_count = scanned;
        }

        log::debug!("Scan of {} covered {scanned} frames", self.file_path.display());
        Ok(scanned)
    }

    fn close(&mut self) {
        if self.input_context.take().is_some() {
            log::debug!("Closed video file: {}", self.file_path.display());
        }
    }
}

/// Pull every pending frame out of `decoder`, number it by presentation
/// time, convert it, and hand it to `visitor`. Frames that fail conversion
/// still consume their number so later indices keep matching seek targets.
fn drain_decoder(
    decoder: &mut VideoDecoder,
    decoded_frame: &mut VideoFrame,
    converter: &mut RgbConverter,
    numbering: &mut FrameNumbering,
    visitor: &mut ScanVisitor<'_>,
) -> Result<(), SceneSnapError> {
    while decoder.receive_frame(decoded_frame).is_ok() {
        let Some(frame_number) = numbering.assign(frame_timestamp(decoded_frame)) else {
            log::trace!("Dropping frame that does not advance the frame number");
            continue;
        };
        match converter.convert(decoded_frame) {
            Ok(image) => visitor(frame_number, &image)?,
            Err(error) => log::warn!("Skipping frame {frame_number} during scan: {error}"),
        }
    }
    Ok(())
}

/// Best-effort presentation timestamp of a decoded frame.
fn frame_timestamp(frame: &VideoFrame) -> Option<i64> {
    frame.timestamp().or(frame.pts())
}

/// Zero-based frame number of a decoded frame, from its best-effort
/// timestamp.
fn presentation_frame_number(
    frame: &VideoFrame,
    start_pts: i64,
    time_base: Rational,
    frames_per_second: f64,
) -> u64 {
    let pts = frame_timestamp(frame).unwrap_or(start_pts);
    conversion::pts_to_frame_number(pts, start_pts, time_base, frames_per_second)
}

fn rational_to_f64(rational: Rational) -> Option<f64> {
    if rational.denominator() != 0 {
        Some(rational.numerator() as f64 / rational.denominator() as f64)
    } else {
        None
    }
}

/// Converts decoded frames of any pixel format into packed RGB images,
/// optionally downscaled. The scaling context is rebuilt whenever the
/// decoder changes format or size mid-stream.
struct RgbConverter {
    max_width: Option<u32>,
    context: Option<(ScalingContext, (Pixel, u32, u32))>,
    output: VideoFrame,
}

impl RgbConverter {
    fn new(max_width: Option<u32>) -> Self {
        Self {
            max_width,
            context: None,
            output: VideoFrame::empty(),
        }
    }

    fn convert(&mut self, frame: &VideoFrame) -> Result<RgbImage, SceneSnapError> {
        let key = (frame.format(), frame.width(), frame.height());
        let stale = !matches!(&self.context, Some((_, current)) if *current == key);
        if stale {
            let (width, height) = match self.max_width {
                Some(max_width) => conversion::fit_to_width(key.1, key.2, max_width),
                None => (key.1, key.2),
            };
            let context = ScalingContext::get(
                key.0,
                key.1,
                key.2,
                Pixel::RGB24,
                width,
                height,
                ScalingFlags::AREA,
            )
            .map_err(|error| SceneSnapError::VideoDecode(format!("scaler setup: {error}")))?;
            self.context = Some((context, key));
            self.output = VideoFrame::empty();
        }

        let Some((context, _)) = self.context.as_mut() else {
            return Err(SceneSnapError::VideoDecode("scaler unavailable".to_string()));
        };
        context
            .run(frame, &mut self.output)
            .map_err(|error| SceneSnapError::VideoDecode(format!("pixel conversion: {error}")))?;

        let (width, height) = (self.output.width(), self.output.height());
        let buffer = conversion::frame_to_buffer(&self.output, width, height, 3);
        RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
            SceneSnapError::VideoDecode(
                "Failed to construct RGB image from decoded frame data".to_string(),
            )
        })
    }
}
