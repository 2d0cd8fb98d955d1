//! Error types for the `scenesnap` crate.
//!
//! This module defines [`SceneSnapError`], the unified error type returned by
//! all fallible operations in the crate, and [`ErrorKind`], the coarse
//! taxonomy callers use to decide how to present a failure. Errors carry
//! file paths, frame numbers, and upstream messages where available.

use std::{fmt, io::Error as IoError, path::PathBuf};

use image::ImageError;
use thiserror::Error;
use zip::result::ZipError;

/// The unified error type for all `scenesnap` operations.
///
/// Every public method that can fail returns `Result<T, SceneSnapError>`.
/// Use [`kind`](SceneSnapError::kind) to classify an error and
/// [`ErrorReport`] to hand a structured value across a service boundary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SceneSnapError {
    /// The source video could not be uploaded or downloaded.
    #[error("Failed to acquire source video: {reason}")]
    Acquisition {
        /// What went wrong (tool exit status, missing output, ...).
        reason: String,
    },

    /// The video file could not be opened.
    #[error("Failed to open video file at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to [`crate::VideoSource::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in {0}")]
    NoVideoStream(PathBuf),

    /// A single video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecode(String),

    /// The requested frame number exceeds the total frame count.
    #[error("Frame {frame_number} is out of range (video has {total_frames} frames)")]
    FrameOutOfRange {
        /// The frame number that was requested.
        frame_number: u64,
        /// The total number of frames in the video.
        total_frames: u64,
    },

    /// The video reports frames but not a single one could be decoded.
    #[error("No decodable frames in {0}")]
    NoDecodableFrames(String),

    /// The project identifier is empty or unsafe as a path component.
    #[error("Invalid project identifier {identifier:?}: {reason}")]
    InvalidProjectIdentifier {
        /// The rejected identifier.
        identifier: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// An extraction option is out of its valid range.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// An error from the `image` crate while encoding a frame.
    #[error("Image processing error: {0}")]
    Image(#[from] ImageError),

    /// A ZIP archive could not be written.
    #[error("Archive error: {0}")]
    Archive(#[from] ZipError),
}

/// Coarse classification of a [`SceneSnapError`].
///
/// `Decode` failures are tolerated per frame by the extractor; every other
/// kind aborts the current extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Upload or download of the source video failed.
    Acquisition,
    /// The video cannot be opened or decoded at all.
    Open,
    /// A single frame could not be seeked to or decoded.
    Decode,
    /// The project identifier is unsafe or empty.
    InvalidProjectIdentifier,
    /// Extraction options are invalid.
    Configuration,
    /// Filesystem, image encoding, or archive output failed.
    Storage,
}

impl ErrorKind {
    /// Stable snake_case name, suitable for JSON payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Acquisition => "acquisition_error",
            ErrorKind::Open => "open_error",
            ErrorKind::Decode => "decode_error",
            ErrorKind::InvalidProjectIdentifier => "invalid_project_identifier",
            ErrorKind::Configuration => "configuration_error",
            ErrorKind::Storage => "storage_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SceneSnapError {
    /// Classify this error.
    ///
    /// FFmpeg failures are wrapped where they happen: open-time ones in
    /// [`SceneSnapError::FileOpen`], per-frame ones in
    /// [`SceneSnapError::VideoDecode`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            SceneSnapError::Acquisition { .. } => ErrorKind::Acquisition,
            SceneSnapError::FileOpen { .. }
            | SceneSnapError::NoVideoStream(_)
            | SceneSnapError::NoDecodableFrames(_) => ErrorKind::Open,
            SceneSnapError::VideoDecode(_) | SceneSnapError::FrameOutOfRange { .. } => {
                ErrorKind::Decode
            }
            SceneSnapError::InvalidProjectIdentifier { .. } => {
                ErrorKind::InvalidProjectIdentifier
            }
            SceneSnapError::Configuration(_) => ErrorKind::Configuration,
            SceneSnapError::Io(_) | SceneSnapError::Image(_) | SceneSnapError::Archive(_) => {
                ErrorKind::Storage
            }
        }
    }
}

/// A structured failure: error kind plus human-readable message.
///
/// This is what a request-handling layer should render instead of the raw
/// error value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    /// Classification of the failure.
    pub kind: ErrorKind,
    /// Display text of the underlying error.
    pub message: String,
}

impl From<&SceneSnapError> for ErrorReport {
    fn from(error: &SceneSnapError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl From<SceneSnapError> for ErrorReport {
    fn from(error: SceneSnapError) -> Self {
        ErrorReport::from(&error)
    }
}
