//! # scenesnap
//!
//! Split a video into visually distinct scenes and save one representative
//! still per scene, or one still per fixed time interval.
//!
//! `scenesnap` decodes video through FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate, detects
//! scene cuts with a content-difference score over downscaled HSV frames,
//! and writes the selected frames as JPEG files named
//! `{project}_{n}.jpg` under a per-project output directory.
//!
//! ## Quick Start
//!
//! ### Extract one frame per scene
//!
//! ```no_run
//! use scenesnap::{ExtractOptions, ExtractionPipeline, StorageLayout};
//!
//! let pipeline = ExtractionPipeline::new(StorageLayout::default(), ExtractOptions::new());
//! let outcome = pipeline.run("holiday", "holiday.mp4").unwrap();
//! println!("{} scenes, {} frames", outcome.scenes.len(), outcome.frames.len());
//! ```
//!
//! ### Extract one frame every ten seconds
//!
//! ```no_run
//! use scenesnap::{ExtractOptions, ExtractionPipeline, SelectionMode, StorageLayout};
//!
//! let options = ExtractOptions::new()
//!     .with_mode(SelectionMode::Interval)
//!     .with_interval_seconds(10);
//! let pipeline = ExtractionPipeline::new(StorageLayout::default(), options);
//! let outcome = pipeline.run("lecture", "lecture.mkv").unwrap();
//! ```
//!
//! ### Bundle a selection
//!
//! ```no_run
//! use scenesnap::{StorageLayout, archive_selected};
//!
//! let layout = StorageLayout::default();
//! let summary = archive_selected(
//!     &layout,
//!     &["frames/holiday/holiday_1.jpg", "frames/holiday/holiday_4.jpg"],
//!     "best-of",
//! )
//! .unwrap();
//! println!("wrote {}", summary.path.display());
//! ```
//!
//! ## Features
//!
//! - **Scene detection**: single sequential pass, constant memory, with a
//!   configurable threshold and minimum scene length
//! - **Interval sampling**: one frame every N seconds as an alternative mode
//! - **Tolerant extraction**: frames that fail to decode are skipped and
//!   output numbering stays contiguous
//! - **Safe project names**: identifiers that could escape the output
//!   directory are rejected before any I/O
//! - **Archiving**: ZIP a whole project or a list of previously returned
//!   frame paths
//! - **Acquisition**: stage local uploads or fetch URLs with `yt-dlp`
//! - **Progress callbacks** for detection, extraction, and archiving
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `rayon` | `ExtractionPipeline::run_batch` extracts independent projects in parallel |
//! | `full` | Enables all of the above |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod acquisition;
pub mod archive;
pub mod configuration;
mod conversion;
pub mod detector;
pub mod error;
pub mod extractor;
pub mod ffmpeg;
pub mod metadata;
pub mod pipeline;
pub mod progress;
pub mod project;
#[cfg(feature = "rayon")]
mod rayon;
pub mod selector;
pub mod signal;
pub mod source;

pub use acquisition::{Downloader, StagedVideo, fetch_url, stage_upload};
pub use archive::{ArchiveSummary, Archiver, archive_project, archive_selected};
pub use configuration::ExtractOptions;
pub use detector::{Scene, SceneBoundary, SceneBoundaryDetector, detect_scenes, scenes_from_boundaries};
pub use error::{ErrorKind, ErrorReport, SceneSnapError};
pub use extractor::FrameExtractor;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use metadata::VideoMetadata;
pub use pipeline::{ExtractionOutcome, ExtractionPipeline};
pub use progress::{OperationType, ProgressCallback, ProgressInfo};
pub use project::{ExtractedFrame, Project, ProjectId, StorageLayout};
pub use selector::{FrameSelector, SelectionMode, interval_indices, scene_starts};
pub use signal::ContentSignal;
pub use source::{FrameSource, ScanVisitor, VideoSource};
