//! End-to-end extraction.
//!
//! [`ExtractionPipeline`] ties the stages together for one project: validate
//! the identifier and options, open the video, detect scenes or compute the
//! interval stride, select frames, and write them. Nothing is written until
//! the video has been opened successfully.
//!
//! # Example
//!
//! ```no_run
//! use scenesnap::{ExtractOptions, ExtractionPipeline, SceneSnapError, StorageLayout};
//!
//! let pipeline = ExtractionPipeline::new(StorageLayout::default(), ExtractOptions::new());
//! let outcome = pipeline.run("holiday", "uploads/holiday/video.mp4")?;
//! for path in outcome.frame_paths() {
//!     println!("{path}");
//! }
//! # Ok::<(), SceneSnapError>(())
//! ```

use std::path::Path;

use crate::{
    configuration::ExtractOptions,
    detector::{Scene, detect_scenes, scenes_from_boundaries},
    error::SceneSnapError,
    extractor::FrameExtractor,
    project::{ExtractedFrame, Project, ProjectId, StorageLayout},
    selector::{FrameSelector, SelectionMode},
    source::{FrameSource, VideoSource},
};

/// Result of a successful extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    /// Project the frames were written to.
    pub project: ProjectId,
    /// Frames in output order (`index` 1, 2, ...).
    pub frames: Vec<ExtractedFrame>,
    /// Scenes found by detection. Empty in interval mode.
    pub scenes: Vec<Scene>,
    /// Mode the frames were selected with.
    pub mode: SelectionMode,
}

impl ExtractionOutcome {
    /// Public `frames/{project}/{file}` paths, in output order.
    pub fn frame_paths(&self) -> Vec<String> {
        self.frames.iter().map(ExtractedFrame::public_path).collect()
    }

    /// Bare file names (`{project}_{n}.jpg`), in output order.
    pub fn file_names(&self) -> Vec<&str> {
        self.frames.iter().map(|frame| frame.file_name.as_str()).collect()
    }
}

/// Runs extractions against one [`StorageLayout`] with one set of options.
///
/// The pipeline holds no per-run state, so a single value can serve many
/// projects, including concurrently from several threads.
#[derive(Debug, Clone)]
pub struct ExtractionPipeline {
    layout: StorageLayout,
    options: ExtractOptions,
}

impl ExtractionPipeline {
    /// Create a pipeline writing below `layout` with `options`.
    pub fn new(layout: StorageLayout, options: ExtractOptions) -> Self {
        Self { layout, options }
    }

    /// Directories this pipeline writes to.
    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Options applied to every run.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract frames of the video at `video_path` into project
    /// `project_id`.
    ///
    /// # Errors
    ///
    /// - [`SceneSnapError::InvalidProjectIdentifier`] before any file is
    ///   touched.
    /// - [`SceneSnapError::Configuration`] for out-of-range options.
    /// - Open-kind errors when the video cannot be opened or yields no
    ///   decodable frame. The project directory is not created if opening
    ///   fails.
    /// - Storage errors while writing frames. Frames written before the
    ///   failure stay on disk.
    pub fn run(
        &self,
        project_id: &str,
        video_path: impl AsRef<Path>,
    ) -> Result<ExtractionOutcome, SceneSnapError> {
        let project = Project::new(&self.layout, ProjectId::new(project_id)?);
        self.options.validate()?;

        let mut source = VideoSource::open(video_path)?;
        self.run_with_source(&project, &mut source)
    }

    /// Extract from an already-open source. `source` is closed on return.
    pub fn run_with_source<S>(
        &self,
        project: &Project,
        source: &mut S,
    ) -> Result<ExtractionOutcome, SceneSnapError>
    where
        S: FrameSource + ?Sized,
    {
        let result = self.extract(project, source);
        source.close();
        if let Err(error) = &result {
            log::error!("Extraction of project {} failed: {error}", project.id);
        }
        result
    }

    fn extract<S>(
        &self,
        project: &Project,
        source: &mut S,
    ) -> Result<ExtractionOutcome, SceneSnapError>
    where
        S: FrameSource + ?Sized,
    {
        self.options.validate()?;
        let options = &self.options;
        let frame_count = source.frame_count();

        log::info!(
            "Extracting project {} ({} mode, {frame_count} frames @ {:.2} fps)",
            project.id,
            options.mode,
            source.frame_rate(),
        );

        let (scenes, frame_count) = match options.mode {
            SelectionMode::Scene => {
                let scenes = detect_scenes(source, options)?;
                // The scan may have replaced an estimated frame count.
                let frame_count = source.frame_count();
                if scenes.is_empty() && frame_count > 0 {
                    return Err(SceneSnapError::NoDecodableFrames(format!(
                        "project {}: no frame could be decoded during detection",
                        project.id
                    )));
                }
                (bound_scenes(&scenes, frame_count), frame_count)
            }
            SelectionMode::Interval => (Vec::new(), frame_count),
        };

        let selected = FrameSelector::new(options.mode, options.interval_seconds).select(
            &scenes,
            source.frame_rate(),
            frame_count,
        );

        project.create_output_dir()?;
        let frames = FrameExtractor::new(project)
            .with_jpeg_quality(options.jpeg_quality)
            .with_progress(options.progress.clone(), options.batch_size)
            .extract(source, &selected)?;

        if frames.is_empty() && !selected.is_empty() {
            return Err(SceneSnapError::NoDecodableFrames(format!(
                "project {}: none of the {} selected frame(s) could be decoded",
                project.id,
                selected.len()
            )));
        }

        Ok(ExtractionOutcome {
            project: project.id.clone(),
            frames,
            scenes,
            mode: options.mode,
        })
    }

    /// Run several independent projects in parallel, one per rayon task.
    ///
    /// Results are returned in input order; a failure in one project does
    /// not affect the others.
    #[cfg(feature = "rayon")]
    pub fn run_batch<P>(&self, jobs: &[(String, P)]) -> Vec<Result<ExtractionOutcome, SceneSnapError>>
    where
        P: AsRef<Path> + Sync,
    {
        crate::rayon::run_parallel(self, jobs)
    }
}

/// Clip `scenes` to the seekable range `[0, frame_count)`, so every scene
/// that is reported also gets exactly one extraction attempt.
fn bound_scenes(scenes: &[Scene], frame_count: u64) -> Vec<Scene> {
    let end = scenes
        .last()
        .map_or(0, |scene| scene.end_frame)
        .min(frame_count);
    let starts: Vec<u64> = scenes.iter().map(|scene| scene.start_frame).collect();
    scenes_from_boundaries(&starts, end)
}
