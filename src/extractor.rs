//! Frame extraction to JPEG.
//!
//! [`FrameExtractor`] seeks a [`FrameSource`] to each selected frame and
//! writes it as `{project}_{n}.jpg`. Frames that fail to decode are skipped
//! and the numbering closes over the gap, so the output is always
//! `1..=len` with no holes.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::Arc,
};

use image::{RgbImage, codecs::jpeg::JpegEncoder};

use crate::{
    configuration::DEFAULT_JPEG_QUALITY,
    error::{ErrorKind, SceneSnapError},
    progress::{NoOpProgress, OperationType, ProgressCallback, ProgressTracker},
    project::{ExtractedFrame, Project},
    source::FrameSource,
};

/// Writes selected frames of one project.
pub struct FrameExtractor<'a> {
    project: &'a Project,
    jpeg_quality: u8,
    progress: Arc<dyn ProgressCallback>,
    batch_size: u64,
}

impl<'a> FrameExtractor<'a> {
    /// An extractor writing into `project`'s output directory at the
    /// default JPEG quality.
    pub fn new(project: &'a Project) -> Self {
        Self {
            project,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            progress: Arc::new(NoOpProgress),
            batch_size: 1,
        }
    }

    /// JPEG quality, 1 to 100.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Report progress to `callback` every `batch_size` frames.
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>, batch_size: u64) -> Self {
        self.progress = callback;
        self.batch_size = batch_size;
        self
    }

    /// Extract `selected` (ascending frame numbers) and close `source`.
    ///
    /// The source is closed whether or not extraction succeeds.
    ///
    /// # Errors
    ///
    /// Storage errors while writing a JPEG abort the run. Decode errors for
    /// single frames do not: the frame is logged and skipped.
    pub fn extract<S>(
        &self,
        source: &mut S,
        selected: &[u64],
    ) -> Result<Vec<ExtractedFrame>, SceneSnapError>
    where
        S: FrameSource + ?Sized,
    {
        let result = self.extract_all(source, selected);
        source.close();
        result
    }

    fn extract_all<S>(
        &self,
        source: &mut S,
        selected: &[u64],
    ) -> Result<Vec<ExtractedFrame>, SceneSnapError>
    where
        S: FrameSource + ?Sized,
    {
        let mut tracker = ProgressTracker::new(
            self.progress.clone(),
            OperationType::FrameExtraction,
            Some(selected.len() as u64),
            self.batch_size,
        );
        let mut frames = Vec::with_capacity(selected.len());

        for &frame_number in selected {
            match source.seek_and_decode(frame_number) {
                Ok(image) => {
                    let index = frames.len() as u32 + 1;
                    frames.push(self.save(&image, index, frame_number)?);
                }
                Err(error) if error.kind() == ErrorKind::Decode => {
                    log::warn!("Skipping frame {frame_number}: {error}");
                }
                Err(error) => return Err(error),
            }
            tracker.advance(Some(frame_number));
        }
        tracker.finish();

        log::info!(
            "Extracted {} of {} selected frame(s) into {}",
            frames.len(),
            selected.len(),
            self.project.output_dir.display(),
        );
        Ok(frames)
    }

    fn save(
        &self,
        image: &RgbImage,
        index: u32,
        source_frame: u64,
    ) -> Result<ExtractedFrame, SceneSnapError> {
        let file_name = self.project.frame_file_name(index);
        let path = self.project.output_dir.join(&file_name);
        write_jpeg(image, &path, self.jpeg_quality)?;
        log::debug!("Wrote frame {source_frame} to {}", path.display());

        Ok(ExtractedFrame {
            project: self.project.id.clone(),
            index,
            source_frame,
            file_name,
            path,
        })
    }
}

/// Encode `image` as a JPEG at `path`, replacing any existing file.
pub(crate) fn write_jpeg(image: &RgbImage, path: &Path, quality: u8) -> Result<(), SceneSnapError> {
    let mut writer = BufWriter::new(File::create(path)?);
    JpegEncoder::new_with_quality(&mut writer, quality).encode_image(image)?;
    writer.flush()?;
    Ok(())
}
