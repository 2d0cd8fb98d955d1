//! ZIP bundling of extracted frames.
//!
//! Archives are written to `archive_root/{name}.zip` with flat entry names
//! (the frame file name only). Both entry points only read files that
//! already exist below the output root.

use std::{
    fs::{self, File},
    io::{self, BufWriter},
    path::{Path, PathBuf},
    sync::Arc,
};

use zip::{CompressionMethod, ZipWriter, write::FileOptions};

use crate::{
    error::SceneSnapError,
    progress::{NoOpProgress, OperationType, ProgressCallback, ProgressTracker},
    project::{PUBLIC_PREFIX, ProjectId, StorageLayout, validate_component},
};

/// Archive name used when the caller does not provide one for a selection.
pub const DEFAULT_SELECTION_NAME: &str = "selected";

/// What an archive call produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    /// Location of the written `.zip`.
    pub path: PathBuf,
    /// Entry names, in archive order.
    pub entries: Vec<String>,
    /// Requested paths that were missing or pointed outside the output root.
    pub skipped: Vec<String>,
}

/// Writes ZIP archives for one [`StorageLayout`].
pub struct Archiver<'a> {
    layout: &'a StorageLayout,
    progress: Arc<dyn ProgressCallback>,
}

impl<'a> Archiver<'a> {
    /// An archiver reading from and writing to `layout`.
    pub fn new(layout: &'a StorageLayout) -> Self {
        Self {
            layout,
            progress: Arc::new(NoOpProgress),
        }
    }

    /// Report one step per archived file to `callback`.
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Zip every regular file in `project`'s output directory.
    ///
    /// The archive is named after the project unless `zip_name` is given.
    ///
    /// # Errors
    ///
    /// [`SceneSnapError::InvalidProjectIdentifier`] for an unsafe
    /// `zip_name`, and storage errors if the project directory cannot be
    /// read or the archive cannot be written.
    pub fn archive_project(
        &self,
        project: &ProjectId,
        zip_name: Option<&str>,
    ) -> Result<ArchiveSummary, SceneSnapError> {
        let zip_name = zip_name.unwrap_or(project.as_str());
        validate_component(zip_name)?;

        let project_dir = self.layout.project_dir(project);
        let mut files = Vec::new();
        for entry in fs::read_dir(&project_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();

        self.write_archive(zip_name, &files, Vec::new())
    }

    /// Zip the listed `frames/{project}/{file}` paths.
    ///
    /// Paths that do not exist or do not name a file directly inside a
    /// project directory are skipped and reported in
    /// [`ArchiveSummary::skipped`].
    ///
    /// # Errors
    ///
    /// [`SceneSnapError::InvalidProjectIdentifier`] for an unsafe
    /// `zip_name`, and storage errors if the archive cannot be written.
    pub fn archive_selected<S: AsRef<str>>(
        &self,
        paths: &[S],
        zip_name: &str,
    ) -> Result<ArchiveSummary, SceneSnapError> {
        validate_component(zip_name)?;

        let mut files = Vec::with_capacity(paths.len());
        let mut skipped = Vec::new();
        for requested in paths {
            let requested = requested.as_ref();
            match self.resolve_public_path(requested) {
                Some(path) if path.is_file() => files.push(path),
                Some(_) => {
                    log::warn!("Skipping missing frame {requested}");
                    skipped.push(requested.to_string());
                }
                None => {
                    log::warn!("Rejecting path outside the frame directory: {requested}");
                    skipped.push(requested.to_string());
                }
            }
        }

        self.write_archive(zip_name, &files, skipped)
    }

    /// Map `frames/{project}/{file}` (or `{project}/{file}`) onto disk.
    fn resolve_public_path(&self, public_path: &str) -> Option<PathBuf> {
        let trimmed = public_path.trim_start_matches('/');
        let relative = trimmed
            .strip_prefix(PUBLIC_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(trimmed);

        let mut components = relative.split('/');
        let (Some(project), Some(file), None) =
            (components.next(), components.next(), components.next())
        else {
            return None;
        };
        validate_component(project).ok()?;
        validate_component(file).ok()?;

        Some(self.layout.output_root.join(project).join(file))
    }

    fn write_archive(
        &self,
        zip_name: &str,
        files: &[PathBuf],
        skipped: Vec<String>,
    ) -> Result<ArchiveSummary, SceneSnapError> {
        fs::create_dir_all(&self.layout.archive_root)?;
        let path = self.layout.archive_root.join(format!("{zip_name}.zip"));

        let mut writer = ZipWriter::new(BufWriter::new(File::create(&path)?));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut tracker = ProgressTracker::new(
            self.progress.clone(),
            OperationType::Archiving,
            Some(files.len() as u64),
            1,
        );

        let mut entries = Vec::with_capacity(files.len());
        for file in files {
            let Some(entry_name) = entry_name(file) else {
                continue;
            };
            if entries.contains(&entry_name) {
                continue;
            }
            writer.start_file(entry_name.as_str(), options)?;
            io::copy(&mut File::open(file)?, &mut writer)?;
            entries.push(entry_name);
            tracker.advance(None);
        }
        writer.finish()?;
        tracker.finish();

        log::info!("Wrote {} with {} file(s)", path.display(), entries.len());
        Ok(ArchiveSummary {
            path,
            entries,
            skipped,
        })
    }
}

fn entry_name(file: &Path) -> Option<String> {
    file.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}

/// Zip a whole project. See [`Archiver::archive_project`].
pub fn archive_project(
    layout: &StorageLayout,
    project: &ProjectId,
    zip_name: Option<&str>,
) -> Result<ArchiveSummary, SceneSnapError> {
    Archiver::new(layout).archive_project(project, zip_name)
}

/// Zip selected frame paths. See [`Archiver::archive_selected`].
pub fn archive_selected<S: AsRef<str>>(
    layout: &StorageLayout,
    paths: &[S],
    zip_name: &str,
) -> Result<ArchiveSummary, SceneSnapError> {
    Archiver::new(layout).archive_selected(paths, zip_name)
}
