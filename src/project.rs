//! Projects and on-disk layout.
//!
//! A project is one extraction run for one video. Its identifier becomes a
//! directory name under the output root and the prefix of every frame file,
//! so [`ProjectId`] only admits values that are a single, inert path
//! component.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    fs,
    path::{Path, PathBuf},
};

use uuid::Uuid;

use crate::error::SceneSnapError;

/// First path segment of every public frame path (`frames/{project}/{file}`).
pub const PUBLIC_PREFIX: &str = "frames";

/// Longest accepted identifier, in bytes. Matches common filesystem limits
/// on a single path component.
const MAX_IDENTIFIER_LEN: usize = 255;

/// Characters that are reserved on at least one common filesystem.
const RESERVED_CHARACTERS: &[char] = &[':', '*', '?', '"', '<', '>', '|'];

/// A validated project identifier.
///
/// # Example
///
/// ```
/// use scenesnap::ProjectId;
///
/// assert!(ProjectId::new("holiday-2024").is_ok());
/// assert!(ProjectId::new("../../etc").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId(String);

impl ProjectId {
    /// Validate `identifier`.
    ///
    /// Unsafe identifiers are rejected rather than rewritten, so the caller
    /// always knows the exact directory that will be used.
    ///
    /// # Errors
    ///
    /// [`SceneSnapError::InvalidProjectIdentifier`] if the identifier is
    /// empty, too long, contains a path separator, a control character, a
    /// reserved character, or a `..` sequence, or is `.`.
    pub fn new(identifier: impl Into<String>) -> Result<Self, SceneSnapError> {
        let identifier = identifier.into();
        validate_component(&identifier)?;
        Ok(Self(identifier))
    }

    /// A fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The validated identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Check that `identifier` is usable as exactly one path component.
pub(crate) fn validate_component(identifier: &str) -> Result<(), SceneSnapError> {
    let reject = |reason| {
        Err(SceneSnapError::InvalidProjectIdentifier {
            identifier: identifier.to_string(),
            reason,
        })
    };

    if identifier.is_empty() {
        return reject("identifier is empty");
    }
    if identifier.len() > MAX_IDENTIFIER_LEN {
        return reject("identifier is longer than 255 bytes");
    }
    if identifier.contains(['/', '\\']) {
        return reject("identifier contains a path separator");
    }
    if identifier.chars().any(char::is_control) {
        return reject("identifier contains a control character");
    }
    if identifier.contains(RESERVED_CHARACTERS) {
        return reject("identifier contains a reserved character");
    }
    if identifier == "." || identifier.contains("..") {
        return reject("identifier contains a traversal sequence");
    }
    Ok(())
}

/// Root directories the crate reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    /// Staged uploads and downloads, one subdirectory per acquisition.
    pub upload_root: PathBuf,
    /// Extracted frames, one subdirectory per project.
    pub output_root: PathBuf,
    /// Generated ZIP archives.
    pub archive_root: PathBuf,
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self {
            upload_root: PathBuf::from("uploads"),
            output_root: PathBuf::from("static").join(PUBLIC_PREFIX),
            archive_root: PathBuf::from("zips"),
        }
    }
}

impl StorageLayout {
    /// Explicit upload, output and archive roots.
    pub fn new(
        upload_root: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        archive_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            upload_root: upload_root.into(),
            output_root: output_root.into(),
            archive_root: archive_root.into(),
        }
    }

    /// All three roots below `base` with their default names.
    pub fn under(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        let defaults = Self::default();
        Self::new(
            base.join(defaults.upload_root),
            base.join(defaults.output_root),
            base.join(defaults.archive_root),
        )
    }

    /// Output directory of `project`.
    pub fn project_dir(&self, project: &ProjectId) -> PathBuf {
        self.output_root.join(project.as_str())
    }

    /// Create the three roots if they do not exist yet.
    pub fn ensure_roots(&self) -> Result<(), SceneSnapError> {
        for root in [&self.upload_root, &self.output_root, &self.archive_root] {
            fs::create_dir_all(root)?;
        }
        Ok(())
    }
}

/// A project bound to its output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Validated identifier, also the file name prefix.
    pub id: ProjectId,
    /// `output_root/{id}`; created on the first extraction.
    pub output_dir: PathBuf,
}

impl Project {
    /// Bind `id` to its directory under `layout`. Nothing is created yet.
    pub fn new(layout: &StorageLayout, id: ProjectId) -> Self {
        let output_dir = layout.project_dir(&id);
        Self { id, output_dir }
    }

    /// Name of the `index`-th extracted frame (1-based).
    pub fn frame_file_name(&self, index: u32) -> String {
        format!("{}_{index}.jpg", self.id)
    }

    /// Create the output directory.
    pub(crate) fn create_output_dir(&self) -> Result<(), SceneSnapError> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }
}

/// One JPEG written by the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFrame {
    /// Owning project.
    pub project: ProjectId,
    /// 1-based position in the project's output, without gaps.
    pub index: u32,
    /// Frame number in the source video this image was decoded from.
    pub source_frame: u64,
    /// `{project}_{index}.jpg`.
    pub file_name: String,
    /// Location on disk (output directory joined with the file name).
    pub path: PathBuf,
}

impl ExtractedFrame {
    /// Path callers hand out and later pass back for archiving:
    /// `frames/{project}/{file_name}`.
    pub fn public_path(&self) -> String {
        format!("{PUBLIC_PREFIX}/{}/{}", self.project, self.file_name)
    }
}
