//! Getting source videos onto local disk.
//!
//! Every acquisition gets its own `upload_root/{uuid}/` directory and ends
//! up as a single `video.<ext>` file in it, which is then handed to
//! [`ExtractionPipeline::run`](crate::ExtractionPipeline::run).

use std::{
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use uuid::Uuid;

use crate::{error::SceneSnapError, project::StorageLayout};

/// Extension used when the original name carries none we can trust.
const FALLBACK_EXTENSION: &str = "mp4";
const MAX_EXTENSION_LEN: usize = 8;

/// A video staged below the upload root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedVideo {
    /// Random identifier of the staging directory. Also a valid project id.
    pub id: String,
    /// `upload_root/{id}`.
    pub directory: PathBuf,
    /// The video file itself.
    pub path: PathBuf,
}

/// External program that downloads a video from a URL.
///
/// It is invoked as `{program} {args...} {url} -o {dir}/video.%(ext)s
/// --no-playlist --print after_move:filepath` and must print the final file
/// path on its last line of standard output, as `yt-dlp` does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloader {
    program: OsString,
    args: Vec<OsString>,
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl Downloader {
    /// Run `program` (looked up on `PATH`) with no extra arguments.
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Arguments placed before the URL, e.g. `["-m", "yt_dlp"]` for a
    /// `python3` program.
    pub fn with_args<I, A>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// The program that will be spawned.
    pub fn program(&self) -> &OsString {
        &self.program
    }
}

/// Copy a local file into a fresh staging directory.
///
/// The extension is taken from `original_name` when it is short and
/// alphanumeric, and falls back to `mp4` otherwise.
///
/// # Errors
///
/// [`SceneSnapError::Acquisition`] if the file cannot be read or copied.
pub fn stage_upload(
    layout: &StorageLayout,
    source_file: impl AsRef<Path>,
    original_name: &str,
) -> Result<StagedVideo, SceneSnapError> {
    let source_file = source_file.as_ref();
    let (id, directory) = create_staging_dir(layout)?;
    let path = directory.join(format!("video.{}", upload_extension(original_name)));

    fs::copy(source_file, &path).map_err(|error| SceneSnapError::Acquisition {
        reason: format!("failed to stage {}: {error}", source_file.display()),
    })?;
    log::info!("Staged upload {original_name} as {}", path.display());

    Ok(StagedVideo {
        id,
        directory,
        path,
    })
}

/// Download `url` with `downloader` into a fresh staging directory.
///
/// # Errors
///
/// [`SceneSnapError::Acquisition`] if the downloader cannot be started,
/// exits unsuccessfully, or reports a file that does not exist.
pub fn fetch_url(
    layout: &StorageLayout,
    url: &str,
    downloader: &Downloader,
) -> Result<StagedVideo, SceneSnapError> {
    let (id, directory) = create_staging_dir(layout)?;
    let template = directory.join("video.%(ext)s");

    log::info!(
        "Downloading {url} with {}",
        downloader.program.to_string_lossy()
    );
    let output = Command::new(&downloader.program)
        .args(&downloader.args)
        .arg(url)
        .arg("-o")
        .arg(&template)
        .args(["--no-playlist", "--print", "after_move:filepath"])
        .stdin(Stdio::null())
        .output()
        .map_err(|error| SceneSnapError::Acquisition {
            reason: format!(
                "could not run {}: {error}",
                downloader.program.to_string_lossy()
            ),
        })?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        log::debug!("Downloader stderr: {}", stderr.trim());
    }
    if !output.status.success() {
        return Err(SceneSnapError::Acquisition {
            reason: format!(
                "downloader exited with {}: {}",
                output.status,
                stderr.trim()
            ),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let reported = stdout
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .ok_or_else(|| SceneSnapError::Acquisition {
            reason: "downloader did not report an output file".to_string(),
        })?;
    let path = PathBuf::from(reported);
    if !path.is_file() {
        return Err(SceneSnapError::Acquisition {
            reason: format!("downloader reported {reported}, which does not exist"),
        });
    }
    log::info!("Downloaded {url} to {}", path.display());

    Ok(StagedVideo {
        id,
        directory,
        path,
    })
}

fn create_staging_dir(layout: &StorageLayout) -> Result<(String, PathBuf), SceneSnapError> {
    let id = Uuid::new_v4().to_string();
    let directory = layout.upload_root.join(&id);
    fs::create_dir_all(&directory).map_err(|error| SceneSnapError::Acquisition {
        reason: format!("failed to create {}: {error}", directory.display()),
    })?;
    Ok((id, directory))
}

fn upload_extension(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|extension| extension.to_str())
        .filter(|extension| {
            !extension.is_empty()
                && extension.len() <= MAX_EXTENSION_LEN
                && extension.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map_or_else(
            || FALLBACK_EXTENSION.to_string(),
            str::to_ascii_lowercase,
        )
}
