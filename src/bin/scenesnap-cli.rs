use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use scenesnap::{
    Downloader, ErrorReport, ExtractOptions, ExtractionOutcome, ExtractionPipeline,
    FfmpegLogLevel, FrameSource, OperationType, ProgressCallback, ProgressInfo, ProjectId,
    SceneSnapError, SelectionMode, StorageLayout, VideoSource,
    archive::DEFAULT_SELECTION_NAME,
    configuration::{
        DEFAULT_ANALYSIS_WIDTH, DEFAULT_INTERVAL_SECONDS, DEFAULT_JPEG_QUALITY,
        DEFAULT_MIN_SCENE_LEN, DEFAULT_THRESHOLD,
    },
};
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  scenesnap extract talk.mp4 --project talk --progress\n  scenesnap extract talk.mp4 --mode interval --interval 10 --json\n  scenesnap detect talk.mp4 --threshold 27\n  scenesnap archive --files frames/talk/talk_1.jpg frames/talk/talk_3.jpg --name picks\n  scenesnap fetch https://example.com/watch?v=abc --extract\n  scenesnap completions zsh > _scenesnap";

#[derive(Debug, Parser)]
#[command(
    name = "scenesnap",
    version,
    about = "Detect scenes in videos and extract one still per scene",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar where supported.
    #[arg(long, global = true)]
    progress: bool,

    /// Print results (and failures) as machine-readable JSON.
    #[arg(long, global = true)]
    json: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Directory for staged uploads and downloads [default: uploads].
    #[arg(long, global = true)]
    upload_root: Option<PathBuf>,

    /// Directory for extracted frames [default: static/frames].
    #[arg(long, global = true)]
    output_root: Option<PathBuf>,

    /// Directory for ZIP archives [default: zips].
    #[arg(long, global = true)]
    archive_root: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
struct DetectionArgs {
    /// Content-change score (0-255) a frame must exceed to start a new scene.
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f64,

    /// Minimum number of frames between two cuts.
    #[arg(long, default_value_t = DEFAULT_MIN_SCENE_LEN)]
    min_scene_len: u64,

    /// Width frames are scaled down to for detection.
    #[arg(long, default_value_t = DEFAULT_ANALYSIS_WIDTH)]
    analysis_width: u32,
}

/// Frame selection modes accepted by `--mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// One frame per detected scene.
    #[value(alias = "scenes")]
    Scene,
    /// One frame every `--interval` seconds.
    Interval,
}

impl From<ModeArg> for SelectionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Scene => SelectionMode::Scene,
            ModeArg::Interval => SelectionMode::Interval,
        }
    }
}

#[derive(Debug, Parser, Clone)]
struct ExtractArgs {
    /// Project name; used as the output directory and file prefix. Random if omitted.
    #[arg(long)]
    project: Option<String>,

    /// How frames are selected.
    #[arg(long, value_enum, default_value_t = ModeArg::Scene)]
    mode: ModeArg,

    /// Interval between frames in interval mode, in seconds.
    #[arg(long, default_value_t = DEFAULT_INTERVAL_SECONDS)]
    interval: u32,

    /// JPEG quality (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    quality: u8,

    #[command(flatten)]
    detection: DetectionArgs,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract one frame per scene (or per interval) into a project directory.
    #[command(
        about = "Extract representative frames",
        after_help = "Examples:\n  scenesnap extract input.mp4 --project demo\n  scenesnap extract input.mp4 --mode interval --interval 5"
    )]
    Extract {
        /// Input video path.
        input: PathBuf,

        #[command(flatten)]
        args: ExtractArgs,
    },

    /// List detected scenes without writing any files.
    #[command(about = "Print scene boundaries")]
    Detect {
        /// Input video path.
        input: PathBuf,

        #[command(flatten)]
        detection: DetectionArgs,
    },

    /// Print video metadata.
    #[command(about = "Print video metadata", visible_alias = "info")]
    Probe {
        /// Input video path.
        input: PathBuf,
    },

    /// Bundle a whole project, or selected frame paths, into a ZIP file.
    #[command(
        about = "Create a ZIP archive of frames",
        after_help = "Examples:\n  scenesnap archive demo\n  scenesnap archive --files frames/demo/demo_1.jpg frames/demo/demo_2.jpg --name picks"
    )]
    Archive {
        /// Project to archive in full.
        project: Option<String>,

        /// Frame paths (frames/{project}/{file}) to archive instead of a whole project.
        #[arg(long, num_args = 1.., conflicts_with = "project")]
        files: Vec<String>,

        /// Archive name without the .zip extension.
        #[arg(long)]
        name: Option<String>,
    },

    /// Download a video with yt-dlp (or another downloader) into the upload root.
    #[command(about = "Fetch a video by URL")]
    Fetch {
        /// Video URL.
        url: String,

        /// Downloader program.
        #[arg(long, default_value = "yt-dlp")]
        downloader: String,

        /// Extra argument passed to the downloader before the URL (repeatable).
        #[arg(long = "downloader-arg", allow_hyphen_values = true)]
        downloader_args: Vec<String>,

        /// Run extraction on the downloaded video.
        #[arg(long)]
        extract: bool,

        #[command(flatten)]
        args: ExtractArgs,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn init_logger(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    fern::Dispatch::new()
        .level(level)
        .format(|out, message, record| {
            let level = match record.level() {
                log::Level::Error => "ERROR".red().bold(),
                log::Level::Warn => "WARN".yellow().bold(),
                log::Level::Info => "INFO".green(),
                log::Level::Debug => "DEBUG".blue(),
                log::Level::Trace => "TRACE".dimmed(),
            };
            out.finish(format_args!("{level} [{}] {message}", record.target()))
        })
        .chain(std::io::stderr())
        .apply()?;
    Ok(())
}

fn storage_layout(global: &GlobalOptions) -> StorageLayout {
    let defaults = StorageLayout::default();
    StorageLayout::new(
        global.upload_root.clone().unwrap_or(defaults.upload_root),
        global.output_root.clone().unwrap_or(defaults.output_root),
        global.archive_root.clone().unwrap_or(defaults.archive_root),
    )
}

fn detection_options(detection: &DetectionArgs) -> ExtractOptions {
    ExtractOptions::new()
        .with_threshold(detection.threshold)
        .with_min_scene_len(detection.min_scene_len)
        .with_analysis_width(detection.analysis_width)
}

fn extract_options(
    args: &ExtractArgs,
    global: &GlobalOptions,
) -> Result<ExtractOptions, SceneSnapError> {
    let mut options = detection_options(&args.detection)
        .with_mode(args.mode.into())
        .with_interval_seconds(args.interval)
        .with_jpeg_quality(args.quality);
    if global.progress {
        options = options.with_progress(Arc::new(TerminalProgress::new()));
    }
    options.validate()?;
    Ok(options)
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    init_logger(global.verbose)?;

    if let Some(level) = &global.log_level {
        let parsed: FfmpegLogLevel = level.parse()?;
        scenesnap::set_ffmpeg_log_level(parsed);
    }
    Ok(())
}

/// Renders library progress callbacks as one indicatif bar per operation.
#[derive(Default)]
struct TerminalProgress {
    current: Mutex<Option<(OperationType, ProgressBar)>>,
}

impl TerminalProgress {
    fn new() -> Self {
        Self::default()
    }

    fn new_bar(operation: OperationType, total: Option<u64>) -> ProgressBar {
        let label = match operation {
            OperationType::SceneDetection => "detecting",
            OperationType::FrameExtraction => "extracting",
            OperationType::Archiving => "archiving",
            _ => "working",
        };
        let bar = match total {
            Some(total) => ProgressBar::new(total),
            None => ProgressBar::new_spinner(),
        };
        if let Ok(style) =
            ProgressStyle::with_template("{spinner:.green} {msg:>10} {bar:40.cyan/blue} {pos}/{len}")
        {
            bar.set_style(style.progress_chars("##-"));
        }
        bar.set_message(label);
        bar
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let Ok(mut current) = self.current.lock() else {
            return;
        };
        let stale = !matches!(&*current, Some((operation, _)) if *operation == info.operation);
        if stale {
            if let Some((_, bar)) = current.take() {
                bar.finish();
            }
            *current = Some((info.operation, Self::new_bar(info.operation, info.total)));
        }
        if let Some((_, bar)) = current.as_ref() {
            bar.set_position(info.current);
            if info.total.is_some_and(|total| info.current >= total) {
                bar.finish();
            }
        }
    }
}

impl Drop for TerminalProgress {
    fn drop(&mut self) {
        if let Ok(mut current) = self.current.lock() {
            if let Some((_, bar)) = current.take() {
                bar.finish();
            }
        }
    }
}

fn print_outcome(outcome: &ExtractionOutcome, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        let payload = json!({
            "project": outcome.project.as_str(),
            "mode": outcome.mode.as_str(),
            "scenes": outcome.scenes.len(),
            "frames": outcome.frame_paths(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        for path in outcome.frame_paths() {
            println!("{path}");
        }
        println!(
            "{} {}",
            "success:".green().bold(),
            format!(
                "Extracted {} frame(s) for project {}",
                outcome.frames.len(),
                outcome.project
            )
            .green()
        );
    }
    Ok(())
}

fn run_extraction(
    layout: StorageLayout,
    args: &ExtractArgs,
    global: &GlobalOptions,
    input: &Path,
    default_project: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let options = extract_options(args, global)?;
    let project = match args.project.as_deref().or(default_project) {
        Some(name) => ProjectId::new(name)?,
        None => ProjectId::generate(),
    };
    let pipeline = ExtractionPipeline::new(layout, options);
    let outcome = pipeline.run(project.as_str(), input)?;
    print_outcome(&outcome, global.json)
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    apply_global_options(&cli.global)?;
    let layout = storage_layout(&cli.global);

    match cli.command {
        Commands::Extract { input, args } => {
            run_extraction(layout, &args, &cli.global, &input, None)?;
        }
        Commands::Detect { input, detection } => {
            let mut options = detection_options(&detection);
            if cli.global.progress {
                options = options.with_progress(Arc::new(TerminalProgress::new()));
            }
            options.validate()?;

            let mut source = VideoSource::open(&input)?;
            let frames_per_second = source.frame_rate();
            let scenes = scenesnap::detect_scenes(&mut source, &options);
            source.close();
            let scenes = scenes?;

            if cli.global.json {
                let payload: Vec<_> = scenes
                    .iter()
                    .map(|scene| {
                        json!({
                            "start_frame": scene.start_frame,
                            "end_frame": scene.end_frame,
                            "start_seconds": scene.start_time(frames_per_second).as_secs_f64(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for (number, scene) in scenes.iter().enumerate() {
                    println!(
                        "scene {:>3}: frames {}..{} (starts at {:.3}s, {} frame(s))",
                        number + 1,
                        scene.start_frame,
                        scene.end_frame,
                        scene.start_time(frames_per_second).as_secs_f64(),
                        scene.len(),
                    );
                }
            }
        }
        Commands::Probe { input } => {
            let mut source = VideoSource::open(&input)?;
            let metadata = source.metadata().clone();
            source.close();
            if cli.global.json {
                let payload = json!({
                    "format": metadata.format,
                    "duration_seconds": metadata.duration.as_secs_f64(),
                    "width": metadata.width,
                    "height": metadata.height,
                    "fps": metadata.frames_per_second,
                    "frame_count": metadata.frame_count,
                    "codec": metadata.codec,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Format: {}", metadata.format);
                println!("Duration: {:?}", metadata.duration);
                println!(
                    "Video: {}x{} @ {:.2} fps, {} frames [{}]",
                    metadata.width,
                    metadata.height,
                    metadata.frames_per_second,
                    metadata.frame_count,
                    metadata.codec,
                );
            }
        }
        Commands::Archive {
            project,
            files,
            name,
        } => {
            let mut archiver = scenesnap::Archiver::new(&layout);
            if cli.global.progress {
                archiver = archiver.with_progress(Arc::new(TerminalProgress::new()));
            }
            let summary = match project {
                Some(project) => {
                    archiver.archive_project(&ProjectId::new(project)?, name.as_deref())?
                }
                None if !files.is_empty() => archiver
                    .archive_selected(&files, name.as_deref().unwrap_or(DEFAULT_SELECTION_NAME))?,
                None => return Err("provide a project or --files".into()),
            };

            if cli.global.json {
                let payload = json!({
                    "archive": summary.path.display().to_string(),
                    "entries": summary.entries,
                    "skipped": summary.skipped,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                for skipped in &summary.skipped {
                    eprintln!(
                        "{} {}",
                        "warning:".yellow().bold(),
                        format!("skipped {skipped}").yellow()
                    );
                }
                println!("{} {}", "saved".green().bold(), summary.path.display());
            }
        }
        Commands::Fetch {
            url,
            downloader,
            downloader_args,
            extract,
            args,
        } => {
            let downloader = Downloader::new(downloader).with_args(downloader_args);
            let staged = scenesnap::fetch_url(&layout, &url, &downloader)?;
            if extract {
                run_extraction(layout, &args, &cli.global, &staged.path, Some(staged.id.as_str()))?;
            } else if cli.global.json {
                let payload = json!({
                    "id": staged.id,
                    "path": staged.path.display().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("{} {}", "saved".green().bold(), staged.path.display());
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "scenesnap", &mut std::io::stdout());
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let json = cli.global.json;

    if let Err(error) = run(cli) {
        match error.downcast_ref::<SceneSnapError>().map(ErrorReport::from) {
            Some(report) if json => {
                let payload = json!({
                    "error": {
                        "kind": report.kind.as_str(),
                        "message": report.message,
                    }
                });
                println!("{payload}");
            }
            Some(report) => eprintln!("{} {}", format!("{}:", report.kind).red().bold(), report.message),
            None => eprintln!("{} {error}", "error:".red().bold()),
        }
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_defaults() {
        let cli = Cli::try_parse_from(["scenesnap", "extract", "in.mp4"]).unwrap();
        let Commands::Extract { input, args } = cli.command else {
            panic!("expected extract");
        };
        assert_eq!(input, PathBuf::from("in.mp4"));
        assert_eq!(args.mode, ModeArg::Scene);
        assert_eq!(args.interval, 5);
        assert_eq!(args.detection.threshold, 30.0);
        assert_eq!(args.detection.min_scene_len, 15);
        assert!(args.project.is_none());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "scenesnap",
            "extract",
            "in.mp4",
            "--mode",
            "interval",
            "--json",
            "--output-root",
            "out",
        ])
        .unwrap();
        assert!(cli.global.json);
        let layout = storage_layout(&cli.global);
        assert_eq!(layout.output_root, PathBuf::from("out"));
        assert_eq!(layout.upload_root, PathBuf::from("uploads"));
    }

    #[test]
    fn mode_is_validated_by_the_parser() {
        let error = Cli::try_parse_from(["scenesnap", "extract", "in.mp4", "--mode", "keyframes"])
            .unwrap_err();
        assert_eq!(error.kind(), clap::error::ErrorKind::InvalidValue);

        let cli = Cli::try_parse_from(["scenesnap", "extract", "in.mp4", "--mode", "scenes"])
            .unwrap();
        let Commands::Extract { args, .. } = cli.command else {
            panic!("expected extract");
        };
        let options = extract_options(&args, &cli.global).unwrap();
        assert_eq!(options.mode(), SelectionMode::Scene);

        let help = Cli::command()
            .find_subcommand_mut("extract")
            .map(|extract| extract.render_long_help().to_string())
            .unwrap();
        assert!(help.contains("interval"));
    }

    #[test]
    fn extract_options_reject_bad_values() {
        let cli = Cli::try_parse_from(["scenesnap", "extract", "in.mp4", "--interval", "0"])
            .unwrap();
        let Commands::Extract { args, .. } = cli.command else {
            panic!("expected extract");
        };
        let error = extract_options(&args, &cli.global).unwrap_err();
        assert_eq!(error.kind(), scenesnap::ErrorKind::Configuration);
    }

    #[test]
    fn archive_files_conflict_with_project() {
        assert!(
            Cli::try_parse_from(["scenesnap", "archive", "demo", "--files", "frames/demo/demo_1.jpg"])
                .is_err()
        );
        let cli =
            Cli::try_parse_from(["scenesnap", "archive", "--files", "a", "b", "--name", "picks"])
                .unwrap();
        let Commands::Archive { files, name, .. } = cli.command else {
            panic!("expected archive");
        };
        assert_eq!(files, ["a", "b"]);
        assert_eq!(name.as_deref(), Some("picks"));
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
