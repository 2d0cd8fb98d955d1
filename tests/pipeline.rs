//! End-to-end pipeline tests.
//!
//! Most tests drive the pipeline with an in-memory source and write into a
//! temporary storage layout. Tests touching real media require
//! `tests/fixtures/sample_video.mp4` and are skipped when it is absent.

mod common;

use std::{
    fs,
    sync::{Arc, Mutex},
};

use common::{SyntheticSource, UndecodableSource};
use scenesnap::{
    ErrorKind, ErrorReport, ExtractOptions, ExtractionPipeline, OperationType, ProgressCallback,
    ProgressInfo, Project, ProjectId, SceneSnapError, SelectionMode, StorageLayout,
};

const RED: [u8; 3] = [220, 40, 40];

fn pipeline(root: &tempfile::TempDir, options: ExtractOptions) -> ExtractionPipeline {
    ExtractionPipeline::new(StorageLayout::under(root.path()), options)
}

fn project(pipeline: &ExtractionPipeline, name: &str) -> Project {
    Project::new(pipeline.layout(), ProjectId::new(name).unwrap())
}

fn interval_options(seconds: u32) -> ExtractOptions {
    ExtractOptions::new()
        .with_mode(SelectionMode::Interval)
        .with_interval_seconds(seconds)
}

#[test]
fn interval_mode_on_static_ten_second_video() {
    let root = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&root, interval_options(5));
    let project = project(&pipeline, "static");
    let mut source = SyntheticSource::new(300, 30.0);

    let outcome = pipeline.run_with_source(&project, &mut source).unwrap();

    let source_frames: Vec<u64> = outcome.frames.iter().map(|f| f.source_frame).collect();
    assert_eq!(source_frames, vec![0, 150]);
    assert_eq!(outcome.file_names(), vec!["static_1.jpg", "static_2.jpg"]);
    assert!(outcome.scenes.is_empty());
    assert_eq!(source.scan_calls, 0, "interval mode needs no detection pass");
    assert!(source.closed);
}

#[test]
fn scene_mode_extracts_first_frame_of_each_scene() {
    let root = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&root, ExtractOptions::new());
    let project = project(&pipeline, "cut");
    let mut source = SyntheticSource::new(300, 30.0).cut_at(90, RED);

    let outcome = pipeline.run_with_source(&project, &mut source).unwrap();

    assert_eq!(outcome.scenes.len(), 2);
    assert_eq!(outcome.scenes[0].end_frame, 90);
    assert_eq!(outcome.scenes[1].start_frame, 90);
    assert_eq!(outcome.scenes[1].end_frame, 300);
    assert_eq!(source.seeks, vec![0, 90]);
    assert_eq!(
        outcome.frame_paths(),
        vec!["frames/cut/cut_1.jpg", "frames/cut/cut_2.jpg"]
    );

    let second = image::open(&outcome.frames[1].path).unwrap().to_rgb8();
    assert_eq!(second.dimensions(), (64, 36));
    let [r, g, b] = second.get_pixel(32, 18).0;
    assert!(r > 180 && g < 90 && b < 90, "expected red, got {:?}", (r, g, b));
}

#[test]
fn scenes_past_the_seekable_range_are_clipped() {
    let root = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&root, ExtractOptions::new());
    let project = project(&pipeline, "estimate");
    // The declared count undershoots what the scan actually decodes.
    let mut source = SyntheticSource::new(100, 30.0)
        .cut_at(50, RED)
        .cut_at(110, [40, 40, 220])
        .scanning(120);

    let outcome = pipeline.run_with_source(&project, &mut source).unwrap();

    let scenes: Vec<(u64, u64)> = outcome
        .scenes
        .iter()
        .map(|scene| (scene.start_frame, scene.end_frame))
        .collect();
    assert_eq!(scenes, vec![(0, 50), (50, 100)]);
    assert_eq!(outcome.frames.len(), outcome.scenes.len());
    assert_eq!(source.seeks, vec![0, 50]);
}

#[test]
fn returned_files_exist_at_their_public_paths() {
    let root = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&root, interval_options(1));
    let project = project(&pipeline, "roundtrip");
    let mut source = SyntheticSource::new(200, 25.0).cut_at(100, RED);

    let outcome = pipeline.run_with_source(&project, &mut source).unwrap();
    assert_eq!(outcome.frames.len(), 8);

    // `frames/...` is relative to the parent of the output root.
    let public_root = pipeline.layout().output_root.parent().unwrap();
    for frame in &outcome.frames {
        assert!(frame.path.is_file(), "{} missing", frame.path.display());
        assert!(public_root.join(frame.public_path()).is_file());
    }
}

#[test]
fn output_indices_stay_contiguous_when_frames_fail() {
    let root = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&root, interval_options(1));
    let project = project(&pipeline, "gaps");
    let mut source = SyntheticSource::new(300, 30.0).failing_seeks([30, 120, 270]);

    let outcome = pipeline.run_with_source(&project, &mut source).unwrap();

    let indices: Vec<u32> = outcome.frames.iter().map(|f| f.index).collect();
    assert_eq!(indices, (1..=7).collect::<Vec<_>>());
    let source_frames: Vec<u64> = outcome.frames.iter().map(|f| f.source_frame).collect();
    assert_eq!(source_frames, vec![0, 60, 90, 150, 180, 210, 240]);

    let mut on_disk: Vec<String> = fs::read_dir(&project.output_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    on_disk.sort();
    let mut expected: Vec<String> = (1..=7).map(|n| format!("gaps_{n}.jpg")).collect();
    expected.sort();
    assert_eq!(on_disk, expected);
}

#[test]
fn failed_scene_start_is_skipped() {
    let root = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&root, ExtractOptions::new());
    let project = project(&pipeline, "skip");
    let mut source = SyntheticSource::new(300, 30.0)
        .cut_at(90, RED)
        .failing_seeks([0]);

    let outcome = pipeline.run_with_source(&project, &mut source).unwrap();

    assert_eq!(outcome.scenes.len(), 2);
    assert_eq!(outcome.frames.len(), 1);
    assert_eq!(outcome.frames[0].index, 1);
    assert_eq!(outcome.frames[0].source_frame, 90);
    assert_eq!(outcome.frames[0].file_name, "skip_1.jpg");
}

#[test]
fn every_selected_frame_failing_is_an_open_error() {
    let root = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&root, interval_options(5));
    let project = project(&pipeline, "broken");
    let mut source = SyntheticSource::new(300, 30.0).failing_seeks([0, 150]);

    let error = pipeline.run_with_source(&project, &mut source).unwrap_err();
    assert!(matches!(error, SceneSnapError::NoDecodableFrames(_)));
    assert_eq!(error.kind(), ErrorKind::Open);
    assert!(source.closed);
}

#[test]
fn source_without_decodable_frames_is_an_open_error() {
    let root = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&root, ExtractOptions::new());
    let project = project(&pipeline, "nothing");
    let mut source = UndecodableSource {
        frame_count: 120,
        ..Default::default()
    };

    let error = pipeline.run_with_source(&project, &mut source).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Open);
    assert!(source.closed);
    assert!(!project.output_dir.exists());
}

#[test]
fn empty_video_is_an_empty_success() {
    let root = tempfile::tempdir().unwrap();
    for options in [ExtractOptions::new(), interval_options(5)] {
        let pipeline = pipeline(&root, options);
        let project = project(&pipeline, "empty");
        let mut source = SyntheticSource::new(0, 30.0);

        let outcome = pipeline.run_with_source(&project, &mut source).unwrap();
        assert!(outcome.frames.is_empty());
        assert!(outcome.scenes.is_empty());
    }
}

#[test]
fn degenerate_frame_rate_still_progresses() {
    let root = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&root, interval_options(5));
    let project = project(&pipeline, "slow");
    let mut source = SyntheticSource::new(4, 0.0);

    let outcome = pipeline.run_with_source(&project, &mut source).unwrap();
    let source_frames: Vec<u64> = outcome.frames.iter().map(|f| f.source_frame).collect();
    assert_eq!(source_frames, vec![0, 1, 2, 3]);
}

#[test]
fn rerun_overwrites_the_same_files() {
    let root = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&root, interval_options(5));
    let project = project(&pipeline, "again");

    let first = pipeline
        .run_with_source(&project, &mut SyntheticSource::new(300, 30.0))
        .unwrap();
    let second = pipeline
        .run_with_source(&project, &mut SyntheticSource::new(300, 30.0).cut_at(0, RED))
        .unwrap();

    assert_eq!(first.file_names(), second.file_names());
    assert_eq!(fs::read_dir(&project.output_dir).unwrap().count(), 2);
    let pixel = image::open(&second.frames[0].path).unwrap().to_rgb8();
    assert!(pixel.get_pixel(0, 0).0[0] > 180, "file was not rewritten");
}

#[test]
fn traversal_identifier_is_rejected_before_any_io() {
    let root = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&root, ExtractOptions::new());

    let error = pipeline
        .run("../../etc", root.path().join("missing.mp4"))
        .unwrap_err();

    assert!(matches!(error, SceneSnapError::InvalidProjectIdentifier { .. }));
    assert_eq!(error.kind(), ErrorKind::InvalidProjectIdentifier);
    assert!(!pipeline.layout().output_root.exists());
    assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
}

#[test]
fn invalid_options_are_rejected_before_opening() {
    let root = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&root, ExtractOptions::new().with_threshold(f64::NAN));

    let error = pipeline
        .run("fine", root.path().join("missing.mp4"))
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Configuration);

    let pipeline = self::pipeline(&root, interval_options(0));
    let project = project(&pipeline, "fine");
    let mut source = SyntheticSource::new(30, 30.0);
    let error = pipeline.run_with_source(&project, &mut source).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Configuration);
    assert!(source.closed);
    assert!(!project.output_dir.exists());
}

#[test]
fn corrupt_video_is_an_open_error_without_output() {
    let root = tempfile::tempdir().unwrap();
    let video = root.path().join("corrupt.mp4");
    fs::write(&video, b"this is not a video file").unwrap();
    let pipeline = pipeline(&root, ExtractOptions::new());

    let error = pipeline.run("corrupt", &video).unwrap_err();

    assert_eq!(error.kind(), ErrorKind::Open);
    let report = ErrorReport::from(&error);
    assert_eq!(report.kind.as_str(), "open_error");
    assert!(!report.message.is_empty());
    assert!(!pipeline.layout().output_root.join("corrupt").exists());
}

#[test]
fn missing_video_is_an_open_error() {
    let root = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&root, ExtractOptions::new());
    let error = pipeline
        .run("missing", root.path().join("nope.mp4"))
        .unwrap_err();
    assert!(matches!(error, SceneSnapError::FileOpen { .. }));
}

#[derive(Default)]
struct RecordingProgress {
    events: Mutex<Vec<(OperationType, u64, Option<u64>)>>,
}

impl ProgressCallback for RecordingProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.events
            .lock()
            .unwrap()
            .push((info.operation, info.current, info.total));
    }
}

#[test]
fn progress_covers_detection_then_extraction() {
    let root = tempfile::tempdir().unwrap();
    let progress = Arc::new(RecordingProgress::default());
    let options = ExtractOptions::new()
        .with_progress(progress.clone())
        .with_batch_size(50);
    let pipeline = pipeline(&root, options);
    let project = project(&pipeline, "progress");
    let mut source = SyntheticSource::new(300, 30.0).cut_at(90, RED);

    pipeline.run_with_source(&project, &mut source).unwrap();

    let events = progress.events.lock().unwrap();
    let first_extraction = events
        .iter()
        .position(|(operation, _, _)| *operation == OperationType::FrameExtraction)
        .unwrap();
    assert!(
        events[..first_extraction]
            .iter()
            .all(|(operation, _, _)| *operation == OperationType::SceneDetection)
    );
    assert!(events.contains(&(OperationType::SceneDetection, 300, Some(300))));
    assert_eq!(
        events.last(),
        Some(&(OperationType::FrameExtraction, 2, Some(2)))
    );
}

#[test]
fn extracts_sample_video() {
    let Some(path) = common::sample_video() else {
        return;
    };
    let root = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&root, ExtractOptions::new());

    let outcome = pipeline.run("sample", path).unwrap();

    assert!(!outcome.frames.is_empty());
    assert_eq!(outcome.frames[0].source_frame, 0);
    assert!(outcome.frames.len() <= outcome.scenes.len());
    for (position, frame) in outcome.frames.iter().enumerate() {
        assert_eq!(frame.index as usize, position + 1);
        assert!(frame.path.is_file());
    }
}

#[test]
fn extracts_sample_video_at_intervals() {
    let Some(path) = common::sample_video() else {
        return;
    };
    let root = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&root, interval_options(1));

    let outcome = pipeline.run("sample", path).unwrap();
    assert!(!outcome.frames.is_empty());
    assert!(
        outcome
            .frames
            .windows(2)
            .all(|pair| pair[0].source_frame < pair[1].source_frame)
    );
}

#[cfg(feature = "rayon")]
#[test]
fn batch_results_follow_input_order() {
    let root = tempfile::tempdir().unwrap();
    let pipeline = pipeline(&root, ExtractOptions::new());
    let jobs = vec![
        ("first".to_string(), root.path().join("a.mp4")),
        ("../bad".to_string(), root.path().join("b.mp4")),
    ];

    let results = pipeline.run_batch(&jobs);

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].as_ref().unwrap_err().kind(), ErrorKind::Open);
    assert_eq!(
        results[1].as_ref().unwrap_err().kind(),
        ErrorKind::InvalidProjectIdentifier
    );
}
