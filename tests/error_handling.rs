//! Error handling integration tests.
//!
//! These tests verify that meaningful errors are returned for various
//! failure conditions, and that each one lands in the right kind.

use std::path::PathBuf;

use scenesnap::{ErrorKind, ErrorReport, FrameSource, ProjectId, SceneSnapError, VideoSource};

#[test]
fn open_nonexistent_file() {
    let result = VideoSource::open("this_file_does_not_exist.mp4");
    assert!(result.is_err());

    let error = result.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Open);
    let error_message = error.to_string();
    assert!(
        error_message.contains("Failed to open video file"),
        "Error message should mention file open failure: {error_message}",
    );
}

#[test]
fn open_invalid_file() {
    // Create a temporary file with garbage content.
    let temporary_directory = tempfile::tempdir().expect("Failed to create temp dir");
    let invalid_file_path = temporary_directory.path().join("invalid.mp4");
    std::fs::write(&invalid_file_path, b"this is not a media file")
        .expect("Failed to write invalid file");

    let result = VideoSource::open(&invalid_file_path);
    assert!(result.is_err(), "Expected error for invalid media file");
    let error = result.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Open);
    match error {
        SceneSnapError::FileOpen { path, reason } => {
            assert_eq!(path, invalid_file_path);
            assert!(!reason.is_empty());
        }
        other => panic!("Expected FileOpen for an unreadable container, got {other:?}"),
    }
}

#[test]
fn frame_out_of_range() {
    let path = "tests/fixtures/sample_video.mp4";
    if !std::path::Path::new(path).exists() {
        return;
    }

    let mut source = VideoSource::open(path).expect("Failed to open fixture");
    let total = source.frame_count();
    let error = source.seek_and_decode(total + 100).unwrap_err();
    assert!(matches!(error, SceneSnapError::FrameOutOfRange { .. }));
    assert_eq!(error.kind(), ErrorKind::Decode);
}

#[test]
fn kinds_cover_the_taxonomy() {
    let cases = [
        (
            SceneSnapError::Acquisition {
                reason: "exit status 1".to_string(),
            },
            ErrorKind::Acquisition,
        ),
        (
            SceneSnapError::FileOpen {
                path: PathBuf::from("a.mp4"),
                reason: "Invalid data".to_string(),
            },
            ErrorKind::Open,
        ),
        (SceneSnapError::NoVideoStream(PathBuf::from("a.wav")), ErrorKind::Open),
        (SceneSnapError::NoDecodableFrames("a".to_string()), ErrorKind::Open),
        (SceneSnapError::VideoDecode("eof".to_string()), ErrorKind::Decode),
        (
            SceneSnapError::FrameOutOfRange {
                frame_number: 10,
                total_frames: 5,
            },
            ErrorKind::Decode,
        ),
        (
            SceneSnapError::Configuration("interval".to_string()),
            ErrorKind::Configuration,
        ),
        (
            SceneSnapError::Io(std::io::Error::other("disk full")),
            ErrorKind::Storage,
        ),
    ];
    for (error, kind) in cases {
        assert_eq!(error.kind(), kind, "{error}");
    }
}

#[test]
fn report_carries_kind_and_message() {
    let error = ProjectId::new("../../etc").unwrap_err();
    let report = ErrorReport::from(&error);
    assert_eq!(report.kind, ErrorKind::InvalidProjectIdentifier);
    assert_eq!(report.kind.to_string(), "invalid_project_identifier");
    assert!(report.message.contains("../../etc"), "{}", report.message);
    assert_eq!(report, ErrorReport::from(error));
}

#[test]
fn out_of_range_message_names_both_numbers() {
    let error = SceneSnapError::FrameOutOfRange {
        frame_number: 400,
        total_frames: 300,
    };
    let message = error.to_string();
    assert!(message.contains("400") && message.contains("300"), "{message}");
}
