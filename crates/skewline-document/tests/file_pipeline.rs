// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// File-to-file runs of the deskew pipeline against temporary directories.

use std::path::Path;

use image::{GrayImage, Luma};
use skewline_core::types::{OutputTarget, SelectionMode};
use skewline_core::{DeskewConfig, SkewlineError};
use skewline_document::{DeskewPipeline, FileOutcome, LineReader, LineRecognizer};
use skewline_document::BinaryImage;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Write a 320x240 page with three dark text bars to `path`.
fn write_page(path: &Path) {
    let bars = [(30u32, 44u32), (110, 130), (180, 192)];
    GrayImage::from_fn(320, 240, |x, y| {
        let text = (40..280).contains(&x) && bars.iter().any(|&(a, b)| (a..b).contains(&y));
        Luma([if text { 35 } else { 225 }])
    })
    .save(path)
    .unwrap();
}

fn pipeline() -> DeskewPipeline {
    DeskewPipeline::new(DeskewConfig::default()).unwrap()
}

#[test]
fn overwrite_replaces_input_with_the_line() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("page.png");
    write_page(&input);

    let outcome = pipeline().deskew_file(&input, &OutputTarget::Overwrite).unwrap();
    let FileOutcome::Written { path, segment, .. } = outcome else {
        panic!("expected a written line, got {outcome:?}");
    };
    assert_eq!(path, input);

    let written = image::open(&input).unwrap().to_luma8();
    assert_eq!(written.height(), segment.height);
    assert!(written.height() < 40, "line crop should be short, got {}", written.height());
    assert!(written.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
}

#[test]
fn separate_output_leaves_input_alone() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("page.png");
    let output = dir.path().join("line.png");
    write_page(&input);
    let before = std::fs::read(&input).unwrap();

    let outcome = pipeline()
        .deskew_file(&input, &OutputTarget::Path(output.clone()))
        .unwrap();

    assert!(outcome.is_written());
    assert!(output.exists());
    assert_eq!(std::fs::read(&input).unwrap(), before);
}

#[test]
fn middle_mode_from_json_config() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("skewline.json");
    std::fs::write(&config_path, r#"{ "selection_mode": "middle" }"#).unwrap();
    let config = DeskewConfig::from_json_file(&config_path).unwrap();
    assert_eq!(config.selection_mode, SelectionMode::Middle);

    let input = dir.path().join("page.png");
    write_page(&input);
    let outcome = DeskewPipeline::new(config)
        .unwrap()
        .deskew_file(&input, &OutputTarget::Overwrite)
        .unwrap();

    let FileOutcome::Written { segment, .. } = outcome else {
        panic!("expected the central bar, got {outcome:?}");
    };
    assert!(segment.height >= 20, "central bar is the thickest: {segment:?}");
}

#[test]
fn blank_page_is_not_found_and_untouched() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("blank.png");
    GrayImage::from_pixel(160, 120, Luma([245])).save(&input).unwrap();
    let before = std::fs::read(&input).unwrap();

    let outcome = pipeline().deskew_file(&input, &OutputTarget::Overwrite).unwrap();

    assert!(matches!(outcome, FileOutcome::NotFound { .. }));
    assert_eq!(std::fs::read(&input).unwrap(), before);
}

#[test]
fn corrupt_and_missing_inputs_are_errors() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let corrupt = dir.path().join("corrupt.png");
    std::fs::write(&corrupt, b"this is not an image").unwrap();

    let err = pipeline()
        .deskew_file(&corrupt, &OutputTarget::Overwrite)
        .unwrap_err();
    assert!(matches!(err, SkewlineError::ImageError(_)), "{err:?}");

    let err = pipeline()
        .deskew_file(dir.path().join("missing.png"), &OutputTarget::Overwrite)
        .unwrap_err();
    assert!(matches!(err, SkewlineError::Io(_)), "{err:?}");
}

struct Echo;

impl LineRecognizer for Echo {
    fn recognize_line(&self, line: &BinaryImage) -> skewline_core::Result<String> {
        Ok(format!("{} ink", line.ink_count()))
    }
}

#[test]
fn reader_reads_a_file_without_modifying_it() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("page.png");
    write_page(&input);
    let before = std::fs::read(&input).unwrap();

    let reader = LineReader::new(pipeline(), Echo);
    let line = reader.read_file(&input).unwrap().expect("a line");

    assert!(line.text.ends_with(" ink"));
    assert!(line.angle.abs() <= 45.0);
    assert_eq!(std::fs::read(&input).unwrap(), before);
}
