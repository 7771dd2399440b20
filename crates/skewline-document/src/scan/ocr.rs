// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Line recognizer backed by the `ocrs` engine, with neural network models
// executed via `rten`.
//
// Only available with the `ocr` feature:
//
// ```toml
// skewline-document = { path = "crates/skewline-document", features = ["ocr"] }
// ```
//
// The engine needs two model files, `text-detection.rten` and
// `text-recognition.rten`. Running `ocrs-cli` once downloads them into
// `$XDG_CACHE_HOME/ocrs` (typically `~/.cache/ocrs`), which is where
// `OcrConfig::default()` looks.

use std::path::{Path, PathBuf};

use image::{GrayImage, Luma, imageops};
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
use rten::Model;
use skewline_core::error::{Result, SkewlineError};
use tracing::{debug, info, instrument};

use crate::image::bitmap::{BACKGROUND, BinaryImage};
use crate::scan::recognize::LineRecognizer;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Background border added around a cropped line before detection.
const DEFAULT_LINE_MARGIN: u32 = 8;

/// `$XDG_CACHE_HOME/ocrs`, else `~/.cache/ocrs`.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Where to find the models, and how to frame a line for them.
#[derive(Debug, Clone, PartialEq)]
pub struct OcrConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
    /// Pixels of background added on every side of the line crop. Tight
    /// crops from the segmenter leave the detector no context otherwise.
    pub line_margin: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrConfig {
    /// Models named `text-detection.rten` and `text-recognition.rten` in `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::from_paths(
            dir.join(DETECTION_MODEL_FILENAME),
            dir.join(RECOGNITION_MODEL_FILENAME),
        )
    }

    /// Point at two specific model files.
    pub fn from_paths(
        detection_model: impl Into<PathBuf>,
        recognition_model: impl Into<PathBuf>,
    ) -> Self {
        Self {
            detection_model_path: detection_model.into(),
            recognition_model_path: recognition_model.into(),
            line_margin: DEFAULT_LINE_MARGIN,
        }
    }

    /// Override the background border added around each line.
    pub fn with_line_margin(mut self, margin: u32) -> Self {
        self.line_margin = margin;
        self
    }

    /// Check that both model files exist.
    pub fn validate(&self) -> Result<()> {
        for (role, path) in [
            ("detection", &self.detection_model_path),
            ("recognition", &self.recognition_model_path),
        ] {
            if !path.exists() {
                return Err(SkewlineError::OcrError(format!(
                    "{role} model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Reads single text lines with `ocrs`.
///
/// Loading the models is the expensive part; build one engine and reuse it.
/// `ocrs` and `rten` are very slow in debug builds.
pub struct OcrEngine {
    engine: OcrsEngine,
    line_margin: u32,
}

impl OcrEngine {
    /// Load both models and build the engine.
    ///
    /// Returns [`SkewlineError::OcrError`] if a model file is missing or corrupt.
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: OcrConfig) -> Result<Self> {
        config.validate()?;

        info!("Loading OCR models");
        let detection_model = load_model(&config.detection_model_path)?;
        let recognition_model = load_model(&config.recognition_model_path)?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| SkewlineError::OcrError(format!("failed to initialise OCR engine: {err}")))?;

        info!("OCR engine ready");
        Ok(Self {
            engine,
            line_margin: config.line_margin,
        })
    }

    /// Load models from the default cache directory.
    pub fn with_defaults() -> Result<Self> {
        Self::new(OcrConfig::default())
    }

    /// Load models from `dir`; see [`OcrConfig::from_dir`].
    pub fn from_model_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::new(OcrConfig::from_dir(dir))
    }
}

impl LineRecognizer for OcrEngine {
    /// Recognize the text in `line`. If the detector splits the crop into
    /// several pieces they are joined with single spaces.
    #[instrument(skip_all, fields(width = line.width(), height = line.height()))]
    fn recognize_line(&self, line: &BinaryImage) -> Result<String> {
        let framed = frame(line, self.line_margin);
        let rgb = image::DynamicImage::ImageLuma8(framed).into_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            SkewlineError::OcrError(format!("failed to create image source ({width}x{height}): {err}"))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| SkewlineError::OcrError(format!("OCR preprocessing failed: {err}")))?;
        let raw = self
            .engine
            .get_text(&input)
            .map_err(|err| SkewlineError::OcrError(format!("OCR text recognition failed: {err}")))?;

        let text = join_pieces(&raw);
        debug!(chars = text.chars().count(), "Line recognized");
        Ok(text)
    }
}

fn load_model(path: &Path) -> Result<Model> {
    Model::load_file(path).map_err(|err| {
        SkewlineError::OcrError(format!("failed to load model from {}: {err}", path.display()))
    })
}

/// Copy `line` onto a background canvas `margin` pixels larger on each side.
fn frame(line: &BinaryImage, margin: u32) -> GrayImage {
    let mut canvas = GrayImage::from_pixel(
        line.width() + 2 * margin,
        line.height() + 2 * margin,
        Luma([BACKGROUND]),
    );
    imageops::replace(&mut canvas, line.as_gray(), i64::from(margin), i64::from(margin));
    canvas
}

/// Collapse the engine's multi-line output into one line.
fn join_pieces(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_known_filenames() {
        let config = OcrConfig::default();
        assert!(config.detection_model_path.ends_with(DETECTION_MODEL_FILENAME));
        assert!(config.recognition_model_path.ends_with(RECOGNITION_MODEL_FILENAME));
        assert_eq!(config.line_margin, DEFAULT_LINE_MARGIN);
    }

    #[test]
    fn config_from_dir_and_paths() {
        let config = OcrConfig::from_dir("/tmp/models");
        assert_eq!(
            config.detection_model_path,
            PathBuf::from("/tmp/models/text-detection.rten")
        );
        let config = OcrConfig::from_paths("/a/d.rten", "/b/r.rten").with_line_margin(0);
        assert_eq!(config.recognition_model_path, PathBuf::from("/b/r.rten"));
        assert_eq!(config.line_margin, 0);
    }

    #[test]
    fn missing_models_are_an_ocr_error() {
        let err = OcrConfig::from_dir("/nonexistent/skewline/models")
            .validate()
            .unwrap_err();
        assert!(matches!(err, SkewlineError::OcrError(_)));
        assert!(OcrEngine::from_model_dir("/nonexistent/skewline/models").is_err());
    }

    #[test]
    fn frame_adds_background_border() {
        let line = BinaryImage::from_fn(10, 4, |_, _| true).unwrap();
        let framed = frame(&line, 3);
        assert_eq!(framed.dimensions(), (16, 10));
        assert_eq!(framed.get_pixel(0, 0).0[0], BACKGROUND);
        assert_eq!(framed.get_pixel(3, 3).0[0], 0);
        assert_eq!(framed.pixels().filter(|p| p.0[0] == 0).count(), 40);
    }

    #[test]
    fn pieces_are_joined_with_spaces() {
        assert_eq!(join_pieces("hello\n\n  world \n"), "hello world");
        assert_eq!(join_pieces(""), "");
    }
}
