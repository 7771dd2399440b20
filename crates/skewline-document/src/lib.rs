// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// skewline-document — Image preparation for single-line text recognition.
//
// Provides the 1-bit pixel buffer and codec wrapper (image), and the deskew
// pipeline (scan): adaptive binarization, variance-maximizing skew search,
// area-mapped rotation and whitespace-delimited line segmentation.

pub mod image;
pub mod scan;

// Re-export the primary structs so callers can use `skewline_document::DeskewPipeline` etc.
pub use crate::image::bitmap::BinaryImage;
pub use scan::binarize::Binarizer;
pub use scan::pipeline::{DeskewOutput, DeskewPipeline, Deskewed, FileOutcome};
pub use scan::recognize::{LineReader, LineRecognizer, RecognizedLine, StageTimings};
pub use scan::rotate::{Canvas, Rotator};
pub use scan::segment::{LineSegmenter, Segment, SegmentedLine};
pub use scan::skew::{AngleEstimate, AngleEstimator};

#[cfg(feature = "ocr")]
pub use scan::ocr::{OcrConfig, OcrEngine};
