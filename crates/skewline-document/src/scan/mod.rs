// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Deskew pipeline — binarization, rotation-angle search, rotation, line
// segmentation, and the hand-off to a text recognizer.

pub mod binarize;
pub mod pipeline;
pub mod recognize;
pub mod rotate;
pub mod segment;
pub mod skew;

#[cfg(feature = "ocr")]
pub mod ocr;

pub use binarize::Binarizer;
pub use pipeline::DeskewPipeline;
pub use recognize::{LineReader, LineRecognizer};

#[cfg(feature = "ocr")]
pub use ocr::OcrEngine;
