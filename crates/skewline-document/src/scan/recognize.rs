// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition seam — hands the selected text line to a single-line
// recognizer and times each stage.

use std::path::Path;
use std::time::{Duration, Instant};

use image::DynamicImage;
use serde::Serialize;
use skewline_core::error::Result;
use tracing::{debug, info, instrument};

use crate::image::bitmap::BinaryImage;
use crate::image::codec;
use crate::scan::pipeline::DeskewPipeline;
use crate::scan::segment::Segment;

/// Anything that can turn one line of binary text into a string.
pub trait LineRecognizer {
    /// Read the text of `line`, a full-width crop of one text band.
    fn recognize_line(&self, line: &BinaryImage) -> Result<String>;
}

impl<R: LineRecognizer + ?Sized> LineRecognizer for &R {
    fn recognize_line(&self, line: &BinaryImage) -> Result<String> {
        (**self).recognize_line(line)
    }
}

impl<R: LineRecognizer + ?Sized> LineRecognizer for Box<R> {
    fn recognize_line(&self, line: &BinaryImage) -> Result<String> {
        (**self).recognize_line(line)
    }
}

/// Wall-clock time spent in each stage of a read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageTimings {
    /// Binarize, angle search, rotation and segmentation.
    pub deskew: Duration,
    pub recognize: Duration,
}

impl StageTimings {
    /// Deskew plus recognition time.
    pub fn total(&self) -> Duration {
        self.deskew + self.recognize
    }
}

/// Text read from one line of a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognizedLine {
    pub text: String,
    pub segment: Segment,
    /// Rotation applied to straighten the page, in degrees.
    pub angle: f64,
    pub timings: StageTimings,
}

/// Deskews a page, picks a line and reads it.
#[derive(Debug, Clone)]
pub struct LineReader<R> {
    pipeline: DeskewPipeline,
    recognizer: R,
}

impl<R: LineRecognizer> LineReader<R> {
    /// Pair a configured pipeline with a recognizer.
    pub fn new(pipeline: DeskewPipeline, recognizer: R) -> Self {
        Self {
            pipeline,
            recognizer,
        }
    }

    /// The pipeline that prepares each line.
    pub fn pipeline(&self) -> &DeskewPipeline {
        &self.pipeline
    }

    /// The recognizer lines are handed to.
    pub fn recognizer(&self) -> &R {
        &self.recognizer
    }

    /// Read the selected line of `image`. `Ok(None)` when the page has no
    /// qualifying line; the recognizer is not called in that case.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn read_image(&self, image: DynamicImage) -> Result<Option<RecognizedLine>> {
        let started = Instant::now();
        let output = self.pipeline.process(image)?;
        let deskew = started.elapsed();
        debug!(elapsed_ms = deskew.as_millis() as u64, "Deskew stage finished");

        let Some(line) = output.line else {
            info!(angle = output.estimate.angle, "Nothing to recognize");
            return Ok(None);
        };

        let started = Instant::now();
        let text = self.recognizer.recognize_line(&line.image)?;
        let recognize = started.elapsed();
        debug!(elapsed_ms = recognize.as_millis() as u64, "Recognition stage finished");

        info!(chars = text.chars().count(), top = line.segment.top, "Line recognized");
        Ok(Some(RecognizedLine {
            text,
            segment: line.segment,
            angle: output.estimate.angle,
            timings: StageTimings { deskew, recognize },
        }))
    }

    /// Load `path` and read its selected line. The file is not modified.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<Option<RecognizedLine>> {
        self.read_image(codec::load(path)?)
    }
}
