// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Deskew pipeline driver — binarize, estimate the skew, rotate, and cut out
// one text line, either in memory or file to file.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::Serialize;
use skewline_core::DeskewConfig;
use skewline_core::error::Result;
use skewline_core::types::OutputTarget;
use tracing::{info, instrument};

use crate::image::bitmap::BinaryImage;
use crate::image::codec;
use crate::scan::binarize::{BinarizeReport, Binarizer};
use crate::scan::rotate::{Canvas, Rotator};
use crate::scan::segment::{LineSegmenter, Segment, SegmentedLine};
use crate::scan::skew::{AngleEstimate, AngleEstimator};

/// A binarized image after rotation, before segmentation.
#[derive(Debug, Clone, PartialEq)]
pub struct Deskewed {
    pub image: BinaryImage,
    pub estimate: AngleEstimate,
    pub binarize: BinarizeReport,
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct DeskewOutput {
    pub estimate: AngleEstimate,
    pub binarize: BinarizeReport,
    /// Size of the rotated page the line was cut from.
    pub deskewed_dimensions: (u32, u32),
    /// The selected line, or `None` when no band qualified.
    pub line: Option<SegmentedLine>,
}

/// What [`DeskewPipeline::deskew_file`] did.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    /// The selected line was written to `path`.
    Written {
        path: PathBuf,
        segment: Segment,
        angle: f64,
    },
    /// No line qualified. Nothing was written.
    NotFound { angle: f64 },
}

impl FileOutcome {
    /// The estimated skew angle, in degrees, whether or not a line was written.
    pub fn angle(&self) -> f64 {
        match self {
            Self::Written { angle, .. } | Self::NotFound { angle } => *angle,
        }
    }

    /// Whether a line image was written.
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written { .. })
    }
}

/// The four stages wired together from one [`DeskewConfig`].
///
/// Stages run strictly in sequence and each hands an owned buffer to the
/// next; intermediate buffers are dropped as soon as they are consumed.
#[derive(Debug, Clone)]
pub struct DeskewPipeline {
    config: DeskewConfig,
    binarizer: Binarizer,
    estimator: AngleEstimator,
    rotator: Rotator,
    segmenter: LineSegmenter,
}

impl DeskewPipeline {
    /// Validate `config` and build every stage from it.
    pub fn new(config: DeskewConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            binarizer: Binarizer::from_config(&config),
            estimator: AngleEstimator::from_config(&config)?,
            rotator: Rotator::new(Canvas::Expand),
            segmenter: LineSegmenter::from_config(&config),
            config,
        })
    }

    /// The validated configuration the stages were built from.
    pub fn config(&self) -> &DeskewConfig {
        &self.config
    }

    /// Binarize and straighten `image` without segmenting it.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn deskew(&self, image: DynamicImage) -> Result<Deskewed> {
        let (binary, binarize) = self.binarizer.binarize_with_report(image)?;
        let estimate = self.estimator.estimate(&binary);
        let image = self.rotator.rotate(&binary, estimate.angle);
        drop(binary);

        info!(
            angle = estimate.angle,
            width = image.width(),
            height = image.height(),
            "Image deskewed"
        );
        Ok(Deskewed {
            image,
            estimate,
            binarize,
        })
    }

    /// Run all four stages on `image`.
    #[instrument(skip_all, fields(mode = %self.config.selection_mode))]
    pub fn process(&self, image: DynamicImage) -> Result<DeskewOutput> {
        let deskewed = self.deskew(image)?;
        let line = self.segmenter.extract(&deskewed.image)?;
        Ok(DeskewOutput {
            estimate: deskewed.estimate,
            binarize: deskewed.binarize,
            deskewed_dimensions: deskewed.image.dimensions(),
            line,
        })
    }

    /// Load `input`, run the pipeline and write the selected line to
    /// `target`. With [`OutputTarget::Overwrite`] the input file is replaced.
    ///
    /// When no line qualifies the output is left untouched and the outcome is
    /// [`FileOutcome::NotFound`].
    #[instrument(skip_all, fields(input = %input.as_ref().display()))]
    pub fn deskew_file(
        &self,
        input: impl AsRef<Path>,
        target: &OutputTarget,
    ) -> Result<FileOutcome> {
        let input = input.as_ref();
        let output = self.process(codec::load(input)?)?;
        let angle = output.estimate.angle;

        let Some(line) = output.line else {
            info!(angle, "No text line selected; output not written");
            return Ok(FileOutcome::NotFound { angle });
        };

        let path = target.resolve(input).to_path_buf();
        codec::store(&line.image, &path)?;
        info!(
            output = %path.display(),
            top = line.segment.top,
            height = line.segment.height,
            "Text line written"
        );
        Ok(FileOutcome::Written {
            path,
            segment: line.segment,
            angle,
        })
    }
}
