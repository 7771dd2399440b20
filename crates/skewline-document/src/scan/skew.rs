// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rotation angle estimator — bisection search for the rotation that maximises
// the variance of the per-row ink density profile.
//
// A straight page has rows that either cross a text line (dense) or fall in
// the gap between lines (empty), so the row profile is strongly bimodal. Skew
// smears ink across neighbouring rows and flattens it. The search assumes a
// single peak over the range; mixed-orientation pages can lead it to a local
// one.

use image::imageops::{self, FilterType};
use serde::Serialize;
use skewline_core::DeskewConfig;
use skewline_core::config::validate_accuracy;
use skewline_core::error::{Result, SkewlineError};
use skewline_core::types::AngleRange;
use tracing::{debug, info, instrument, trace};

use crate::image::bitmap::BinaryImage;
use crate::scan::rotate::{Canvas, Rotator};

// -- Row ink profile ----------------------------------------------------------

/// Fraction of ink pixels in each row of an image.
#[derive(Debug, Clone, PartialEq)]
pub struct RowInkProfile {
    densities: Vec<f64>,
}

impl RowInkProfile {
    /// Measure the ink fraction of every row of `image`.
    pub fn from_image(image: &BinaryImage) -> Self {
        let width = image.width() as f64;
        let densities = (0..image.height())
            .map(|y| image.row_ink_count(y) as f64 / width)
            .collect();
        Self { densities }
    }

    /// Per-row ink fractions, top to bottom.
    pub fn densities(&self) -> &[f64] {
        &self.densities
    }

    /// Mean row density; 0 for an empty profile.
    pub fn mean(&self) -> f64 {
        if self.densities.is_empty() {
            return 0.0;
        }
        self.densities.iter().sum::<f64>() / self.densities.len() as f64
    }

    /// Population variance of the row densities.
    pub fn variance(&self) -> f64 {
        if self.densities.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        self.densities
            .iter()
            .map(|d| (d - mean) * (d - mean))
            .sum::<f64>()
            / self.densities.len() as f64
    }
}

// -- Search state -------------------------------------------------------------

/// Result of feeding one pair of probe scores into the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStep {
    /// The bracket shrank and is still wider than the accuracy.
    Narrowed,
    /// The bracket is now within the accuracy.
    Converged,
    /// Both probes scored exactly the same; the search stops where it is.
    Tied,
}

/// Bracket `[min, max]` around the current best angle, in degrees.
///
/// `min <= angle <= max` holds after every step and the bracket only ever
/// shrinks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleSearchState {
    min: f64,
    max: f64,
    angle: f64,
    accuracy: f64,
}

impl AngleSearchState {
    /// Start a search over `range`, bracketing the whole range with the angle
    /// at its midpoint. Rejects a non-positive accuracy and an empty range.
    pub fn new(range: AngleRange, accuracy: f64) -> Result<Self> {
        validate_accuracy(accuracy)?;
        if !range.min.is_finite() || !range.max.is_finite() || range.min >= range.max {
            return Err(SkewlineError::InvalidConfig(format!(
                "angle search range must satisfy min < max, got [{}, {}]",
                range.min, range.max
            )));
        }
        Ok(Self {
            min: range.min,
            max: range.max,
            angle: range.midpoint(),
            accuracy,
        })
    }

    /// Lower end of the bracket, in degrees.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper end of the bracket, in degrees.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Current best angle, in degrees.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Whether the bracket is no wider than the accuracy.
    pub fn is_converged(&self) -> bool {
        self.max - self.min <= self.accuracy
    }

    /// The two angles to score next: halfway from the current angle towards
    /// each end of the bracket.
    pub fn probes(&self) -> (f64, f64) {
        (
            self.angle - (self.angle - self.min) / 2.0,
            self.max - (self.max - self.angle) / 2.0,
        )
    }

    /// Narrow the bracket towards whichever probe scored higher.
    pub fn narrow(&mut self, low_score: f64, high_score: f64) -> SearchStep {
        if low_score > high_score {
            self.max = self.angle;
        } else if high_score > low_score {
            self.min = self.angle;
        } else {
            return SearchStep::Tied;
        }
        self.angle = self.max - (self.max - self.min) / 2.0;

        if self.is_converged() {
            SearchStep::Converged
        } else {
            SearchStep::Narrowed
        }
    }
}

// -- Estimator ----------------------------------------------------------------

/// The angle found by a search, plus how it got there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AngleEstimate {
    /// Degrees to pass to the rotator to straighten the image.
    pub angle: f64,
    /// Probe pairs scored.
    pub iterations: u32,
    /// Whether the search stopped on an exact score tie.
    pub tied: bool,
}

/// Finds the rotation that straightens a binary text image.
#[derive(Debug, Clone, Copy)]
pub struct AngleEstimator {
    range: AngleRange,
    accuracy: f64,
    downscale_factor: f64,
    rotator: Rotator,
}

impl AngleEstimator {
    /// Build an estimator, rejecting a non-positive accuracy or an empty range
    /// up front.
    pub fn new(range: AngleRange, accuracy: f64, downscale_factor: f64) -> Result<Self> {
        AngleSearchState::new(range, accuracy)?;
        if !(downscale_factor > 0.0 && downscale_factor <= 1.0) {
            return Err(SkewlineError::InvalidConfig(format!(
                "downscale_factor must be in (0, 1], got {downscale_factor}"
            )));
        }
        Ok(Self {
            range,
            accuracy,
            downscale_factor,
            // A fixed canvas keeps the row count stable across probe angles.
            rotator: Rotator::new(Canvas::Keep),
        })
    }

    /// Take range, accuracy and downscale factor from `config`.
    pub fn from_config(config: &DeskewConfig) -> Result<Self> {
        Self::new(
            config.search_range,
            config.angle_accuracy,
            config.downscale_factor,
        )
    }

    /// Estimate the deskew angle of a full-resolution image. The search runs
    /// on a downscaled copy; the input is only borrowed.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn estimate(&self, image: &BinaryImage) -> AngleEstimate {
        let small = downscale(image, self.downscale_factor);
        debug!(
            scaled_w = small.width(),
            scaled_h = small.height(),
            factor = self.downscale_factor,
            "Downscaled for angle search"
        );
        let estimate = self.search(&small);
        info!(
            angle = estimate.angle,
            iterations = estimate.iterations,
            tied = estimate.tied,
            "Skew angle estimated"
        );
        estimate
    }

    /// Run the bisection directly on `image` without downscaling.
    pub fn search(&self, image: &BinaryImage) -> AngleEstimate {
        let mut state = match AngleSearchState::new(self.range, self.accuracy) {
            Ok(state) => state,
            // Unreachable: `new` validated the same values.
            Err(_) => {
                return AngleEstimate {
                    angle: self.range.midpoint(),
                    iterations: 0,
                    tied: false,
                };
            }
        };

        let mut iterations = 0;
        let mut tied = false;
        while !state.is_converged() {
            let (low, high) = state.probes();
            let low_score = self.score(image, low);
            let high_score = self.score(image, high);
            iterations += 1;
            trace!(low, low_score, high, high_score, "Probe pair scored");

            match state.narrow(low_score, high_score) {
                SearchStep::Narrowed => {}
                SearchStep::Converged => break,
                SearchStep::Tied => {
                    debug!(angle = state.angle(), "Probe scores tied; stopping search");
                    tied = true;
                    break;
                }
            }
        }

        AngleEstimate {
            angle: state.angle(),
            iterations,
            tied,
        }
    }

    /// Row ink density variance of `image` rotated by `angle` degrees.
    pub fn score(&self, image: &BinaryImage, angle: f64) -> f64 {
        let rotated = self.rotator.rotate(image, angle);
        RowInkProfile::from_image(&rotated).variance()
    }
}

/// Scale a binary image by `factor` using nearest-neighbour sampling, which
/// keeps every pixel either ink or background.
pub fn downscale(image: &BinaryImage, factor: f64) -> BinaryImage {
    if factor >= 1.0 {
        return image.clone();
    }
    let scale = |extent: u32| ((extent as f64 * factor).round() as u32).max(1);
    let (w, h) = (scale(image.width()), scale(image.height()));
    let resized = imageops::resize(image.as_gray(), w, h, FilterType::Nearest);
    BinaryImage::from_binary_gray(resized)
}
