// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Skewline deskew pipeline.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SkewlineError;

/// Which text band the line segmenter hands to the recognizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// The first band (top to bottom) tall enough to qualify.
    #[default]
    First,
    /// The band that contains the image's vertical midpoint row.
    Middle,
}

impl std::fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::First => f.write_str("first"),
            Self::Middle => f.write_str("middle"),
        }
    }
}

impl FromStr for SelectionMode {
    type Err = SkewlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "middle" | "mid" | "center" | "centre" => Ok(Self::Middle),
            other => Err(SkewlineError::InvalidConfig(format!(
                "unknown selection mode '{other}' (expected 'first' or 'middle')"
            ))),
        }
    }
}

/// Closed interval of candidate rotation angles, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleRange {
    pub min: f64,
    pub max: f64,
}

impl AngleRange {
    /// Interval from `min` to `max` degrees. Ordering is checked by config validation.
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Width of the interval in degrees.
    pub fn width(&self) -> f64 {
        self.max - self.min
    }

    /// Centre of the interval; the angle search starts here.
    pub fn midpoint(&self) -> f64 {
        self.max - (self.max - self.min) / 2.0
    }

    /// Whether `angle` lies in the closed interval.
    pub fn contains(&self, angle: f64) -> bool {
        (self.min..=self.max).contains(&angle)
    }
}

impl Default for AngleRange {
    fn default() -> Self {
        Self::new(-45.0, 45.0)
    }
}

/// Channel weights for colour-to-gray conversion.
///
/// The weights do not need to sum to one; they are normalised by their sum
/// when applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrayWeights {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl GrayWeights {
    /// Equal-weighted luma: the plain channel average.
    pub const fn equal() -> Self {
        Self {
            red: 1.0,
            green: 1.0,
            blue: 1.0,
        }
    }

    /// Sum of the three weights, used to normalise them.
    pub fn sum(&self) -> f32 {
        self.red + self.green + self.blue
    }
}

impl Default for GrayWeights {
    /// The classic 0.3 / 0.5 / 0.2 weighting.
    fn default() -> Self {
        Self {
            red: 0.3,
            green: 0.5,
            blue: 0.2,
        }
    }
}

/// Tile dimensions for the adaptive threshold, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSize {
    pub width: u32,
    pub height: u32,
}

impl Default for TileSize {
    fn default() -> Self {
        Self {
            width: 2000,
            height: 2000,
        }
    }
}

/// Where the extracted line image is written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputTarget {
    /// Replace the input file in place.
    #[default]
    Overwrite,
    /// Write to a separate file; the input is left untouched.
    Path(PathBuf),
}

impl OutputTarget {
    /// Resolve the concrete output path for a given input path.
    pub fn resolve<'a>(&'a self, input: &'a Path) -> &'a Path {
        match self {
            Self::Overwrite => input,
            Self::Path(path) => path.as_path(),
        }
    }
}
