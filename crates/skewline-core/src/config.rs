// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkewlineError};
use crate::types::{AngleRange, GrayWeights, SelectionMode, TileSize};

/// Tunable parameters for one deskew-and-segment run.
///
/// Every field has a default, so a JSON document only needs to name the
/// values it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskewConfig {
    /// Final cutoff on the adaptively normalised gray image (0–255).
    /// Pixels strictly darker than this become ink.
    pub binary_threshold: u8,
    /// Tile size for the local Otsu statistic.
    pub tile_size: TileSize,
    /// Channel weights for colour input.
    pub gray_weights: GrayWeights,
    /// Minimum row count for a text band to be selected.
    pub min_segment_height: u32,
    /// Candidate rotation angles, in degrees.
    pub search_range: AngleRange,
    /// Angle search stops once the bracket is this narrow (degrees).
    pub angle_accuracy: f64,
    /// Scale applied to the binary image before the angle search.
    pub downscale_factor: f64,
    /// Which band the segmenter emits.
    pub selection_mode: SelectionMode,
}

impl Default for DeskewConfig {
    fn default() -> Self {
        Self {
            binary_threshold: 130,
            tile_size: TileSize::default(),
            gray_weights: GrayWeights::default(),
            min_segment_height: 3,
            search_range: AngleRange::default(),
            angle_accuracy: 1.0,
            downscale_factor: 0.2,
            selection_mode: SelectionMode::First,
        }
    }
}

impl DeskewConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Serialise to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builder-style override of the selection mode.
    pub fn with_selection_mode(mut self, mode: SelectionMode) -> Self {
        self.selection_mode = mode;
        self
    }

    /// Check every tunable for values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.binary_threshold == 0 {
            return Err(invalid("binary_threshold must be at least 1"));
        }
        if self.tile_size.width == 0 || self.tile_size.height == 0 {
            return Err(invalid(format!(
                "tile_size must be non-zero, got {}x{}",
                self.tile_size.width, self.tile_size.height
            )));
        }

        let w = self.gray_weights;
        let weights_ok = [w.red, w.green, w.blue]
            .iter()
            .all(|v| v.is_finite() && *v >= 0.0);
        if !weights_ok || w.sum() <= 0.0 {
            return Err(invalid(format!(
                "gray_weights must be finite, non-negative and not all zero, got {w:?}"
            )));
        }

        if self.min_segment_height == 0 {
            return Err(invalid("min_segment_height must be at least 1"));
        }

        let range = self.search_range;
        if !range.min.is_finite() || !range.max.is_finite() || range.min >= range.max {
            return Err(invalid(format!(
                "search_range must satisfy min < max, got [{}, {}]",
                range.min, range.max
            )));
        }

        validate_accuracy(self.angle_accuracy)?;

        if !(self.downscale_factor > 0.0 && self.downscale_factor <= 1.0) {
            return Err(invalid(format!(
                "downscale_factor must be in (0, 1], got {}",
                self.downscale_factor
            )));
        }

        Ok(())
    }
}

/// Reject a non-positive or non-finite angle accuracy.
///
/// Shared with the angle search, which must refuse to start on such a value.
pub fn validate_accuracy(accuracy: f64) -> Result<()> {
    if accuracy.is_finite() && accuracy > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!(
            "angle_accuracy must be a positive number of degrees, got {accuracy}"
        )))
    }
}

fn invalid(msg: impl Into<String>) -> SkewlineError {
    SkewlineError::InvalidConfig(msg.into())
}
