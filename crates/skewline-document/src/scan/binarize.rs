// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Binarizer — weighted grayscale conversion, tiled Otsu normalization and a
// fixed final cutoff, producing the 1-bit ink/background buffer.

use image::{DynamicImage, GrayImage, Luma, RgbImage};
use serde::Serialize;
use skewline_core::DeskewConfig;
use skewline_core::error::{Result, SkewlineError};
use skewline_core::types::{GrayWeights, TileSize};
use tracing::{debug, info, instrument, warn};

use crate::image::bitmap::BinaryImage;

/// Outcome counters from one binarization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BinarizeReport {
    /// Tiles the image was divided into.
    pub tiles: u32,
    /// Tiles whose histogram had no usable Otsu split and fell back to the
    /// fixed cutoff on raw gray values.
    pub fallback_tiles: u32,
}

impl BinarizeReport {
    /// Whether any tile had to fall back to the fixed cutoff.
    pub fn used_fallback(&self) -> bool {
        self.fallback_tiles > 0
    }
}

/// Converts color or grayscale input into a [`BinaryImage`].
///
/// Each tile gets its own Otsu threshold `t`. Gray values in `[0, t]` are
/// stretched onto `[0, cutoff)` and values above `t` onto `[cutoff, 255]`,
/// so the fixed `cutoff` applied afterwards separates ink from paper
/// according to the local statistic.
#[derive(Debug, Clone, Copy)]
pub struct Binarizer {
    tile_size: TileSize,
    gray_weights: GrayWeights,
    cutoff: u8,
}

impl Binarizer {
    /// Build a binarizer. A `cutoff` of 0 is raised to 1 so ink stays reachable.
    pub fn new(tile_size: TileSize, gray_weights: GrayWeights, cutoff: u8) -> Self {
        Self {
            tile_size,
            gray_weights,
            cutoff: cutoff.max(1),
        }
    }

    /// Take tile size, gray weights and cutoff from `config`.
    pub fn from_config(config: &DeskewConfig) -> Self {
        Self::new(
            config.tile_size,
            config.gray_weights,
            config.binary_threshold,
        )
    }

    /// Binarize `image`, consuming it.
    pub fn binarize(&self, image: DynamicImage) -> Result<BinaryImage> {
        self.binarize_with_report(image).map(|(binary, _)| binary)
    }

    /// Binarize `image` and report whether any tile fell back to the fixed
    /// cutoff.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn binarize_with_report(
        &self,
        image: DynamicImage,
    ) -> Result<(BinaryImage, BinarizeReport)> {
        if image.width() == 0 || image.height() == 0 {
            return Err(SkewlineError::InvalidImage(format!(
                "cannot binarize a {}x{} image",
                image.width(),
                image.height()
            )));
        }

        let gray = self.to_grayscale(image);
        let (normalized, report) = self.normalize(&gray);
        drop(gray);

        if report.used_fallback() {
            warn!(
                fallback_tiles = report.fallback_tiles,
                tiles = report.tiles,
                cutoff = self.cutoff,
                "Adaptive threshold degenerate on some tiles; fixed cutoff applied to raw gray"
            );
        }

        let binary = BinaryImage::threshold(&normalized, self.cutoff);
        info!(
            ink_pixels = binary.ink_count(),
            tiles = report.tiles,
            "Binarization complete"
        );
        Ok((binary, report))
    }

    /// Collapse color channels into one gray channel using the configured
    /// weights. 8-bit luma input is passed through untouched.
    pub fn to_grayscale(&self, image: DynamicImage) -> GrayImage {
        match image {
            DynamicImage::ImageLuma8(gray) => gray,
            other => weighted_gray(&other.to_rgb8(), self.gray_weights),
        }
    }

    /// Apply the per-tile Otsu normalization to a gray image.
    pub fn normalize(&self, gray: &GrayImage) -> (GrayImage, BinarizeReport) {
        let (width, height) = gray.dimensions();
        let columns = tile_bounds(width, self.tile_size.width);
        let rows = tile_bounds(height, self.tile_size.height);

        let mut output = GrayImage::new(width, height);
        let mut report = BinarizeReport::default();

        for &(y0, y1) in &rows {
            for &(x0, x1) in &columns {
                report.tiles += 1;
                let histogram = tile_histogram(gray, x0, x1, y0, y1);
                let threshold = otsu_threshold(&histogram);

                match threshold {
                    Some(t) => debug!(x0, y0, threshold = t, "Tile threshold"),
                    None => {
                        report.fallback_tiles += 1;
                        warn!(x0, y0, x1, y1, "No Otsu split in tile; using fixed cutoff");
                    }
                }

                for y in y0..y1 {
                    for x in x0..x1 {
                        let value = gray.get_pixel(x, y).0[0];
                        let mapped = match threshold {
                            Some(t) => normalize_value(value, t, self.cutoff),
                            None => value,
                        };
                        output.put_pixel(x, y, Luma([mapped]));
                    }
                }
            }
        }

        (output, report)
    }
}

impl Default for Binarizer {
    fn default() -> Self {
        Self::from_config(&DeskewConfig::default())
    }
}

fn weighted_gray(rgb: &RgbImage, weights: GrayWeights) -> GrayImage {
    let sum = weights.sum();
    let (wr, wg, wb) = (weights.red / sum, weights.green / sum, weights.blue / sum);
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let value = wr * r as f32 + wg * g as f32 + wb * b as f32;
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Split `extent` into `max(1, extent / tile)` spans; the last span absorbs
/// the remainder so no sliver tiles appear.
fn tile_bounds(extent: u32, tile: u32) -> Vec<(u32, u32)> {
    let count = (extent / tile.max(1)).max(1);
    (0..count)
        .map(|i| {
            let start = (i as u64 * extent as u64 / count as u64) as u32;
            let end = ((i as u64 + 1) * extent as u64 / count as u64) as u32;
            (start, end)
        })
        .collect()
}

fn tile_histogram(gray: &GrayImage, x0: u32, x1: u32, y0: u32, y1: u32) -> [u64; 256] {
    let mut histogram = [0u64; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            histogram[gray.get_pixel(x, y).0[0] as usize] += 1;
        }
    }
    histogram
}

/// Otsu's threshold over a 256-bin histogram.
///
/// Returns the `t` that maximises the between-class variance of `[0, t]`
/// against `[t + 1, 255]`, or `None` when no split separates two non-empty
/// classes (empty, uniform or single-level histograms).
pub fn otsu_threshold(histogram: &[u64; 256]) -> Option<u8> {
    let total_pixels: u64 = histogram.iter().sum();
    if total_pixels == 0 {
        return None;
    }

    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_background: f64 = 0.0;
    let mut weight_background: u64 = 0;
    let mut max_variance: f64 = 0.0;
    let mut best_threshold: Option<u8> = None;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;

        let between_variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if between_variance > max_variance {
            max_variance = between_variance;
            best_threshold = Some(t as u8);
        }
    }

    best_threshold
}

/// Map `value` so that `[0, t]` lands below `cutoff` and `(t, 255]` at or
/// above it, stretching each side linearly.
fn normalize_value(value: u8, t: u8, cutoff: u8) -> u8 {
    let (v, t, c) = (value as u32, t as u32, cutoff as u32);
    if v <= t {
        if t == 0 { 0 } else { (v * (c - 1) / t) as u8 }
    } else {
        let span = 254 - t;
        if span == 0 {
            255
        } else {
            (c + (v - t - 1) * (255 - c) / span) as u8
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn text_like_gray(width: u32, height: u32) -> GrayImage {
        // Light paper (200) with darker strokes (60) on every fourth row.
        GrayImage::from_fn(width, height, |_, y| if y % 4 == 0 { Luma([60]) } else { Luma([200]) })
    }

    #[test]
    fn otsu_splits_bimodal_histogram() {
        let mut histogram = [0u64; 256];
        histogram[40] = 100;
        histogram[210] = 300;
        let t = otsu_threshold(&histogram).expect("bimodal histogram has a split");
        assert!((40..210).contains(&t), "threshold {t} should fall between the modes");
    }

    #[test]
    fn otsu_is_none_for_uniform_histogram() {
        let mut histogram = [0u64; 256];
        histogram[128] = 1000;
        assert_eq!(otsu_threshold(&histogram), None);
        assert_eq!(otsu_threshold(&[0u64; 256]), None);
    }

    #[test]
    fn normalization_places_threshold_on_cutoff() {
        for t in [0u8, 17, 100, 200, 254, 255] {
            for v in 0..=255u8 {
                let mapped = normalize_value(v, t, 130);
                if v <= t {
                    assert!(mapped < 130, "v={v} t={t} mapped={mapped}");
                } else {
                    assert!(mapped >= 130, "v={v} t={t} mapped={mapped}");
                }
            }
        }
    }

    #[test]
    fn tile_bounds_cover_extent_without_slivers() {
        assert_eq!(tile_bounds(500, 2000), vec![(0, 500)]);
        let bounds = tile_bounds(4500, 2000);
        assert_eq!(bounds, vec![(0, 2250), (2250, 4500)]);
    }

    #[test]
    fn binarizes_text_like_image() {
        let gray = text_like_gray(40, 40);
        let binarizer = Binarizer::default();
        let (binary, report) = binarizer
            .binarize_with_report(DynamicImage::ImageLuma8(gray))
            .unwrap();

        assert!(!report.used_fallback());
        for y in 0..40 {
            assert_eq!(binary.row_has_ink(y), y % 4 == 0, "row {y}");
        }
    }

    #[test]
    fn binarization_is_idempotent() {
        let original = BinaryImage::from_fn(64, 48, |x, y| (x / 5 + y / 7) % 3 == 0).unwrap();
        let binarizer = Binarizer::default();
        let again = binarizer
            .binarize(DynamicImage::ImageLuma8(original.as_gray().clone()))
            .unwrap();
        assert_eq!(again, original);
    }

    #[test]
    fn uniform_image_falls_back_without_failing() {
        let binarizer = Binarizer::default();

        let white = GrayImage::from_pixel(30, 20, Luma([240]));
        let (binary, report) = binarizer
            .binarize_with_report(DynamicImage::ImageLuma8(white))
            .unwrap();
        assert!(report.used_fallback());
        assert_eq!(binary.ink_count(), 0);

        let dark = GrayImage::from_pixel(30, 20, Luma([50]));
        let binary = binarizer.binarize(DynamicImage::ImageLuma8(dark)).unwrap();
        assert_eq!(binary.ink_count(), 600);
    }

    #[test]
    fn color_input_uses_channel_weights() {
        let rgb = RgbImage::from_fn(10, 10, |x, _| {
            if x < 5 { Rgb([20, 30, 10]) } else { Rgb([250, 240, 230]) }
        });
        let binarizer = Binarizer::new(TileSize::default(), GrayWeights::equal(), 130);
        let gray = binarizer.to_grayscale(DynamicImage::ImageRgb8(rgb));
        assert_eq!(gray.get_pixel(0, 0).0[0], 20);
        assert_eq!(gray.get_pixel(9, 0).0[0], 240);

        let binary = binarizer
            .binarize(DynamicImage::ImageLuma8(gray))
            .unwrap();
        assert!(binary.is_ink(0, 0));
        assert!(!binary.is_ink(9, 9));
    }

    #[test]
    fn small_tiles_adapt_to_local_lighting() {
        // Left half lit (paper 220, ink 120); right half in shadow (paper 110,
        // ink 20). A single global cutoff of 130 would ink the whole right half.
        let gray = GrayImage::from_fn(80, 40, |x, y| {
            let stroke = y % 5 == 0;
            let value = match (x < 40, stroke) {
                (true, true) => 120,
                (true, false) => 220,
                (false, true) => 20,
                (false, false) => 110,
            };
            Luma([value])
        });
        let binarizer = Binarizer::new(
            TileSize {
                width: 40,
                height: 40,
            },
            GrayWeights::default(),
            130,
        );
        let (binary, report) = binarizer
            .binarize_with_report(DynamicImage::ImageLuma8(gray))
            .unwrap();
        assert_eq!(report.tiles, 2);
        assert!(!binary.is_ink(60, 1), "shadowed paper should stay background");
        assert!(binary.is_ink(60, 0), "shadowed stroke should be ink");
        assert!(binary.is_ink(10, 5), "lit stroke should be ink");
        assert!(!binary.is_ink(10, 6));
    }

    #[test]
    fn zero_sized_input_is_rejected() {
        let err = Binarizer::default()
            .binarize(DynamicImage::ImageLuma8(GrayImage::new(0, 0)))
            .unwrap_err();
        assert!(matches!(err, SkewlineError::InvalidImage(_)));
    }
}
