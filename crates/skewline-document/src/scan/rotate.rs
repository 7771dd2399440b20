// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rotator — arbitrary-angle, area-mapped rotation about the image centre with
// background fill, for 1-bit and 8-bit buffers.

use image::{GrayImage, Luma};
use imageproc::geometric_transformations::{Interpolation, Projection, rotate_about_center, warp_into};
use tracing::{debug, instrument, trace};

use crate::image::bitmap::{BACKGROUND, BinaryImage};

/// Rotations smaller than this (radians) return an unchanged copy.
const MIN_ANGLE_TO_ROTATE: f64 = 0.001;

/// Gray level at which an interpolated 1-bit pixel is re-thresholded.
const BINARY_MIDPOINT: u8 = 128;

/// How the output canvas relates to the input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Canvas {
    /// Grow the canvas to the bounding box of the rotated input so nothing
    /// is clipped.
    #[default]
    Expand,
    /// Keep the input dimensions; content rotated past the edges is lost.
    Keep,
}

/// Rotates images by an arbitrary angle in degrees.
///
/// Positive angles turn the content clockwise as displayed (y axis pointing
/// down). Each destination pixel is the overlap-weighted average of the four
/// source pixels it covers, and regions with no source are background.
/// Inputs are never modified.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rotator {
    canvas: Canvas,
}

impl Rotator {
    /// Build a rotator with the given canvas policy.
    pub fn new(canvas: Canvas) -> Self {
        Self { canvas }
    }

    /// The canvas policy in use.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Rotate a binary image. Interpolated values are re-thresholded at the
    /// gray midpoint, so the result is binary again.
    #[instrument(level = "trace", skip(self, image), fields(width = image.width(), height = image.height()))]
    pub fn rotate(&self, image: &BinaryImage, degrees: f64) -> BinaryImage {
        if degrees.to_radians().abs() < MIN_ANGLE_TO_ROTATE {
            trace!(degrees, "Angle below rotation threshold; copying");
            return image.clone();
        }
        let rotated = self.rotate_gray(image.as_gray(), degrees, BACKGROUND);
        BinaryImage::threshold(&rotated, BINARY_MIDPOINT)
    }

    /// Rotate an 8-bit gray image, filling revealed regions with `background`.
    pub fn rotate_gray(&self, image: &GrayImage, degrees: f64, background: u8) -> GrayImage {
        let radians = degrees.to_radians();
        if radians.abs() < MIN_ANGLE_TO_ROTATE {
            return image.clone();
        }
        let fill = Luma([background]);

        match self.canvas {
            Canvas::Keep => {
                rotate_about_center(image, radians as f32, Interpolation::Bilinear, fill)
            }
            Canvas::Expand => {
                let (w, h) = image.dimensions();
                let (out_w, out_h) = rotated_bounds(w, h, radians);
                debug!(from_w = w, from_h = h, out_w, out_h, degrees, "Expanding rotation canvas");

                // Centre of the input -> origin -> rotate -> centre of the output.
                let projection = Projection::translate(out_w as f32 / 2.0, out_h as f32 / 2.0)
                    * Projection::rotate(radians as f32)
                    * Projection::translate(-(w as f32) / 2.0, -(h as f32) / 2.0);

                let mut output = GrayImage::from_pixel(out_w, out_h, fill);
                warp_into(image, &projection, Interpolation::Bilinear, fill, &mut output);
                output
            }
        }
    }
}

/// Dimensions of the axis-aligned box that holds a `w` x `h` image rotated by
/// `radians`. Never smaller than 1x1.
pub fn rotated_bounds(w: u32, h: u32, radians: f64) -> (u32, u32) {
    let (sin, cos) = (radians.sin().abs(), radians.cos().abs());
    let (w, h) = (w as f64, h as f64);
    // Shave a hair off before rounding up so exact fits don't gain a column.
    let fit = |extent: f64| ((extent - 1e-6).ceil().max(1.0)) as u32;
    (fit(w * cos + h * sin), fit(w * sin + h * cos))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Rows holding at least `min_ink` ink pixels.
    fn solid_rows(image: &BinaryImage, min_ink: u32) -> u32 {
        (0..image.height())
            .filter(|&y| image.row_ink_count(y) >= min_ink)
            .count() as u32
    }

    fn striped(width: u32, height: u32) -> BinaryImage {
        // Four 6-row stripes of 60 px, 8-row gaps, inside a 20 px margin.
        BinaryImage::from_fn(width, height, |x, y| {
            (20..80).contains(&x) && (20..76).contains(&y) && (y - 20) % 14 < 6
        })
        .unwrap()
    }

    #[test]
    fn bounds_of_right_angles_and_identity() {
        assert_eq!(rotated_bounds(100, 50, 0.0), (100, 50));
        assert_eq!(rotated_bounds(100, 50, std::f64::consts::FRAC_PI_2), (50, 100));
        let (w, h) = rotated_bounds(100, 100, std::f64::consts::FRAC_PI_4);
        assert_eq!((w, h), (142, 142));
    }

    #[test]
    fn tiny_angle_is_a_copy() {
        let image = striped(100, 100);
        let rotated = Rotator::default().rotate(&image, 0.01);
        assert_eq!(rotated, image);
    }

    #[test]
    fn expand_recomputes_dimensions() {
        let image = BinaryImage::new(120, 40).unwrap();
        let rotated = Rotator::new(Canvas::Expand).rotate(&image, 30.0);
        assert_eq!(rotated.dimensions(), rotated_bounds(120, 40, 30f64.to_radians()));
        assert_eq!(rotated.ink_count(), 0, "revealed corners must be background");
    }

    #[test]
    fn keep_preserves_dimensions() {
        let image = striped(100, 100);
        let rotated = Rotator::new(Canvas::Keep).rotate(&image, 17.0);
        assert_eq!(rotated.dimensions(), (100, 100));
    }

    #[test]
    fn input_is_not_modified() {
        let image = striped(100, 100);
        let before = image.clone();
        let _ = Rotator::default().rotate(&image, 12.5);
        assert_eq!(image, before);
    }

    #[test]
    fn quarter_turn_is_clockwise() {
        // A single ink block in the top-left quadrant should land in the
        // top-right quadrant after a clockwise quarter turn.
        let image = BinaryImage::from_fn(60, 60, |x, y| x < 20 && y < 20).unwrap();
        let rotated = Rotator::new(Canvas::Keep).rotate(&image, 90.0);
        assert!(rotated.is_ink(50, 10));
        assert!(!rotated.is_ink(10, 10));
        assert!(!rotated.is_ink(10, 50));
    }

    #[test]
    fn round_trip_preserves_row_profile() {
        let image = striped(100, 100);
        let rotator = Rotator::new(Canvas::Expand);
        for degrees in [7.0, -15.0, 33.0, 44.0] {
            let there = rotator.rotate(&image, degrees);
            let back = rotator.rotate(&there, -degrees);

            // 24 stripe rows of 60 px each; edge rows may gain or lose one.
            let original_rows = solid_rows(&image, 30);
            let restored_rows = solid_rows(&back, 30);
            assert_eq!(original_rows, 24);
            assert!(
                restored_rows.abs_diff(original_rows) <= 3,
                "{degrees}°: expected ~{original_rows} solid rows, got {restored_rows}"
            );

            let (before, after) = (image.ink_count() as f64, back.ink_count() as f64);
            assert!(
                (after - before).abs() / before < 0.02,
                "{degrees}°: ink {before} vs {after}"
            );
        }
    }
}
