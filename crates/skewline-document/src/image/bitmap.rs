// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// 1-bit ink/background buffer. Stored as an 8-bit gray image holding only the
// two values `INK` and `BACKGROUND`, so it can go straight through the
// `image` and `imageproc` operations and out to any raster format.

use image::{DynamicImage, GrayImage, Luma};
use skewline_core::error::{Result, SkewlineError};

/// Gray value of an ink (text) pixel.
pub const INK: u8 = 0;
/// Gray value of a background (paper) pixel.
pub const BACKGROUND: u8 = 255;

/// A binarized image in which every pixel is either ink or background.
///
/// Width and height are always positive. The only way to build one is through
/// the constructors below, which threshold or generate pixels, so the
/// two-state invariant cannot be broken from outside the crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryImage {
    pixels: GrayImage,
}

impl BinaryImage {
    // -- Construction ---------------------------------------------------------

    /// Create an all-background image.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            pixels: GrayImage::from_pixel(width, height, Luma([BACKGROUND])),
        })
    }

    /// Create an image where `is_ink(x, y)` decides each pixel.
    pub fn from_fn(
        width: u32,
        height: u32,
        mut is_ink: impl FnMut(u32, u32) -> bool,
    ) -> Result<Self> {
        check_dimensions(width, height)?;
        let pixels = GrayImage::from_fn(width, height, |x, y| Luma([level(is_ink(x, y))]));
        Ok(Self { pixels })
    }

    /// Threshold a gray image: values strictly below `cutoff` become ink.
    pub fn from_gray(gray: &GrayImage, cutoff: u8) -> Result<Self> {
        check_dimensions(gray.width(), gray.height())?;
        Ok(Self::threshold(gray, cutoff))
    }

    /// Threshold without the dimension check, for buffers whose size the
    /// caller already guarantees.
    pub(crate) fn threshold(gray: &GrayImage, cutoff: u8) -> Self {
        let mut pixels = gray.clone();
        for p in pixels.pixels_mut() {
            p.0[0] = level(p.0[0] < cutoff);
        }
        Self { pixels }
    }

    /// Wrap a buffer that is already known to hold only `INK`/`BACKGROUND`.
    pub(crate) fn from_binary_gray(pixels: GrayImage) -> Self {
        debug_assert!(pixels.pixels().all(|p| p.0[0] == INK || p.0[0] == BACKGROUND));
        debug_assert!(pixels.width() > 0 && pixels.height() > 0);
        Self { pixels }
    }

    // -- Accessors ------------------------------------------------------------

    /// Width in pixels. Always positive.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels. Always positive.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Whether the pixel at `(x, y)` is ink. Panics when out of bounds, like
    /// `GrayImage::get_pixel`.
    pub fn is_ink(&self, x: u32, y: u32) -> bool {
        self.pixels.get_pixel(x, y).0[0] == INK
    }

    /// Mark `(x, y)` as ink or background. Panics when out of bounds.
    pub fn set_ink(&mut self, x: u32, y: u32, ink: bool) {
        self.pixels.put_pixel(x, y, Luma([level(ink)]));
    }

    /// The raw gray values of row `y`.
    fn row(&self, y: u32) -> &[u8] {
        let width = self.width() as usize;
        let start = y as usize * width;
        &self.pixels.as_raw()[start..start + width]
    }

    /// Number of ink pixels in row `y`.
    pub fn row_ink_count(&self, y: u32) -> u32 {
        self.row(y).iter().filter(|&&v| v == INK).count() as u32
    }

    /// Whether row `y` has at least one ink pixel.
    pub fn row_has_ink(&self, y: u32) -> bool {
        self.row(y).contains(&INK)
    }

    /// Total ink pixels in the image.
    pub fn ink_count(&self) -> u64 {
        self.pixels.as_raw().iter().filter(|&&v| v == INK).count() as u64
    }

    /// Borrow the underlying 0/255 gray buffer.
    pub fn as_gray(&self) -> &GrayImage {
        &self.pixels
    }

    /// Consume and return the underlying 0/255 gray buffer.
    pub fn into_gray(self) -> GrayImage {
        self.pixels
    }

    /// Consume and wrap as a `DynamicImage` for encoding or recognition.
    pub fn into_dynamic(self) -> DynamicImage {
        DynamicImage::ImageLuma8(self.pixels)
    }

    // -- Derived buffers ------------------------------------------------------

    /// Copy the full-width band of rows `[top, top + height)`.
    pub fn crop_rows(&self, top: u32, height: u32) -> Result<Self> {
        let end = top.checked_add(height).filter(|&end| end <= self.height());
        if height == 0 || end.is_none() {
            return Err(SkewlineError::InvalidImage(format!(
                "row band [{top}, {top}+{height}) is outside an image of height {}",
                self.height()
            )));
        }
        let band = image::imageops::crop_imm(&self.pixels, 0, top, self.width(), height);
        Ok(Self {
            pixels: band.to_image(),
        })
    }
}

fn level(ink: bool) -> u8 {
    if ink { INK } else { BACKGROUND }
}

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(SkewlineError::InvalidImage(format!(
            "pixel buffer must have positive dimensions, got {width}x{height}"
        )));
    }
    Ok(())
}
