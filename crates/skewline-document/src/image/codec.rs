// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Codec wrapper — loads raster files into pixel buffers and writes binary
// buffers back out, using the `image` crate for every format.

use std::path::Path;

use image::{DynamicImage, ImageFormat};
use skewline_core::error::{Result, SkewlineError};
use tracing::{debug, info, instrument};

use crate::image::bitmap::BinaryImage;

/// Load an image from a file path. The format is sniffed from the content.
///
/// An unreadable or corrupt file is fatal for the pipeline, so every failure
/// maps to an error rather than an empty buffer.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load(path: impl AsRef<Path>) -> Result<DynamicImage> {
    let path = path.as_ref();
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|err| {
            SkewlineError::ImageError(format!("failed to open {}: {}", path.display(), err))
        })?;
    info!(width = img.width(), height = img.height(), "Image loaded");
    Ok(img)
}

/// Decode an image from raw encoded bytes (PNG, JPEG, TIFF, etc.).
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn load_from_memory(data: &[u8]) -> Result<DynamicImage> {
    let img = image::load_from_memory(data)
        .map_err(|err| SkewlineError::ImageError(format!("failed to decode image: {}", err)))?;
    debug!(
        width = img.width(),
        height = img.height(),
        "Image decoded from bytes"
    );
    Ok(img)
}

/// Write a binary image to a file. The format is inferred from the extension.
#[instrument(skip(image), fields(path = %path.as_ref().display()))]
pub fn store(image: &BinaryImage, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    image.as_gray().save(path).map_err(|err| {
        SkewlineError::ImageError(format!(
            "failed to save image to {}: {}",
            path.display(),
            err
        ))
    })?;
    debug!(width = image.width(), height = image.height(), "Image stored");
    Ok(())
}

/// Encode a binary image as PNG bytes.
pub fn encode_png(image: &BinaryImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .as_gray()
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|err| SkewlineError::ImageError(format!("PNG encoding failed: {}", err)))?;
    Ok(buffer)
}
