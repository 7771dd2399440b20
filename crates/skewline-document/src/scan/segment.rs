// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Line segmenter — finds horizontal bands of ink separated by blank rows and
// picks one of them for recognition.

use serde::Serialize;
use skewline_core::DeskewConfig;
use skewline_core::error::Result;
use skewline_core::types::SelectionMode;
use tracing::{debug, info, instrument};

use crate::image::bitmap::BinaryImage;

/// A band of rows `[top, top + height)`. Its first and last rows hold ink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub top: u32,
    pub height: u32,
}

impl Segment {
    /// Last row of the band (inclusive). An empty band reports `top`.
    pub fn bottom(&self) -> u32 {
        self.top + self.height.saturating_sub(1)
    }

    /// Whether `row` lies inside the band.
    pub fn contains_row(&self, row: u32) -> bool {
        self.rows().contains(&row)
    }

    /// The band's rows as a half-open range.
    pub fn rows(&self) -> std::ops::Range<u32> {
        self.top..self.top + self.height
    }
}

/// The selected band and its full-width crop.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedLine {
    pub segment: Segment,
    pub image: BinaryImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Outside,
    Inside { top: u32, last_ink: u32 },
}

/// Walks the rows of an image top to bottom and yields each candidate band
/// at least `min_height` rows tall.
///
/// A blank row only closes a band once the band spans `min_height` rows, so
/// short gaps inside a line (between accents and their letters, say) do not
/// split it. Trailing blank rows are trimmed from each band, and bands that
/// end up shorter than `min_height` are dropped as noise. The bottom edge of
/// the image closes whatever band is open.
#[derive(Debug, Clone)]
pub struct SegmentScanner<'a> {
    image: &'a BinaryImage,
    min_height: u32,
    row: u32,
    state: ScanState,
}

impl<'a> SegmentScanner<'a> {
    /// Start scanning `image` from its top row. A `min_height` of 0 is
    /// treated as 1.
    pub fn new(image: &'a BinaryImage, min_height: u32) -> Self {
        Self {
            image,
            min_height: min_height.max(1),
            row: 0,
            state: ScanState::Outside,
        }
    }

    /// Close the band `[top, last_ink]`, keeping it only if it is tall enough.
    fn close(&mut self, top: u32, last_ink: u32) -> Option<Segment> {
        self.state = ScanState::Outside;
        let segment = Segment {
            top,
            height: last_ink - top + 1,
        };
        if segment.height >= self.min_height {
            debug!(top, height = segment.height, "Candidate segment");
            Some(segment)
        } else {
            debug!(top, height = segment.height, "Band too short; skipping");
            None
        }
    }
}

impl Iterator for SegmentScanner<'_> {
    type Item = Segment;

    fn next(&mut self) -> Option<Segment> {
        while self.row < self.image.height() {
            let row = self.row;
            self.row += 1;
            let ink = self.image.row_has_ink(row);

            match self.state {
                ScanState::Outside if ink => {
                    self.state = ScanState::Inside {
                        top: row,
                        last_ink: row,
                    };
                }
                ScanState::Outside => {}
                ScanState::Inside { top, .. } if ink => {
                    self.state = ScanState::Inside { top, last_ink: row };
                }
                ScanState::Inside { top, last_ink } => {
                    if row - top >= self.min_height {
                        if let Some(segment) = self.close(top, last_ink) {
                            return Some(segment);
                        }
                    }
                }
            }
        }

        match self.state {
            ScanState::Inside { top, last_ink } => self.close(top, last_ink),
            ScanState::Outside => None,
        }
    }
}

/// Picks one text band out of a deskewed binary image.
#[derive(Debug, Clone, Copy)]
pub struct LineSegmenter {
    min_segment_height: u32,
    selection: SelectionMode,
}

impl LineSegmenter {
    /// Build a segmenter. A `min_segment_height` of 0 is treated as 1.
    pub fn new(min_segment_height: u32, selection: SelectionMode) -> Self {
        Self {
            min_segment_height: min_segment_height.max(1),
            selection,
        }
    }

    /// Take the minimum height and selection mode from `config`.
    pub fn from_config(config: &DeskewConfig) -> Self {
        Self::new(config.min_segment_height, config.selection_mode)
    }

    /// The configured selection mode.
    pub fn selection(&self) -> SelectionMode {
        self.selection
    }

    /// Every candidate band, top to bottom.
    pub fn candidates<'a>(&self, image: &'a BinaryImage) -> SegmentScanner<'a> {
        SegmentScanner::new(image, self.min_segment_height)
    }

    /// The band chosen by the selection mode, if any.
    pub fn select(&self, image: &BinaryImage) -> Option<Segment> {
        let mut candidates = self.candidates(image);
        match self.selection {
            SelectionMode::First => candidates.next(),
            SelectionMode::Middle => {
                let mid = image.height() / 2;
                candidates
                    .take_while(|segment| segment.top <= mid)
                    .find(|segment| segment.contains_row(mid))
            }
        }
    }

    /// Select a band and crop it out at full width. `Ok(None)` when no band
    /// qualifies; the caller decides what that means for its output.
    #[instrument(skip_all, fields(width = image.width(), height = image.height(), mode = %self.selection))]
    pub fn extract(&self, image: &BinaryImage) -> Result<Option<SegmentedLine>> {
        let Some(segment) = self.select(image) else {
            info!("No qualifying text line found");
            return Ok(None);
        };
        info!(top = segment.top, height = segment.height, "Text line selected");

        let band = image.crop_rows(segment.top, segment.height)?;
        Ok(Some(SegmentedLine {
            segment,
            image: band,
        }))
    }
}

impl Default for LineSegmenter {
    fn default() -> Self {
        Self::from_config(&DeskewConfig::default())
    }
}
