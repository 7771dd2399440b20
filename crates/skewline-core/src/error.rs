// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Skewline.

use thiserror::Error;

/// Top-level error type for all Skewline operations.
///
/// Only genuine failures live here. A degenerate threshold statistic or a
/// page without a qualifying text line is an ordinary outcome and is reported
/// through the pipeline's return values instead.
#[derive(Debug, Error)]
pub enum SkewlineError {
    // -- Image errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("invalid image: {0}")]
    InvalidImage(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Recognition --
    #[error("OCR failed: {0}")]
    OcrError(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SkewlineError>;
