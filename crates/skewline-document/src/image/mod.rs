// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — the 1-bit ink/background buffer and the load/store wrapper
// around the `image` crate.

pub mod bitmap;
pub mod codec;

pub use bitmap::BinaryImage;
