// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scantron-grader — Image pipeline for grading optical answer sheets.
//
// Rectifies a photographed card onto a canonical frame (edge and line
// detection, corner selection, perspective warp), then reads the filled
// bubbles (binarization, contour tree, grid mapping) into an answer grid.

pub mod decode;
pub mod geometry;
pub mod grader;
pub mod io;
pub mod rectify;

// Re-export the primary types so callers can use `scantron_grader::Grader` etc.
pub use decode::{CardReader, CardReading};
pub use grader::{GradeReport, Grader};
pub use rectify::{CardRectifier, Rectification};
