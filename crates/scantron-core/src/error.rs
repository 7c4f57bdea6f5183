// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Scantron.

use thiserror::Error;

/// Top-level error type for all Scantron operations.
///
/// Degenerate geometry (parallel lines, empty corner quadrants, noise marks)
/// is absorbed by the pipeline and never surfaces here.
#[derive(Debug, Error)]
pub enum GradeError {
    // -- Decoding --
    #[error("no region boundary found among {contours} contours")]
    MissingRegionBoundary { contours: usize },

    #[error("crop area {area} does not intersect the {width}x{height} image")]
    InvalidArea {
        area: String,
        width: u32,
        height: u32,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // -- Configuration --
    #[error("invalid card layout: {0}")]
    InvalidLayout(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Image handling --
    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, GradeError>;
