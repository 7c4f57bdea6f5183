// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Intersections of infinite lines through pairs of segments.

use scantron_core::{FrameSize, LineSegment, Point2};
use tracing::debug;

/// Inclusive clipping window `[0, width - margin_x] x [0, height - margin_y]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameBounds {
    pub width: f64,
    pub height: f64,
    pub margin_x: f64,
    pub margin_y: f64,
}

impl FrameBounds {
    pub fn new(size: FrameSize, margin_x: f64, margin_y: f64) -> Self {
        Self {
            width: size.width as f64,
            height: size.height as f64,
            margin_x,
            margin_y,
        }
    }

    pub fn contains(&self, p: Point2) -> bool {
        p.x >= 0.0
            && p.x <= self.width - self.margin_x
            && p.y >= 0.0
            && p.y <= self.height - self.margin_y
    }
}

impl From<FrameSize> for FrameBounds {
    fn from(size: FrameSize) -> Self {
        Self::new(size, 0.0, 0.0)
    }
}

/// Intersection of the infinite lines through `a` and `b`.
///
/// Returns `None` for parallel or coincident lines. The determinant is
/// evaluated in exact integer arithmetic, so "parallel" means exactly
/// parallel on the pixel grid.
pub fn intersect(a: &LineSegment, b: &LineSegment) -> Option<Point2> {
    let (x1, y1, x2, y2) = (a.x1 as i128, a.y1 as i128, a.x2 as i128, a.y2 as i128);
    let (x3, y3, x4, y4) = (b.x1 as i128, b.y1 as i128, b.x2 as i128, b.y2 as i128);

    let d = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);
    if d == 0 {
        return None;
    }

    let pa = x1 * y2 - y1 * x2;
    let pb = x3 * y4 - y3 * x4;
    let d = d as f64;
    let x = (pa * (x3 - x4) - (x1 - x2) * pb) as f64 / d;
    let y = (pa * (y3 - y4) - (y1 - y2) * pb) as f64 / d;
    Some(Point2::new(x, y))
}

/// Intersections of every unordered pair of distinct segments.
///
/// Parallel pairs are skipped. With `bounds`, points outside the clipping
/// window are dropped as well.
pub fn all_intersections(lines: &[LineSegment], bounds: Option<&FrameBounds>) -> Vec<Point2> {
    let mut points = Vec::new();
    for (i, a) in lines.iter().enumerate() {
        for b in &lines[i + 1..] {
            let Some(p) = intersect(a, b) else {
                continue;
            };
            if bounds.is_none_or(|frame| frame.contains(p)) {
                points.push(p);
            }
        }
    }
    debug!(
        lines = lines.len(),
        points = points.len(),
        "Computed pairwise intersections"
    );
    points
}
