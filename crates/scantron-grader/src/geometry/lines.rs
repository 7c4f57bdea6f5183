// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Line segment normalization: extension towards the frame edges and
// filtering by angle from horizontal.

use scantron_core::LineSegment;
use scantron_core::config::AngleRange;
use tracing::trace;

/// Segments whose horizontal extent is within this many pixels, and smaller
/// than their vertical extent, are treated as vertical.
const NEAR_VERTICAL_DX: i32 = 5;

/// Extend every segment outwards by `extension` pixels at both ends.
///
/// Card edges are often detected only in part; extending them lets
/// neighbouring sides meet inside the frame. Each segment is first ordered
/// left to right. Near-vertical segments grow by `extension` along the
/// direction of their vertical span and by `extension * dx / |dy|` along x;
/// all others grow by `extension` along x and by `slope * extension` along
/// y. Either way the new endpoints stay on the original line up to integer
/// rounding. Single-point segments are returned unchanged.
pub fn expand(lines: &[LineSegment], extension: i32) -> Vec<LineSegment> {
    lines
        .iter()
        .map(|line| {
            let seg = line.normalized();
            let (dx, dy) = (seg.dx(), seg.dy());
            if dx == 0 && dy == 0 {
                return seg;
            }
            if dx <= NEAR_VERTICAL_DX && dy.abs() > dx {
                let dir = dy.signum();
                let shift = (extension as f64 * dx as f64 / dy.unsigned_abs() as f64).round() as i32;
                LineSegment::new(
                    seg.x1.saturating_sub(shift),
                    seg.y1.saturating_sub(dir * extension),
                    seg.x2.saturating_add(shift),
                    seg.y2.saturating_add(dir * extension),
                )
            } else {
                let rise = dy as f64 / dx as f64 * extension as f64;
                LineSegment::new(
                    seg.x1.saturating_sub(extension),
                    (seg.y1 as f64 - rise).round() as i32,
                    seg.x2.saturating_add(extension),
                    (seg.y2 as f64 + rise).round() as i32,
                )
            }
        })
        .collect()
}

/// Angle of a segment from horizontal, in degrees within `[0, 90]`.
pub fn segment_angle_degrees(line: &LineSegment) -> f64 {
    let dx = line.dx();
    if dx == 0 {
        return 90.0;
    }
    (line.dy() as f64 / dx as f64).abs().atan().to_degrees()
}

/// Keep only segments whose angle lies in one of `ranges`.
pub fn filter_by_angle(lines: &[LineSegment], ranges: &[AngleRange]) -> Vec<LineSegment> {
    let kept: Vec<LineSegment> = lines
        .iter()
        .filter(|line| {
            let angle = segment_angle_degrees(line);
            ranges.iter().any(|range| range.contains(angle))
        })
        .copied()
        .collect();
    trace!(
        input = lines.len(),
        kept = kept.len(),
        "Filtered segments by angle"
    );
    kept
}
