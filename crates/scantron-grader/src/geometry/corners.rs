// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reduction of an intersection point cloud to the four card corners.

use scantron_core::{FrameSize, Point2, Quadrilateral};
use tracing::debug;

/// Fallback corner for each quadrant that received no intersection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerDefaults {
    pub top_left: Point2,
    pub top_right: Point2,
    pub bottom_right: Point2,
    pub bottom_left: Point2,
}

impl CornerDefaults {
    /// The frame corners `(0,0) (W,0) (W,H) (0,H)`.
    pub fn for_frame(size: FrameSize) -> Self {
        let frame = Quadrilateral::frame(size);
        Self {
            top_left: frame.top_left,
            top_right: frame.top_right,
            bottom_right: frame.bottom_right,
            bottom_left: frame.bottom_left,
        }
    }
}

/// Running per-axis extremes of the points assigned to one quadrant.
///
/// `x` and `y` are reduced independently, so the selected corner need not be
/// one of the input points.
#[derive(Debug, Clone, Copy)]
struct QuadrantExtreme {
    prefer_max_x: bool,
    prefer_max_y: bool,
    x: Option<f64>,
    y: Option<f64>,
    count: usize,
}

impl QuadrantExtreme {
    const fn new(prefer_max_x: bool, prefer_max_y: bool) -> Self {
        Self {
            prefer_max_x,
            prefer_max_y,
            x: None,
            y: None,
            count: 0,
        }
    }

    fn push(&mut self, p: Point2) {
        self.x = Some(pick(self.x, p.x, self.prefer_max_x));
        self.y = Some(pick(self.y, p.y, self.prefer_max_y));
        self.count += 1;
    }

    fn resolve(&self, default: Point2) -> Point2 {
        Point2::new(self.x.unwrap_or(default.x), self.y.unwrap_or(default.y))
    }
}

fn pick(current: Option<f64>, candidate: f64, prefer_max: bool) -> f64 {
    match current {
        None => candidate,
        Some(c) if prefer_max => c.max(candidate),
        Some(c) => c.min(candidate),
    }
}

/// Select the four outermost card corners from an intersection point cloud.
///
/// Points are split into quadrants around the frame center, checked in the
/// order top-left, top-right, bottom-right, bottom-left; a point on a center
/// line goes to the first quadrant that admits it. Quadrants left empty fall
/// back to the frame corners, so the result always has four usable points.
pub fn select_corners(points: &[Point2], frame: FrameSize) -> Quadrilateral {
    select_corners_with(points, frame, CornerDefaults::for_frame(frame))
}

/// [`select_corners`] with explicit fallbacks for empty quadrants.
pub fn select_corners_with(
    points: &[Point2],
    frame: FrameSize,
    defaults: CornerDefaults,
) -> Quadrilateral {
    let center = frame.center();
    let mut top_left = QuadrantExtreme::new(false, false);
    let mut top_right = QuadrantExtreme::new(true, false);
    let mut bottom_right = QuadrantExtreme::new(true, true);
    let mut bottom_left = QuadrantExtreme::new(false, true);

    for &p in points {
        let left = p.x <= center.x;
        let right = p.x >= center.x;
        let top = p.y <= center.y;
        let bottom = p.y >= center.y;

        if left && top {
            top_left.push(p);
        } else if right && top {
            top_right.push(p);
        } else if right && bottom {
            bottom_right.push(p);
        } else {
            bottom_left.push(p);
        }
    }

    debug!(
        points = points.len(),
        top_left = top_left.count,
        top_right = top_right.count,
        bottom_right = bottom_right.count,
        bottom_left = bottom_left.count,
        "Partitioned intersections into quadrants"
    );

    Quadrilateral {
        top_left: top_left.resolve(defaults.top_left),
        top_right: top_right.resolve(defaults.top_right),
        bottom_right: bottom_right.resolve(defaults.bottom_right),
        bottom_left: bottom_left.resolve(defaults.bottom_left),
    }
}

/// Order four arbitrary points as top-left, top-right, bottom-right,
/// bottom-left.
///
/// The smallest `x + y` is top-left and the largest bottom-right; the
/// smallest `y - x` is top-right and the largest bottom-left. Ties keep the
/// first point in input order.
pub fn order_points(points: [Point2; 4]) -> Quadrilateral {
    let by = |key: fn(&Point2) -> f64, want_max: bool| -> Point2 {
        let mut best = points[0];
        for p in &points[1..] {
            let better = if want_max {
                key(p) > key(&best)
            } else {
                key(p) < key(&best)
            };
            if better {
                best = *p;
            }
        }
        best
    };
    let sum = |p: &Point2| p.x + p.y;
    let diff = |p: &Point2| p.y - p.x;

    Quadrilateral {
        top_left: by(sum, false),
        top_right: by(diff, false),
        bottom_right: by(sum, true),
        bottom_left: by(diff, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: FrameSize = FrameSize::new(600, 700);

    /// Verify that no evidence at all yields the full-frame rectangle.
    #[test]
    fn empty_cloud_falls_back_to_frame_corners() {
        assert_eq!(select_corners(&[], FRAME), Quadrilateral::frame(FRAME));
    }

    #[test]
    fn picks_outermost_point_per_quadrant() {
        let points = [
            Point2::new(40.0, 50.0),
            Point2::new(60.0, 30.0),
            Point2::new(550.0, 45.0),
            Point2::new(520.0, 20.0),
            Point2::new(560.0, 660.0),
            Point2::new(30.0, 640.0),
            Point2::new(45.0, 680.0),
        ];
        let quad = select_corners(&points, FRAME);
        assert_eq!(quad.top_left, Point2::new(40.0, 30.0));
        assert_eq!(quad.top_right, Point2::new(550.0, 20.0));
        assert_eq!(quad.bottom_right, Point2::new(560.0, 660.0));
        assert_eq!(quad.bottom_left, Point2::new(30.0, 680.0));
    }

    #[test]
    fn only_empty_quadrants_take_defaults() {
        let points = [Point2::new(10.0, 12.0), Point2::new(590.0, 690.0)];
        let quad = select_corners(&points, FRAME);
        assert_eq!(quad.top_left, Point2::new(10.0, 12.0));
        assert_eq!(quad.bottom_right, Point2::new(590.0, 690.0));
        assert_eq!(quad.top_right, Point2::new(600.0, 0.0));
        assert_eq!(quad.bottom_left, Point2::new(0.0, 700.0));
    }

    #[test]
    fn center_line_points_follow_comparison_order() {
        // On the horizontal center line: top wins.
        let quad = select_corners(&[Point2::new(500.0, 350.0)], FRAME);
        assert_eq!(quad.top_right, Point2::new(500.0, 350.0));
        // On the vertical center line below the middle: bottom-right wins.
        let quad = select_corners(&[Point2::new(300.0, 600.0)], FRAME);
        assert_eq!(quad.bottom_right, Point2::new(300.0, 600.0));
        assert_eq!(quad.bottom_left, Point2::new(0.0, 700.0));
    }

    #[test]
    fn explicit_defaults_are_used() {
        let defaults = CornerDefaults {
            top_left: Point2::new(1.0, 1.0),
            top_right: Point2::new(2.0, 2.0),
            bottom_right: Point2::new(3.0, 3.0),
            bottom_left: Point2::new(4.0, 4.0),
        };
        let quad = select_corners_with(&[], FRAME, defaults);
        assert_eq!(quad.bottom_left, Point2::new(4.0, 4.0));
    }

    /// Verify that `order_points` gives the same result for every ordering
    /// of its input.
    #[test]
    fn order_points_is_permutation_invariant() {
        let corners = [
            Point2::new(12.0, 8.0),
            Point2::new(590.0, 15.0),
            Point2::new(580.0, 690.0),
            Point2::new(5.0, 670.0),
        ];
        let expected = Quadrilateral {
            top_left: corners[0],
            top_right: corners[1],
            bottom_right: corners[2],
            bottom_left: corners[3],
        };

        let mut idx = [0usize, 1, 2, 3];
        // Heap's algorithm over all 24 permutations.
        let mut c = [0usize; 4];
        assert_eq!(order_points(idx.map(|i| corners[i])), expected);
        let mut i = 0;
        while i < 4 {
            if c[i] < i {
                if i % 2 == 0 {
                    idx.swap(0, i);
                } else {
                    idx.swap(c[i], i);
                }
                assert_eq!(order_points(idx.map(|i| corners[i])), expected, "{idx:?}");
                c[i] += 1;
                i = 0;
            } else {
                c[i] = 0;
                i += 1;
            }
        }
    }
}
