// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plane geometry for card corner detection: segment extension and angle
// filtering, pairwise intersections, and reduction of an intersection cloud
// to four ordered corners.

pub mod corners;
pub mod intersect;
pub mod lines;

pub use corners::{CornerDefaults, order_points, select_corners, select_corners_with};
pub use intersect::{FrameBounds, all_intersections, intersect};
pub use lines::{expand, filter_by_angle, segment_angle_degrees};
