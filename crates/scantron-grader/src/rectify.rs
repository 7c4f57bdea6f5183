// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectification: find the card outline in a photo and warp it
// to the canonical upright rectangle.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Rgba, RgbaImage};
use imageproc::edges::canny;
use imageproc::filter::box_filter;
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use imageproc::hough::{LineDetectionOptions, detect_lines};
use scantron_core::config::RectifyConfig;
use scantron_core::{FrameSize, LineSegment, Quadrilateral};
use tracing::{debug, info, instrument, warn};

use crate::geometry::{FrameBounds, all_intersections, expand, filter_by_angle, select_corners};

/// Output of one rectification run.
#[derive(Debug, Clone)]
pub struct Rectification {
    /// Canonical-size image, warped when `warped` is true.
    pub image: DynamicImage,
    /// Card corners found in the resized image.
    pub corners: Quadrilateral,
    /// False when the corners admitted no projective transform and the
    /// resized image was returned as is.
    pub warped: bool,
    /// Segments left after extension and angle filtering.
    pub line_count: usize,
    /// Intersections inside the frame.
    pub intersection_count: usize,
}

/// Flattens a photographed card onto the canonical working frame.
///
/// ## Pipeline
///
/// 1. Resize to the canonical size (600x700 by default)
/// 2. Grayscale and box blur
/// 3. Canny edge detection
/// 4. Hough line detection; each polar line becomes a segment spanning the
///    frame's longer side in both directions
/// 5. Extend segments and keep the near-horizontal and near-vertical ones
/// 6. Pairwise intersections clipped to the frame
/// 7. Outermost intersection per quadrant as card corner, frame corner when
///    a quadrant is empty
/// 8. Projective warp of the corners onto the frame rectangle
///
/// Missing evidence degrades towards the identity transform rather than
/// failing.
#[derive(Debug, Clone, Default)]
pub struct CardRectifier {
    config: RectifyConfig,
}

impl CardRectifier {
    pub fn new(config: RectifyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RectifyConfig {
        &self.config
    }

    /// The canonical working frame.
    pub fn frame(&self) -> FrameSize {
        FrameSize::new(self.config.width, self.config.height)
    }

    /// Resize `image` to the canonical frame and warp the card flat.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn rectify(&self, image: &DynamicImage) -> Rectification {
        let frame = self.frame();
        let resized = image.resize_exact(frame.width, frame.height, FilterType::Triangle);
        debug!(width = frame.width, height = frame.height, "Resized to canonical frame");

        let segments = self.detect_segments(&resized.to_luma8());
        let bounds = FrameBounds::new(frame, self.config.margin_x, self.config.margin_y);
        let points = all_intersections(&segments, Some(&bounds));
        let corners = select_corners(&points, frame);

        debug!(
            top_left = ?corners.top_left,
            top_right = ?corners.top_right,
            bottom_right = ?corners.bottom_right,
            bottom_left = ?corners.bottom_left,
            "Card corners selected"
        );

        let (image, warped) = match warp_to_frame(&resized, &corners, frame) {
            Some(flat) => (flat, true),
            None => (resized, false),
        };

        info!(
            lines = segments.len(),
            intersections = points.len(),
            warped,
            "Rectification complete"
        );
        Rectification {
            image,
            corners,
            warped,
            line_count: segments.len(),
            intersection_count: points.len(),
        }
    }

    /// Card edge candidates in a grayscale frame: extended, angle-filtered
    /// segments.
    pub fn detect_segments(&self, gray: &GrayImage) -> Vec<LineSegment> {
        let blurred = if self.config.blur_radius > 0 {
            box_filter(gray, self.config.blur_radius, self.config.blur_radius)
        } else {
            gray.clone()
        };
        let edges = canny(&blurred, self.config.canny_low, self.config.canny_high);

        let options = LineDetectionOptions {
            vote_threshold: self.config.hough_vote_threshold,
            suppression_radius: self.config.hough_suppression_radius,
        };
        let polar = detect_lines(&edges, options);
        debug!(line_count = polar.len(), "Hough lines detected");

        let reach = gray.width().max(gray.height());
        let raw: Vec<LineSegment> = polar
            .iter()
            .map(|line| {
                LineSegment::from_polar(
                    line.r as f64,
                    (line.angle_in_degrees as f64).to_radians(),
                    reach as f64,
                )
            })
            .collect();

        let extended = expand(&raw, reach as i32);
        filter_by_angle(&extended, &self.config.angle_ranges)
    }
}

/// Warp the quadrilateral `corners` of `image` onto the full `frame`.
///
/// Returns `None` when the corners are degenerate or the projective solver
/// rejects them.
fn warp_to_frame(
    image: &DynamicImage,
    corners: &Quadrilateral,
    frame: FrameSize,
) -> Option<DynamicImage> {
    if corners.is_degenerate() {
        warn!(?corners, "Degenerate card corners; returning unwarped image");
        return None;
    }

    let src = corners.to_f32_tuples();
    let dest = Quadrilateral::frame(frame).to_f32_tuples();
    let Some(projection) = Projection::from_control_points(src, dest) else {
        warn!(?corners, "Failed to compute projective transform; returning unwarped image");
        return None;
    };

    let rgba = image.to_rgba8();
    let default_pixel = Rgba([255u8, 255, 255, 255]);
    let mut output = RgbaImage::new(frame.width, frame.height);
    warp_into(&rgba, &projection, Interpolation::Bilinear, default_pixel, &mut output);

    Some(DynamicImage::ImageRgba8(output))
}
