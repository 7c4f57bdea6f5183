// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contour classification by position in the contour tree.

use scantron_core::error::{GradeError, Result};
use scantron_core::{BoundingBox, ContourHierarchy, FrameSize, MarkCenter};
use tracing::{debug, trace};

/// Contours split into filled marks and the answer region boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// One entry per contour that sits inside another contour.
    pub marks: Vec<MarkCenter>,
    /// Bounding box of the top-level contour that encloses the marks.
    pub region: BoundingBox,
}

/// Classify contours by their links in the contour tree.
///
/// A contour with a parent is a filled mark. A top-level contour with at
/// least one child is a candidate region boundary; when several qualify the
/// last one in index order is kept. Top-level contours without children are
/// ignored.
///
/// Fails with [`GradeError::MissingRegionBoundary`] when no boundary exists,
/// and with [`GradeError::InvalidInput`] when `boxes` and `hierarchy` differ
/// in length.
pub fn classify(boxes: &[BoundingBox], hierarchy: &ContourHierarchy) -> Result<Classification> {
    classify_where(boxes, hierarchy, |_| true)
}

/// [`classify`], but a nested contour only counts as a mark when
/// `is_mark_shape(index)` holds.
///
/// Contour tracers report both borders of a ring, and specks of paper left
/// inside a fill, as nested contours; callers use the predicate to keep
/// such contours in the tree without reading them as fills.
pub fn classify_where(
    boxes: &[BoundingBox],
    hierarchy: &ContourHierarchy,
    mut is_mark_shape: impl FnMut(usize) -> bool,
) -> Result<Classification> {
    if boxes.len() != hierarchy.len() {
        return Err(GradeError::InvalidInput(format!(
            "{} bounding boxes but {} hierarchy entries",
            boxes.len(),
            hierarchy.len()
        )));
    }

    let mut marks = Vec::new();
    let mut region = None;

    for (index, (bbox, node)) in boxes.iter().zip(hierarchy.nodes()).enumerate() {
        if node.parent.is_some() {
            if is_mark_shape(index) {
                marks.push(MarkCenter::from(bbox));
            }
        } else if node.first_child.is_some() {
            if region.is_some() {
                trace!(index, "Replacing earlier region boundary candidate");
            }
            region = Some(*bbox);
        }
    }

    let Some(region) = region else {
        return Err(GradeError::MissingRegionBoundary {
            contours: boxes.len(),
        });
    };

    debug!(
        contours = boxes.len(),
        marks = marks.len(),
        region_width = region.width,
        region_height = region.height,
        "Contours classified"
    );
    Ok(Classification { marks, region })
}

/// Boxes whose area exceeds `frame_area / divisor`.
///
/// A `divisor` of 2 keeps the boxes covering more than half the frame, which
/// on a well-cropped card is the answer region itself.
pub fn boxes_larger_than(boxes: &[BoundingBox], frame: FrameSize, divisor: u32) -> Vec<BoundingBox> {
    let limit = frame.area() as f64 / divisor.max(1) as f64;
    boxes
        .iter()
        .filter(|b| b.area() as f64 > limit)
        .copied()
        .collect()
}
