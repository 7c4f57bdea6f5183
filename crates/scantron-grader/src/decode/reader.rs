// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Card reading front end: binarize a rectified card, trace contours inside
// the answer area and decode the filled bubbles.

use image::imageops::{crop_imm, replace};
use image::{DynamicImage, GrayImage, Luma};
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::filter::box_filter;
use imageproc::morphology::dilate;
use scantron_core::config::{CardLayout, CropArea, ReadConfig};
use scantron_core::error::{GradeError, Result};
use scantron_core::{AnswerGrid, BoundingBox, ContourHierarchy, FrameSize};
use serde::Serialize;
use tracing::{debug, info, instrument};

use super::grid;
use super::hierarchy::{Classification, boxes_larger_than, classify_where};

/// Background margin around the crop, so the paper's own outline is traced.
const TRACE_PADDING: u32 = 1;

/// Decoded answers of one card together with decoding diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardReading {
    pub answers: AnswerGrid,
    /// Region boundary in crop coordinates.
    pub region: BoundingBox,
    /// Filled shapes found inside the region.
    pub mark_count: usize,
    /// Shapes that set no cell: too small, or outside the grid.
    pub discarded_marks: usize,
}

/// Reads the answer grid from a rectified card image.
///
/// ## Pipeline
///
/// 1. Grayscale and Otsu binarization with paper as foreground
/// 2. Box blur and dilation of the paper, which wipes out thin printed
///    bubble outlines and shrinks pencil fills
/// 3. Crop to the configured answer area, clamped to the image
/// 4. Optional one-pixel white frame so fills touching the crop edge stay
///    enclosed by paper
/// 5. Contour tree: the paper outline is the region boundary and every fill
///    is a hole nested inside it
/// 6. Grid decoding, single block or grouped bar
#[derive(Debug, Clone)]
pub struct CardReader {
    layout: CardLayout,
    config: ReadConfig,
}

impl CardReader {
    pub fn new(layout: CardLayout, config: ReadConfig) -> Self {
        Self { layout, config }
    }

    pub fn layout(&self) -> &CardLayout {
        &self.layout
    }

    /// Decode the filled bubbles of a rectified card.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn read(&self, image: &DynamicImage) -> Result<CardReading> {
        let prepared = self.prepare(image)?;
        let crop = FrameSize::new(prepared.width(), prepared.height());

        let contours = find_contours::<i32>(&pad(&prepared));
        let (boxes, hierarchy) = contour_tree(&contours)?;
        debug!(contours = contours.len(), "Contours traced");

        let dominant = boxes_larger_than(&boxes, crop, 2);
        debug!(dominant = dominant.len(), "Boxes covering more than half the crop");

        let nested = hierarchy.nodes().iter().any(|node| node.parent.is_some());
        let classification = if nested {
            classify_where(&boxes, &hierarchy, |index| {
                contours[index].border_type == BorderType::Hole
            })?
        } else {
            unmarked_area(&boxes)?
        };

        let layout = self.layout.grid_layout();
        let decoded = grid::decode(&classification.marks, &layout, &classification.region);

        info!(
            marks = classification.marks.len(),
            answered = decoded.answers.marked_count(),
            discarded = decoded.discarded(),
            "Card read"
        );
        Ok(CardReading {
            mark_count: classification.marks.len(),
            discarded_marks: decoded.discarded(),
            region: classification.region,
            answers: decoded.answers,
        })
    }

    /// Binary, cropped image handed to the contour tracer. Paper is
    /// foreground (any non-zero pixel), ink is zero.
    pub fn prepare(&self, image: &DynamicImage) -> Result<GrayImage> {
        let gray = image.to_luma8();
        let mut binary = binarize_paper(&gray);

        if self.config.blur_radius > 0 {
            binary = box_filter(&binary, self.config.blur_radius, self.config.blur_radius);
        }
        if self.config.dilation_radius > 0 {
            binary = dilate(&binary, Norm::LInf, self.config.dilation_radius);
        }

        let mut cropped = match self.layout.area() {
            Some(area) => crop_to_area(&binary, area)?,
            None => binary,
        };
        if self.config.white_border {
            paint_border(&mut cropped);
        }
        Ok(cropped)
    }
}

/// Otsu threshold with paper (bright) as white foreground.
///
/// A uniform image has an Otsu level of zero, so blank paper stays
/// foreground.
fn binarize_paper(gray: &GrayImage) -> GrayImage {
    let level = otsu_level(gray);
    debug!(level, "Otsu level computed");
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y).0[0] > level {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Crop to `area` after clamping it to the image. An area that misses the
/// image entirely is an error.
fn crop_to_area(image: &GrayImage, area: CropArea) -> Result<GrayImage> {
    let (width, height) = image.dimensions();
    let row2 = area.row2.min(height);
    let col2 = area.col2.min(width);
    if area.row1 >= row2 || area.col1 >= col2 {
        return Err(GradeError::InvalidArea {
            area: area.to_string(),
            width,
            height,
        });
    }
    if row2 != area.row2 || col2 != area.col2 {
        debug!(%area, width, height, "Crop area clamped to image");
    }
    Ok(crop_imm(image, area.col1, area.row1, col2 - area.col1, row2 - area.row1).to_image())
}

fn paint_border(image: &mut GrayImage) {
    let (width, height) = image.dimensions();
    let white = Luma([255u8]);
    for x in 0..width {
        image.put_pixel(x, 0, white);
        image.put_pixel(x, height - 1, white);
    }
    for y in 0..height {
        image.put_pixel(0, y, white);
        image.put_pixel(width - 1, y, white);
    }
}

/// Surround `image` with background. The tracer only starts outer borders
/// right of a background pixel, so paper touching the left edge would
/// otherwise have no outline.
fn pad(image: &GrayImage) -> GrayImage {
    let mut padded = GrayImage::new(
        image.width() + 2 * TRACE_PADDING,
        image.height() + 2 * TRACE_PADDING,
    );
    replace(&mut padded, image, TRACE_PADDING as i64, TRACE_PADDING as i64);
    padded
}

/// Answer area with nothing nested in the paper: no marks, and the last
/// paper outline is the region.
fn unmarked_area(boxes: &[BoundingBox]) -> Result<Classification> {
    let region = boxes
        .last()
        .copied()
        .ok_or(GradeError::MissingRegionBoundary { contours: 0 })?;
    debug!(?region, "No fills inside the answer area");
    Ok(Classification {
        marks: Vec::new(),
        region,
    })
}

/// Bounding boxes in crop coordinates and parent/child links of contours
/// traced on the padded crop.
fn contour_tree(contours: &[Contour<i32>]) -> Result<(Vec<BoundingBox>, ContourHierarchy)> {
    let offset = TRACE_PADDING as i32;
    let boxes = contours
        .iter()
        .enumerate()
        .map(|(index, contour)| {
            BoundingBox::from_points(contour.points.iter().map(|p| (p.x - offset, p.y - offset)))
                .ok_or_else(|| GradeError::InvalidInput(format!("contour {index} has no points")))
        })
        .collect::<Result<Vec<_>>>()?;
    let parents: Vec<Option<usize>> = contours.iter().map(|c| c.parent).collect();
    let hierarchy = ContourHierarchy::from_parents(&parents)?;
    Ok((boxes, hierarchy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut};
    use imageproc::rect::Rect;

    /// White card with the answer area at rows 40..200, cols 50..250.
    /// Bubble cells for a 5x4 single block are 40x40 pixels.
    fn blank_card() -> RgbImage {
        RgbImage::from_pixel(300, 250, Rgb([255, 255, 255]))
    }

    fn fill_cell(card: &mut RgbImage, question: i32, option: i32) {
        let x = 50 + question * 40 + 6;
        let y = 40 + option * 40 + 6;
        draw_filled_rect_mut(card, Rect::at(x, y).of_size(28, 28), Rgb([0, 0, 0]));
    }

    /// Printed one-pixel bubble outline around every cell.
    fn print_bubbles(card: &mut RgbImage) {
        for question in 0..5 {
            for option in 0..4 {
                let x = 50 + question * 40 + 4;
                let y = 40 + option * 40 + 4;
                draw_hollow_rect_mut(card, Rect::at(x, y).of_size(32, 32), Rgb([0, 0, 0]));
            }
        }
    }

    fn single_block_reader() -> CardReader {
        let layout = CardLayout::new(5, 4, 1)
            .unwrap()
            .with_area(CropArea::new(40, 200, 50, 250).unwrap())
            .unwrap();
        CardReader::new(layout, ReadConfig::default())
    }

    /// Verify that filled cells on a synthetic card are decoded to the
    /// matching question and option.
    #[test]
    fn reads_filled_cells_of_a_single_block() {
        let mut card = blank_card();
        fill_cell(&mut card, 1, 2);
        fill_cell(&mut card, 4, 0);

        let reading = single_block_reader()
            .read(&DynamicImage::ImageRgb8(card))
            .unwrap();

        assert_eq!(reading.region, BoundingBox::new(0, 0, 200, 160));
        assert_eq!(reading.mark_count, 2);
        assert_eq!(reading.discarded_marks, 0);
        assert!(reading.answers.get(1, 2));
        assert!(reading.answers.get(4, 0));
        assert_eq!(reading.answers.marked_count(), 2);
    }

    /// Verify that a card with nothing filled in decodes to an empty grid
    /// rather than an error.
    #[test]
    fn blank_answer_area_reads_as_unanswered() {
        let reading = single_block_reader()
            .read(&DynamicImage::ImageRgb8(blank_card()))
            .unwrap();
        assert_eq!(reading.region, BoundingBox::new(0, 0, 200, 160));
        assert_eq!(reading.mark_count, 0);
        assert_eq!(reading.answers.marked_count(), 0);
        assert_eq!(reading.answers.question_count(), 5);
    }

    /// Verify that printed, unfilled bubble outlines are not read as
    /// answers.
    #[test]
    fn printed_bubble_outlines_are_not_marks() {
        let mut card = blank_card();
        print_bubbles(&mut card);
        fill_cell(&mut card, 1, 2);

        let reading = single_block_reader()
            .read(&DynamicImage::ImageRgb8(card))
            .unwrap();
        assert_eq!(reading.mark_count, 1);
        assert_eq!(reading.answers.marked_count(), 1);
        assert!(reading.answers.get(1, 2));
    }

    #[test]
    fn printed_outlines_alone_read_as_unanswered() {
        let mut card = blank_card();
        print_bubbles(&mut card);

        let reading = single_block_reader()
            .read(&DynamicImage::ImageRgb8(card))
            .unwrap();
        assert_eq!(reading.mark_count, 0);
        assert_eq!(reading.answers.marked_count(), 0);
    }

    #[test]
    fn specks_are_discarded_as_noise() {
        let mut card = blank_card();
        fill_cell(&mut card, 2, 1);
        draw_filled_rect_mut(&mut card, Rect::at(150, 160).of_size(10, 10), Rgb([0, 0, 0]));

        let reading = single_block_reader()
            .read(&DynamicImage::ImageRgb8(card))
            .unwrap();
        assert_eq!(reading.mark_count, 2);
        assert_eq!(reading.discarded_marks, 1);
        assert_eq!(reading.answers.marked_options(2), vec![1]);
    }

    #[test]
    fn fill_touching_the_crop_edge_is_still_read() {
        let mut card = blank_card();
        draw_filled_rect_mut(&mut card, Rect::at(40, 30).of_size(40, 40), Rgb([0, 0, 0]));

        let reading = single_block_reader()
            .read(&DynamicImage::ImageRgb8(card))
            .unwrap();
        assert_eq!(reading.mark_count, 1);
        assert_eq!(reading.answers.marked_options(0), vec![0]);
    }

    #[test]
    fn crop_area_is_clamped_to_the_image() {
        let layout = CardLayout::new(5, 4, 1)
            .unwrap()
            .with_area(CropArea::new(40, 900, 50, 900).unwrap())
            .unwrap();
        let reader = CardReader::new(layout, ReadConfig::default());
        let prepared = reader
            .prepare(&DynamicImage::ImageRgb8(blank_card()))
            .unwrap();
        assert_eq!(prepared.dimensions(), (250, 210));
    }

    #[test]
    fn crop_area_outside_the_image_is_rejected() {
        let layout = CardLayout::new(5, 4, 1)
            .unwrap()
            .with_area(CropArea::new(400, 500, 0, 100).unwrap())
            .unwrap();
        let reader = CardReader::new(layout, ReadConfig::default());
        let err = reader
            .read(&DynamicImage::ImageRgb8(blank_card()))
            .unwrap_err();
        assert!(matches!(err, GradeError::InvalidArea { width: 300, height: 250, .. }));
    }

    #[test]
    fn white_border_frames_the_crop() {
        let mut card = blank_card();
        draw_filled_rect_mut(&mut card, Rect::at(40, 30).of_size(40, 40), Rgb([0, 0, 0]));

        let prepared = single_block_reader()
            .prepare(&DynamicImage::ImageRgb8(card))
            .unwrap();
        assert_eq!(prepared.get_pixel(0, 10).0[0], 255);
        assert_eq!(prepared.get_pixel(10, 0).0[0], 255);
        assert_eq!(prepared.get_pixel(10, 10).0[0], 0);
        assert_eq!(prepared.get_pixel(100, 80).0[0], 255);
    }
}
