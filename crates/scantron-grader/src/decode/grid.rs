// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mapping of mark centers onto the question-by-option answer grid.
//
// The region box is divided uniformly: question columns along x and answer
// options along y. Grouped layouts place several question blocks side by
// side, separated by `space_step` empty columns.

use scantron_core::{AnswerGrid, BoundingBox, GridLayout, MarkCenter};
use tracing::{debug, trace};

/// Result of mapping one set of marks onto a grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridDecode {
    pub answers: AnswerGrid,
    /// Marks at or below the minimum relative area.
    pub noise: usize,
    /// Marks outside the grid, including those inside a gap between blocks.
    pub out_of_range: usize,
}

impl GridDecode {
    /// Marks that did not set a cell.
    pub fn discarded(&self) -> usize {
        self.noise + self.out_of_range
    }
}

/// Decode with the mapper that fits `layout`: one block, or several.
pub fn decode(marks: &[MarkCenter], layout: &GridLayout, region: &BoundingBox) -> GridDecode {
    if layout.group_count <= 1 {
        decode_single_group(marks, layout, region)
    } else {
        decode_grouped_bar(marks, layout, region)
    }
}

/// Map marks onto a single block of `question_count` columns.
///
/// `group_count` and `space_step` of `layout` are not consulted. Mark
/// coordinates are image coordinates; they are taken relative to the region
/// origin.
pub fn decode_single_group(
    marks: &[MarkCenter],
    layout: &GridLayout,
    region: &BoundingBox,
) -> GridDecode {
    let (q, a) = (layout.question_count, layout.answer_count);
    let step_x = region.width as f64 / q as f64;
    let step_y = region.height as f64 / a as f64;

    map_marks(marks, layout, region, step_x, step_y, q, |col| clamp_index(col, q))
}

/// Map marks onto `group_count` blocks of `question_count` columns separated
/// by gaps of `space_step` columns.
///
/// Question rows of block `g` (zero based) are `g * question_count ..
/// (g + 1) * question_count`. A column index equal to the block width lands
/// on the edge between a block and its gap and is clamped to the block's
/// last question; columns deeper inside a gap are out of range.
pub fn decode_grouped_bar(
    marks: &[MarkCenter],
    layout: &GridLayout,
    region: &BoundingBox,
) -> GridDecode {
    let q = layout.question_count;
    let columns = layout.column_count();
    let stride = q + layout.space_step;
    let step_x = region.width as f64 / columns as f64;
    let step_y = region.height as f64 / layout.answer_count as f64;

    map_marks(
        marks,
        layout,
        region,
        step_x,
        step_y,
        layout.total_questions(),
        |col| {
            let col = clamp_index(col, columns)?;
            let group = col / stride;
            let offset = clamp_index(col - group * stride, q)?;
            Some(group * q + offset)
        },
    )
}

/// Shared cell assignment. `question_of` turns a column index into a
/// question row, or `None` when the column holds no question.
fn map_marks(
    marks: &[MarkCenter],
    layout: &GridLayout,
    region: &BoundingBox,
    step_x: f64,
    step_y: f64,
    rows: usize,
    question_of: impl Fn(usize) -> Option<usize>,
) -> GridDecode {
    let a = layout.answer_count;
    let min_area = layout.min_relative_mark_area * step_x * step_y;
    let mut answers = AnswerGrid::new(rows, a);
    let mut noise = 0;
    let mut out_of_range = 0;

    for mark in marks {
        if mark.area <= min_area {
            trace!(x = mark.x, y = mark.y, area = mark.area, min_area, "Discarding noise mark");
            noise += 1;
            continue;
        }

        let col = cell_index(mark.x - region.x as f64, step_x);
        let row = cell_index(mark.y - region.y as f64, step_y);
        let cell = col
            .and_then(&question_of)
            .zip(row.and_then(|r| clamp_index(r, a)));

        match cell {
            Some((question, option)) if answers.mark(question, option) => {}
            _ => {
                trace!(x = mark.x, y = mark.y, "Mark outside the answer grid");
                out_of_range += 1;
            }
        }
    }

    debug!(
        marks = marks.len(),
        marked = answers.marked_count(),
        noise,
        out_of_range,
        "Marks mapped onto answer grid"
    );
    GridDecode {
        answers,
        noise,
        out_of_range,
    }
}

/// Floor of `offset / step`, `None` for negative or non-finite results.
fn cell_index(offset: f64, step: f64) -> Option<usize> {
    let index = (offset / step).floor();
    (index.is_finite() && index >= 0.0).then_some(index as usize)
}

/// An index equal to `count` lies on the far boundary and is clamped to the
/// last cell; anything larger is out of range.
fn clamp_index(index: usize, count: usize) -> Option<usize> {
    match index.cmp(&count) {
        std::cmp::Ordering::Less => Some(index),
        std::cmp::Ordering::Equal => count.checked_sub(1),
        std::cmp::Ordering::Greater => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(w: i32, h: i32) -> BoundingBox {
        BoundingBox::new(0, 0, w, h)
    }

    fn marked_cells(grid: &AnswerGrid) -> Vec<(usize, usize)> {
        (0..grid.question_count())
            .flat_map(|q| grid.marked_options(q).into_iter().map(move |o| (q, o)))
            .collect()
    }

    /// Verify the canonical single-group example: 5 questions, 4 options,
    /// a 100x80 region and one mark at (12, 10) set exactly cell [0][0].
    #[test]
    fn single_group_single_mark() {
        let layout = GridLayout::single(5, 4);
        let marks = [MarkCenter::new(12.0, 10.0, 150.0)];
        let result = decode_single_group(&marks, &layout, &region(100, 80));

        assert_eq!(result.answers.question_count(), 5);
        assert_eq!(result.answers.option_count(), 4);
        assert_eq!(marked_cells(&result.answers), vec![(0, 0)]);
        assert_eq!(result.discarded(), 0);
    }

    /// Verify that marks at or below the relative area threshold never set
    /// a cell, even when centered on a valid cell.
    #[test]
    fn small_marks_are_noise() {
        // Cell is 20x20 = 400; threshold 0.2 * 400 = 80.
        let layout = GridLayout::single(5, 4);
        let marks = [
            MarkCenter::new(10.0, 10.0, 80.0),
            MarkCenter::new(30.0, 30.0, 12.0),
            MarkCenter::new(50.0, 50.0, 0.0),
        ];
        let result = decode_single_group(&marks, &layout, &region(100, 80));
        assert_eq!(result.answers.marked_count(), 0);
        assert_eq!(result.noise, 3);
    }

    #[test]
    fn boundary_marks_clamp_to_last_cell() {
        let layout = GridLayout::single(5, 4);
        let marks = [
            // Exactly on the bottom edge.
            MarkCenter::new(30.0, 80.0, 200.0),
            // Exactly on the right edge.
            MarkCenter::new(100.0, 30.0, 200.0),
            // Bottom-right corner.
            MarkCenter::new(100.0, 80.0, 200.0),
        ];
        let result = decode_single_group(&marks, &layout, &region(100, 80));
        assert_eq!(marked_cells(&result.answers), vec![(1, 3), (4, 1), (4, 3)]);
        assert_eq!(result.out_of_range, 0);
    }

    #[test]
    fn marks_beyond_the_region_are_dropped() {
        let layout = GridLayout::single(5, 4);
        let marks = [
            MarkCenter::new(125.0, 30.0, 200.0),
            MarkCenter::new(30.0, 105.0, 200.0),
            MarkCenter::new(-3.0, 30.0, 200.0),
        ];
        let result = decode_single_group(&marks, &layout, &region(100, 80));
        assert_eq!(result.answers.marked_count(), 0);
        assert_eq!(result.out_of_range, 3);
    }

    #[test]
    fn coordinates_are_relative_to_region_origin() {
        let layout = GridLayout::single(5, 4);
        let offset = BoundingBox::new(200, 100, 100, 80);
        let marks = [MarkCenter::new(212.0, 110.0, 150.0)];
        let result = decode_single_group(&marks, &layout, &offset);
        assert_eq!(marked_cells(&result.answers), vec![(0, 0)]);
    }

    /// Verify that the grouped mapper reproduces the single-group pattern
    /// in every block when marks sit at the same offsets within each block.
    #[test]
    fn grouped_reproduces_single_group_per_block() {
        let (q, a, g) = (5, 4, 4);
        // 23 columns of 10px, 4 rows of 20px.
        let grouped = GridLayout::grouped(q, a, g);
        let bar = region(230, 80);

        let pattern = [(15.0, 10.0), (35.0, 50.0), (45.0, 70.0), (5.0, 30.0)];
        let single = decode_single_group(
            &pattern.map(|(x, y)| MarkCenter::new(x, y, 100.0)),
            &GridLayout::single(q, a),
            &region(50, 80),
        );
        let expected: Vec<(usize, usize)> = marked_cells(&single.answers);
        assert_eq!(expected.len(), pattern.len());

        let marks: Vec<MarkCenter> = (0..g)
            .flat_map(|block| {
                let shift = (block * (q + 1) * 10) as f64;
                pattern.map(|(x, y)| MarkCenter::new(x + shift, y, 100.0))
            })
            .collect();
        let result = decode_grouped_bar(&marks, &grouped, &bar);

        assert_eq!(result.answers.question_count(), q * g);
        assert_eq!(result.answers.option_count(), a);
        assert_eq!(result.discarded(), 0);
        for block in 0..g {
            for question in 0..q {
                for option in 0..a {
                    assert_eq!(
                        result.answers.get(block * q + question, option),
                        single.answers.get(question, option),
                        "block {block} question {question} option {option}"
                    );
                }
            }
        }
    }

    #[test]
    fn grouped_gap_edge_clamps_and_deep_gap_drops() {
        // Two blocks of 5 with a 2-column gap: 12 columns of 10px.
        let layout = GridLayout::grouped(5, 4, 2).with_space_step(2);
        let bar = region(120, 80);
        let marks = [
            // Column 5: edge of block 0 and its gap.
            MarkCenter::new(55.0, 10.0, 100.0),
            // Column 6: inside the gap.
            MarkCenter::new(65.0, 10.0, 100.0),
            // Column 7: first question of block 1.
            MarkCenter::new(75.0, 10.0, 100.0),
            // Right edge of the whole bar.
            MarkCenter::new(120.0, 10.0, 100.0),
        ];
        let result = decode_grouped_bar(&marks, &layout, &bar);
        assert_eq!(marked_cells(&result.answers), vec![(4, 0), (5, 0), (9, 0)]);
        assert_eq!(result.out_of_range, 1);
    }

    #[test]
    fn grouped_noise_threshold_uses_narrow_cells() {
        // 23 columns of 10px by 20px rows: cell 200, threshold 0.05 * 200 = 10.
        let layout = GridLayout::grouped(5, 4, 4);
        let marks = [
            MarkCenter::new(5.0, 10.0, 10.0),
            MarkCenter::new(15.0, 10.0, 11.0),
        ];
        let result = decode_grouped_bar(&marks, &layout, &region(230, 80));
        assert_eq!(marked_cells(&result.answers), vec![(1, 0)]);
        assert_eq!(result.noise, 1);
    }

    #[test]
    fn decode_dispatches_on_group_count() {
        let marks = [MarkCenter::new(12.0, 10.0, 150.0)];
        let single = decode(&marks, &GridLayout::single(5, 4), &region(100, 80));
        assert_eq!(single.answers.question_count(), 5);
        let grouped = decode(&marks, &GridLayout::grouped(5, 4, 2), &region(110, 80));
        assert_eq!(grouped.answers.question_count(), 10);
        assert_eq!(marked_cells(&grouped.answers), vec![(1, 0)]);
    }

    #[test]
    fn no_marks_yield_an_empty_grid() {
        let result = decode(&[], &GridLayout::grouped(5, 4, 4), &region(230, 80));
        assert_eq!(result.answers.marked_count(), 0);
        assert_eq!(result.answers.question_count(), 20);
    }
}
