// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Domain types shared across all Scantron crates: line segments, points,
// quadrilaterals, contour boxes and hierarchy, and the answer grid.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{GradeError, Result};

/// A point in image coordinates. Intersections and corners are fractional.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Convert to the `(f32, f32)` tuple form used by `imageproc` projections.
    pub fn to_f32_tuple(self) -> (f32, f32) {
        (self.x as f32, self.y as f32)
    }
}

/// Width and height of an image frame in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The longer of the two dimensions.
    pub fn longer_side(&self) -> u32 {
        self.width.max(self.height)
    }

    /// Geometric center of the frame.
    pub fn center(&self) -> Point2 {
        Point2::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A line segment on the pixel grid of one image.
///
/// Endpoint order carries no meaning until [`LineSegment::normalized`] puts
/// the left endpoint first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineSegment {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl LineSegment {
    pub const fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build a segment from a polar line `x·cos θ + y·sin θ = ρ`.
    ///
    /// The foot of the perpendicular from the origin is moved `extension`
    /// pixels in both directions along the line; coordinates are truncated
    /// towards zero.
    pub fn from_polar(rho: f64, theta: f64, extension: f64) -> Self {
        let (b, a) = theta.sin_cos();
        let x0 = a * rho;
        let y0 = b * rho;
        Self {
            x1: (x0 - extension * b) as i32,
            y1: (y0 + extension * a) as i32,
            x2: (x0 + extension * b) as i32,
            y2: (y0 - extension * a) as i32,
        }
    }

    /// Horizontal extent `x2 - x1`.
    pub fn dx(&self) -> i32 {
        self.x2 - self.x1
    }

    /// Vertical extent `y2 - y1`.
    pub fn dy(&self) -> i32 {
        self.y2 - self.y1
    }

    /// The same segment with endpoints swapped if needed so that `x1 <= x2`.
    pub fn normalized(self) -> Self {
        if self.x1 > self.x2 {
            Self::new(self.x2, self.y2, self.x1, self.y1)
        } else {
            self
        }
    }
}

/// The four detected card corners in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadrilateral {
    pub top_left: Point2,
    pub top_right: Point2,
    pub bottom_right: Point2,
    pub bottom_left: Point2,
}

impl Quadrilateral {
    /// The full-frame rectangle `(0,0) (W,0) (W,H) (0,H)`.
    pub fn frame(size: FrameSize) -> Self {
        let w = size.width as f64;
        let h = size.height as f64;
        Self {
            top_left: Point2::new(0.0, 0.0),
            top_right: Point2::new(w, 0.0),
            bottom_right: Point2::new(w, h),
            bottom_left: Point2::new(0.0, h),
        }
    }

    /// Corners as an array in TL, TR, BR, BL order.
    pub fn to_array(&self) -> [Point2; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Corners as `(f32, f32)` tuples in TL, TR, BR, BL order.
    pub fn to_f32_tuples(&self) -> [(f32, f32); 4] {
        self.to_array().map(Point2::to_f32_tuple)
    }

    /// Area via the shoelace formula.
    pub fn area(&self) -> f64 {
        let pts = self.to_array();
        let mut twice = 0.0;
        for i in 0..pts.len() {
            let j = (i + 1) % pts.len();
            twice += pts[i].x * pts[j].y - pts[j].x * pts[i].y;
        }
        twice.abs() / 2.0
    }

    /// True when any three corners are collinear. A projective transform from
    /// such a quadrilateral is undefined.
    pub fn is_degenerate(&self) -> bool {
        const EPS: f64 = 1e-6;
        let pts = self.to_array();
        (0..4).any(|skip| {
            let tri: Vec<Point2> = (0..4).filter(|&i| i != skip).map(|i| pts[i]).collect();
            let cross = (tri[1].x - tri[0].x) * (tri[2].y - tri[0].y)
                - (tri[1].y - tri[0].y) * (tri[2].x - tri[0].x);
            cross.abs() < EPS
        })
    }
}

/// Axis-aligned bounding box of one contour, in pixels.
///
/// Extents are inclusive of both edge pixels, so a single pixel has
/// `width == height == 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Tightest box around a set of pixel coordinates, `None` if empty.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (i32, i32)>,
    {
        let mut iter = points.into_iter();
        let (x0, y0) = iter.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (x0, y0, x0, y0);
        for (x, y) in iter {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Corner form `(x1, y1, x2, y2)`.
    pub fn to_corners(&self) -> (i32, i32, i32, i32) {
        (self.x, self.y, self.right(), self.bottom())
    }

    pub fn center(&self) -> Point2 {
        Point2::new(
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }
}

/// Links of one contour to its neighbours in the contour tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub previous: Option<usize>,
    pub next: Option<usize>,
    pub first_child: Option<usize>,
    pub parent: Option<usize>,
}

/// Parent/sibling/child relationships for every contour of one image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContourHierarchy {
    nodes: Vec<HierarchyNode>,
}

impl ContourHierarchy {
    pub fn new(nodes: Vec<HierarchyNode>) -> Self {
        Self { nodes }
    }

    /// Derive the full tree from per-contour parent links.
    ///
    /// Siblings share a parent (top-level contours are siblings of each
    /// other) and are chained in index order; the first child is the lowest
    /// indexed contour naming a node as parent.
    pub fn from_parents(parents: &[Option<usize>]) -> Result<Self> {
        let mut nodes = vec![HierarchyNode::default(); parents.len()];
        let mut last_sibling: HashMap<Option<usize>, usize> = HashMap::new();

        for (index, &parent) in parents.iter().enumerate() {
            if let Some(p) = parent {
                if p >= parents.len() || p == index {
                    return Err(GradeError::InvalidInput(format!(
                        "contour {index} names invalid parent {p}"
                    )));
                }
            }
            nodes[index].parent = parent;
            match last_sibling.insert(parent, index) {
                Some(previous) => {
                    nodes[previous].next = Some(index);
                    nodes[index].previous = Some(previous);
                }
                None => {
                    if let Some(p) = parent {
                        nodes[p].first_child = Some(index);
                    }
                }
            }
        }

        Ok(Self { nodes })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&HierarchyNode> {
        self.nodes.get(index)
    }

    pub fn nodes(&self) -> &[HierarchyNode] {
        &self.nodes
    }
}

/// Center and area of a contour classified as a filled answer mark.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkCenter {
    pub x: f64,
    pub y: f64,
    pub area: f64,
}

impl MarkCenter {
    pub const fn new(x: f64, y: f64, area: f64) -> Self {
        Self { x, y, area }
    }
}

impl From<&BoundingBox> for MarkCenter {
    fn from(b: &BoundingBox) -> Self {
        let c = b.center();
        Self::new(c.x, c.y, b.area() as f64)
    }
}

/// Logical geometry of the bubble grid inside the region boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    /// Question columns per group.
    pub question_count: usize,
    /// Answer options (rows) per question.
    pub answer_count: usize,
    /// Side-by-side question blocks.
    pub group_count: usize,
    /// Width of the gap between blocks, in cell widths.
    pub space_step: usize,
    /// Marks with area at or below this fraction of one cell are noise.
    pub min_relative_mark_area: f64,
}

impl GridLayout {
    pub const SINGLE_GROUP_MIN_AREA: f64 = 0.2;
    pub const GROUPED_MIN_AREA: f64 = 0.05;

    /// One block of `question_count` columns.
    pub fn single(question_count: usize, answer_count: usize) -> Self {
        Self {
            question_count,
            answer_count,
            group_count: 1,
            space_step: 1,
            min_relative_mark_area: Self::SINGLE_GROUP_MIN_AREA,
        }
    }

    /// `group_count` blocks separated by one-cell gaps.
    pub fn grouped(question_count: usize, answer_count: usize, group_count: usize) -> Self {
        Self {
            question_count,
            answer_count,
            group_count,
            space_step: 1,
            min_relative_mark_area: Self::GROUPED_MIN_AREA,
        }
    }

    pub fn with_space_step(mut self, space_step: usize) -> Self {
        self.space_step = space_step;
        self
    }

    pub fn with_min_relative_mark_area(mut self, ratio: f64) -> Self {
        self.min_relative_mark_area = ratio;
        self
    }

    /// Rows of the resulting answer grid.
    pub fn total_questions(&self) -> usize {
        self.question_count * self.group_count
    }

    /// Cell columns spanned by the region, gap columns included.
    pub fn column_count(&self) -> usize {
        self.total_questions() + self.group_count.saturating_sub(1) * self.space_step
    }

    pub fn validate(&self) -> Result<()> {
        if self.question_count == 0 || self.answer_count == 0 || self.group_count == 0 {
            return Err(GradeError::InvalidLayout(format!(
                "question, answer and group counts must be positive (got {}, {}, {})",
                self.question_count, self.answer_count, self.group_count
            )));
        }
        if self.group_count > 1 && self.space_step == 0 {
            return Err(GradeError::InvalidLayout(
                "grouped layouts need a space step of at least one cell".into(),
            ));
        }
        if !(0.0..1.0).contains(&self.min_relative_mark_area) {
            return Err(GradeError::InvalidLayout(format!(
                "minimum relative mark area must be in [0, 1), got {}",
                self.min_relative_mark_area
            )));
        }
        Ok(())
    }
}

/// Question-by-option matrix of filled bubbles.
///
/// Every cell starts unmarked; the grid mapper marks cells while decoding and
/// the finished grid is handed to the caller as a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerGrid {
    questions: usize,
    options: usize,
    cells: Vec<bool>,
}

impl AnswerGrid {
    pub fn new(questions: usize, options: usize) -> Self {
        Self {
            questions,
            options,
            cells: vec![false; questions * options],
        }
    }

    pub fn question_count(&self) -> usize {
        self.questions
    }

    pub fn option_count(&self) -> usize {
        self.options
    }

    /// Whether option `option` is marked for `question`. Out of range is false.
    pub fn get(&self, question: usize, option: usize) -> bool {
        question < self.questions && option < self.options && self.cells[question * self.options + option]
    }

    /// Mark a cell. Returns false (and changes nothing) when out of range.
    pub fn mark(&mut self, question: usize, option: usize) -> bool {
        if question < self.questions && option < self.options {
            self.cells[question * self.options + option] = true;
            true
        } else {
            false
        }
    }

    /// Indices of marked options for one question.
    pub fn marked_options(&self, question: usize) -> Vec<usize> {
        (0..self.options).filter(|&o| self.get(question, o)).collect()
    }

    pub fn marked_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// One slice of option flags per question.
    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.cells.chunks(self.options.max(1))
    }

    /// The grid as nested vectors, question-major.
    pub fn to_matrix(&self) -> Vec<Vec<bool>> {
        self.rows().map(<[bool]>::to_vec).collect()
    }
}

impl fmt::Display for AnswerGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for question in 0..self.questions {
            let letters: Vec<String> = self
                .marked_options(question)
                .into_iter()
                .map(option_letter)
                .collect();
            let answer = if letters.is_empty() {
                "-".to_string()
            } else {
                letters.join("")
            };
            writeln!(f, "{:>3}: {}", question + 1, answer)?;
        }
        Ok(())
    }
}

/// Letter label for an option index: 0 → A, 1 → B, and so on.
pub fn option_letter(option: usize) -> String {
    let mut n = option;
    let mut label = Vec::new();
    loop {
        label.push(b'A' + (n % 26) as u8);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    label.reverse();
    String::from_utf8_lossy(&label).into_owned()
}
