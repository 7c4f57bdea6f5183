// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grader configuration: rectification tuning, card reading tuning, and the
// answer-sheet layout. Loaded from and saved to JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{GradeError, Result};
use crate::types::GridLayout;

/// Complete configuration for grading one kind of answer sheet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GraderConfig {
    /// Perspective rectification parameters.
    #[serde(default)]
    pub rectify: RectifyConfig,
    /// Binarization and contour extraction parameters.
    #[serde(default)]
    pub read: ReadConfig,
    /// Where the answers are and how they are arranged.
    pub layout: CardLayout,
}

impl GraderConfig {
    pub fn new(layout: CardLayout) -> Self {
        Self {
            rectify: RectifyConfig::default(),
            read: ReadConfig::default(),
            layout,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.rectify.validate()?;
        self.layout.grid_layout().validate()
    }

    /// Load and validate a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON.
    pub fn to_json_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// An inclusive range of line angles, in degrees from horizontal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleRange {
    pub min_degrees: f64,
    pub max_degrees: f64,
}

impl AngleRange {
    pub const fn new(min_degrees: f64, max_degrees: f64) -> Self {
        Self {
            min_degrees,
            max_degrees,
        }
    }

    pub fn contains(&self, degrees: f64) -> bool {
        (self.min_degrees..=self.max_degrees).contains(&degrees)
    }
}

/// Card edges are near-horizontal or near-vertical after acquisition.
pub const DEFAULT_ANGLE_RANGES: [AngleRange; 2] =
    [AngleRange::new(0.0, 10.0), AngleRange::new(80.0, 90.0)];

/// Parameters for locating the card and warping it flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectifyConfig {
    /// Canonical working width in pixels.
    pub width: u32,
    /// Canonical working height in pixels.
    pub height: u32,
    /// Box blur radius applied before edge detection.
    pub blur_radius: u32,
    /// Canny hysteresis low threshold.
    pub canny_low: f32,
    /// Canny hysteresis high threshold.
    pub canny_high: f32,
    /// Minimum Hough accumulator votes for a line.
    pub hough_vote_threshold: u32,
    /// Non-maximum suppression radius in Hough space.
    pub hough_suppression_radius: u32,
    /// Line angles kept for corner detection.
    pub angle_ranges: Vec<AngleRange>,
    /// Intersections further than this from the right edge are discarded.
    pub margin_x: f64,
    /// Intersections further than this from the bottom edge are discarded.
    pub margin_y: f64,
}

impl Default for RectifyConfig {
    fn default() -> Self {
        Self {
            width: 600,
            height: 700,
            blur_radius: 2,
            canny_low: 50.0,
            canny_high: 200.0,
            hough_vote_threshold: 120,
            hough_suppression_radius: 8,
            angle_ranges: DEFAULT_ANGLE_RANGES.to_vec(),
            margin_x: 0.0,
            margin_y: 0.0,
        }
    }
}

impl RectifyConfig {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(GradeError::InvalidConfig(format!(
                "canonical size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.canny_low > self.canny_high {
            return Err(GradeError::InvalidConfig(format!(
                "canny low threshold {} exceeds high threshold {}",
                self.canny_low, self.canny_high
            )));
        }
        if let Some(bad) = self
            .angle_ranges
            .iter()
            .find(|r| r.min_degrees > r.max_degrees)
        {
            return Err(GradeError::InvalidConfig(format!(
                "angle range [{}, {}] is reversed",
                bad.min_degrees, bad.max_degrees
            )));
        }
        Ok(())
    }
}

/// Parameters for turning a rectified card into contours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadConfig {
    /// Box blur radius applied to the binary paper mask.
    pub blur_radius: u32,
    /// Dilation radius applied to the paper, erasing thin printed bubble
    /// outlines and shrinking fills.
    pub dilation_radius: u8,
    /// Paint a one-pixel white frame around the crop before contour tracing.
    pub white_border: bool,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            blur_radius: 1,
            dilation_radius: 1,
            white_border: true,
        }
    }
}

/// Crop rectangle in rectified-image pixels: rows `row1..row2`, columns
/// `col1..col2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropArea {
    pub row1: u32,
    pub row2: u32,
    pub col1: u32,
    pub col2: u32,
}

impl CropArea {
    pub fn new(row1: u32, row2: u32, col1: u32, col2: u32) -> Result<Self> {
        let area = Self {
            row1,
            row2,
            col1,
            col2,
        };
        area.validate()?;
        Ok(area)
    }

    pub fn validate(&self) -> Result<()> {
        if self.row1 >= self.row2 || self.col1 >= self.col2 {
            return Err(GradeError::InvalidLayout(format!(
                "crop area {self} is empty or reversed"
            )));
        }
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.col2 - self.col1
    }

    pub fn height(&self) -> u32 {
        self.row2 - self.row1
    }
}

impl std::fmt::Display for CropArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[rows {}..{}, cols {}..{}]",
            self.row1, self.row2, self.col1, self.col2
        )
    }
}

/// Decode-stage description of an answer sheet.
///
/// Constructed through [`CardLayout::new`] or deserialization, both of which
/// validate every field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCardLayout")]
pub struct CardLayout {
    area: Option<CropArea>,
    group_count: usize,
    question_count: usize,
    answer_count: usize,
    space_step: usize,
    min_relative_mark_area: Option<f64>,
}

#[derive(Deserialize)]
struct RawCardLayout {
    #[serde(default)]
    area: Option<CropArea>,
    group_count: usize,
    question_count: usize,
    answer_count: usize,
    #[serde(default = "default_space_step")]
    space_step: usize,
    #[serde(default)]
    min_relative_mark_area: Option<f64>,
}

fn default_space_step() -> usize {
    1
}

impl TryFrom<RawCardLayout> for CardLayout {
    type Error = GradeError;

    fn try_from(raw: RawCardLayout) -> Result<Self> {
        let layout = Self {
            area: raw.area,
            group_count: raw.group_count,
            question_count: raw.question_count,
            answer_count: raw.answer_count,
            space_step: raw.space_step,
            min_relative_mark_area: raw.min_relative_mark_area,
        };
        layout.validate()?;
        Ok(layout)
    }
}

impl Default for CardLayout {
    /// Four blocks of five questions with four options each.
    fn default() -> Self {
        Self {
            area: None,
            group_count: 4,
            question_count: 5,
            answer_count: 4,
            space_step: 1,
            min_relative_mark_area: None,
        }
    }
}

impl CardLayout {
    pub fn new(question_count: usize, answer_count: usize, group_count: usize) -> Result<Self> {
        let layout = Self {
            area: None,
            group_count,
            question_count,
            answer_count,
            space_step: 1,
            min_relative_mark_area: None,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Restrict reading to a sub-rectangle of the rectified card.
    pub fn with_area(mut self, area: CropArea) -> Result<Self> {
        area.validate()?;
        self.area = Some(area);
        Ok(self)
    }

    pub fn with_space_step(mut self, space_step: usize) -> Result<Self> {
        self.space_step = space_step;
        self.validate()?;
        Ok(self)
    }

    pub fn with_min_relative_mark_area(mut self, ratio: f64) -> Result<Self> {
        self.min_relative_mark_area = Some(ratio);
        self.validate()?;
        Ok(self)
    }

    pub fn area(&self) -> Option<CropArea> {
        self.area
    }

    pub fn group_count(&self) -> usize {
        self.group_count
    }

    pub fn question_count(&self) -> usize {
        self.question_count
    }

    pub fn answer_count(&self) -> usize {
        self.answer_count
    }

    /// Grid geometry for the mapper. A single group uses the single-group
    /// noise threshold, several groups the grouped one, unless overridden.
    pub fn grid_layout(&self) -> GridLayout {
        let base = if self.group_count == 1 {
            GridLayout::single(self.question_count, self.answer_count)
        } else {
            GridLayout::grouped(self.question_count, self.answer_count, self.group_count)
        };
        let base = base.with_space_step(self.space_step);
        match self.min_relative_mark_area {
            Some(ratio) => base.with_min_relative_mark_area(ratio),
            None => base,
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(area) = &self.area {
            area.validate()?;
        }
        self.grid_layout().validate()
    }
}
