// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Top-level grading: photo in, answer report out.

use std::path::Path;

use image::DynamicImage;
use scantron_core::config::GraderConfig;
use scantron_core::error::Result;
use scantron_core::{AnswerGrid, BoundingBox, Quadrilateral};
use serde::Serialize;
use tracing::{info, instrument};

use crate::decode::{CardReader, CardReading};
use crate::io::open_image;
use crate::rectify::{CardRectifier, Rectification};

/// Everything learned from grading one card image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeReport {
    /// Where the image came from, when graded from a file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Card corners in the canonical frame before warping.
    pub corners: Quadrilateral,
    /// Whether a perspective warp was applied.
    pub warped: bool,
    /// Answers as question-major boolean rows.
    pub answers: Vec<Vec<bool>>,
    /// Answers as option letters per question, `""` for unanswered.
    pub letters: Vec<String>,
    pub region: BoundingBox,
    pub mark_count: usize,
    pub discarded_marks: usize,
}

impl GradeReport {
    fn new(source: Option<String>, rectification: &Rectification, reading: CardReading) -> Self {
        Self {
            source,
            corners: rectification.corners,
            warped: rectification.warped,
            answers: reading.answers.to_matrix(),
            letters: answer_letters(&reading.answers),
            region: reading.region,
            mark_count: reading.mark_count,
            discarded_marks: reading.discarded_marks,
        }
    }
}

fn answer_letters(grid: &AnswerGrid) -> Vec<String> {
    (0..grid.question_count())
        .map(|question| {
            grid.marked_options(question)
                .into_iter()
                .map(scantron_core::option_letter)
                .collect()
        })
        .collect()
}

/// Rectifies and reads answer sheets with one fixed configuration.
///
/// Holds configuration only, so one grader can be shared across threads.
#[derive(Debug, Clone)]
pub struct Grader {
    rectifier: CardRectifier,
    reader: CardReader,
}

impl Grader {
    /// Build a grader from a configuration, validating it first.
    pub fn new(config: GraderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            rectifier: CardRectifier::new(config.rectify),
            reader: CardReader::new(config.layout, config.read),
        })
    }

    pub fn rectifier(&self) -> &CardRectifier {
        &self.rectifier
    }

    pub fn reader(&self) -> &CardReader {
        &self.reader
    }

    /// Rectify and read an in-memory card image.
    #[instrument(skip_all)]
    pub fn grade(&self, image: &DynamicImage) -> Result<GradeReport> {
        self.grade_with_source(image, None)
    }

    /// Load, rectify and read a card image file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn grade_file(&self, path: impl AsRef<Path>) -> Result<GradeReport> {
        let path = path.as_ref();
        let image = open_image(path)?;
        self.grade_with_source(&image, Some(path.display().to_string()))
    }

    fn grade_with_source(&self, image: &DynamicImage, source: Option<String>) -> Result<GradeReport> {
        let rectification = self.rectifier.rectify(image);
        let reading = self.reader.read(&rectification.image)?;
        let report = GradeReport::new(source, &rectification, reading);
        info!(
            answered = report.letters.iter().filter(|l| !l.is_empty()).count(),
            questions = report.letters.len(),
            "Card graded"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use imageproc::drawing::draw_filled_rect_mut;
    use imageproc::rect::Rect;
    use scantron_core::config::{CardLayout, CropArea};

    /// A flat 600x700 card, already in the canonical frame, with a two-block
    /// answer bar at rows 300..380, cols 100..320 (11 columns of 20px, four
    /// rows of 20px).
    fn flat_card(filled: &[(i32, i32)]) -> DynamicImage {
        let mut card = RgbImage::from_pixel(600, 700, Rgb([255, 255, 255]));
        for &(column, option) in filled {
            let x = 100 + column * 20 + 4;
            let y = 300 + option * 20 + 4;
            draw_filled_rect_mut(&mut card, Rect::at(x, y).of_size(12, 12), Rgb([0, 0, 0]));
        }
        DynamicImage::ImageRgb8(card)
    }

    fn bar_grader() -> Grader {
        let layout = CardLayout::new(5, 4, 2)
            .unwrap()
            .with_area(CropArea::new(300, 380, 100, 320).unwrap())
            .unwrap();
        Grader::new(GraderConfig::new(layout)).unwrap()
    }

    /// Verify the full pipeline on a card that needs no perspective
    /// correction.
    #[test]
    fn grades_a_flat_two_block_card() {
        // Column 1 is question 2 of block one, column 8 is question 3 of
        // block two (column 5 is the gap).
        let report = bar_grader().grade(&flat_card(&[(1, 0), (8, 3)])).unwrap();

        assert_eq!(report.letters.len(), 10);
        assert_eq!(report.letters[1], "A");
        assert_eq!(report.letters[7], "D");
        assert_eq!(
            report.letters.iter().filter(|l| !l.is_empty()).count(),
            2,
            "{:?}",
            report.letters
        );
        assert_eq!(report.answers[7], vec![false, false, false, true]);
        assert_eq!(report.mark_count, 2);
        assert!(report.source.is_none());
    }

    #[test]
    fn grade_file_records_the_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.png");
        flat_card(&[(0, 1)]).save(&path).unwrap();

        let report = bar_grader().grade_file(&path).unwrap();
        assert_eq!(report.source.as_deref(), Some(path.display().to_string().as_str()));
        assert_eq!(report.letters[0], "B");
    }

    #[test]
    fn report_serializes_to_json() {
        let report = bar_grader().grade(&flat_card(&[(2, 2)])).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["letters"][2], "C");
        assert!(json.get("source").is_none());
        assert_eq!(json["answers"].as_array().map(Vec::len), Some(10));
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let mut config = GraderConfig::default();
        config.rectify.width = 0;
        assert!(Grader::new(config).is_err());
    }
}
