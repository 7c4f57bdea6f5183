// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the people running a grading session
// (teachers, exam office staff).
//
// Every technical error is mapped to plain English with a clear suggestion.
// The severity drives whether a batch run retries, skips or aborts.

use crate::error::GradeError;

/// Severity of an error from the operator's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The sheet photo itself is the problem; retake or rescan it.
    Rescan,
    /// The operator must fix the configuration or the command line.
    ActionRequired,
    /// Cannot be fixed by retrying: unreadable file or internal fault.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the operator should try.
    pub suggestion: String,
    /// Whether grading the rest of a batch makes sense.
    pub skip_and_continue: bool,
    /// Severity level.
    pub severity: Severity,
}

/// Convert a `GradeError` into a `HumanError` an exam office can act on.
pub fn humanize_error(err: &GradeError) -> HumanError {
    match err {
        // -- Decoding --
        GradeError::MissingRegionBoundary { .. } => HumanError {
            message: "We couldn't find the answer area on this sheet.".into(),
            suggestion: "Retake the photo with the whole sheet flat and in view, or check that the crop area in the configuration covers the answer box.".into(),
            skip_and_continue: true,
            severity: Severity::Rescan,
        },

        GradeError::InvalidArea { area, width, height } => HumanError {
            message: "The configured answer area is outside the sheet.".into(),
            suggestion: format!(
                "The crop area {area} does not fit a {width}x{height} card. Adjust the area rows and columns in the configuration."
            ),
            skip_and_continue: false,
            severity: Severity::ActionRequired,
        },

        GradeError::InvalidInput(_) => HumanError {
            message: "The grader received inconsistent shape data.".into(),
            suggestion: "Try again. If this keeps happening, please report it with the sheet image.".into(),
            skip_and_continue: true,
            severity: Severity::Permanent,
        },

        // -- Configuration --
        GradeError::InvalidLayout(detail) | GradeError::InvalidConfig(detail) => HumanError {
            message: "The grading configuration isn't valid.".into(),
            suggestion: format!("Fix the configuration file and run again. ({detail})"),
            skip_and_continue: false,
            severity: Severity::ActionRequired,
        },

        // -- Image handling --
        GradeError::ImageError(_) => HumanError {
            message: "There's a problem with this image.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try saving it as a JPEG or PNG first.".into(),
            skip_and_continue: true,
            severity: Severity::Rescan,
        },

        // -- Storage --
        GradeError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "Check the path for typos; the file may have been moved or deleted.".into(),
                    skip_and_continue: true,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "The grader doesn't have permission to access that file.".into(),
                    suggestion: "Check the file permissions, or copy the file to a different location first.".into(),
                    skip_and_continue: true,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, the disk may be full.".into(),
                    skip_and_continue: true,
                    severity: Severity::Permanent,
                }
            }
        }

        GradeError::Serialization(_) => HumanError {
            message: "The configuration or report file isn't valid JSON.".into(),
            suggestion: "Check the file for missing commas or brackets, or regenerate it with `scantron config`.".into(),
            skip_and_continue: false,
            severity: Severity::ActionRequired,
        },
    }
}
