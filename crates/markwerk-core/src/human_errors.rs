// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Operator-facing explanations for grading failures.
//
// Every technical error is mapped to a plain message with a concrete next step
// (rescan, fix the configuration, check the file). The severity drives how the
// command-line summary groups failed pages.

use crate::error::MarkwerkError;

/// What the operator needs to do about an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The page itself is unreadable; rescanning usually fixes it.
    Rescan,
    /// The run configuration or input path must be corrected.
    ActionRequired,
    /// Nothing the operator can fix; report it.
    Internal,
}

/// A human-readable error with a plain message and an actionable suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumanError {
    pub message: String,
    pub suggestion: String,
    pub severity: Severity,
}

/// Convert a `MarkwerkError` into a `HumanError` someone grading a stack of
/// answer sheets can act on.
pub fn explain(err: &MarkwerkError) -> HumanError {
    match err {
        // -- Detection --
        MarkwerkError::NoTableFound => HumanError {
            message: "No answer table was found on this page.".into(),
            suggestion: "Check that the page was scanned right side up and that the table borders are visible.".into(),
            severity: Severity::Rescan,
        },

        MarkwerkError::DegenerateQuad => HumanError {
            message: "The answer table's corners could not be located.".into(),
            suggestion: "Rescan the page flat, with all four table corners inside the image.".into(),
            severity: Severity::Rescan,
        },

        MarkwerkError::NoPeaksFound => HumanError {
            message: "No ruling lines were detected in the table.".into(),
            suggestion: "Rescan with higher contrast; faint grid lines may have been lost.".into(),
            severity: Severity::Rescan,
        },

        MarkwerkError::DimensionMismatch {
            axis,
            found,
            expected,
        } => HumanError {
            message: format!("The table has {found} {axis} lines where {expected} were expected."),
            suggestion: "Check the question and option counts and the table layout, or rescan if lines are broken.".into(),
            severity: Severity::ActionRequired,
        },

        // -- Configuration --
        MarkwerkError::InvalidTableShape(detail) | MarkwerkError::InvalidConfig(detail) => {
            HumanError {
                message: "The grading configuration is not valid.".into(),
                suggestion: format!("Fix the configuration and run again. ({detail})"),
                severity: Severity::ActionRequired,
            }
        }

        // -- Documents --
        MarkwerkError::ImageError(_) => HumanError {
            message: "A page image could not be read.".into(),
            suggestion: "The image may be damaged or in an unusual format. Try saving it as PNG or JPEG.".into(),
            severity: Severity::Rescan,
        },

        MarkwerkError::PdfError(_) => HumanError {
            message: "A page could not be extracted from the PDF.".into(),
            suggestion: "Only scanned PDFs with one image per page are supported. Export the pages as images instead.".into(),
            severity: Severity::ActionRequired,
        },

        // -- Output --
        MarkwerkError::Export(_) => HumanError {
            message: "The results file could not be written.".into(),
            suggestion: "Check that the output directory exists and is writable.".into(),
            severity: Severity::ActionRequired,
        },

        MarkwerkError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "Check the input path and try again.".into(),
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "Permission was denied while reading or writing a file.".into(),
                    suggestion: "Check the file permissions of the input and output locations.".into(),
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, the disk may be full.".into(),
                    severity: Severity::Internal,
                }
            }
        }

        MarkwerkError::Serialization(_) => HumanError {
            message: "The configuration file is not valid JSON.".into(),
            suggestion: "Check the configuration file syntax.".into(),
            severity: Severity::ActionRequired,
        },
    }
}
