// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Markwerk.

use thiserror::Error;

use crate::types::Axis;

/// Top-level error type for all Markwerk operations.
#[derive(Debug, Error)]
pub enum MarkwerkError {
    // -- Detection errors (page-scoped) --
    #[error("no table found: grid mask contains no foreground region")]
    NoTableFound,

    #[error("table corners are degenerate; no perspective transform exists")]
    DegenerateQuad,

    #[error("no peaks found in signal; grid mask may be empty")]
    NoPeaksFound,

    #[error("{axis} separators mismatch: found {found}, expected {expected}")]
    DimensionMismatch {
        axis: Axis,
        found: usize,
        expected: usize,
    },

    // -- Configuration --
    #[error("invalid table shape: {0}")]
    InvalidTableShape(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Document errors --
    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    // -- Output --
    #[error("export failed: {0}")]
    Export(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MarkwerkError>;
