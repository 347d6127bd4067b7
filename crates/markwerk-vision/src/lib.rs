// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// markwerk-vision — Answer-table vision pipeline for Markwerk.
//
// Turns a page image into one answer per question: binarization, ruling-line
// extraction, table location, perspective rectification, separator search,
// cell slicing, and ink-density classification. Also provides page sources
// (image files, scanned PDFs) and a debug overlay renderer.

pub mod binarize;
pub mod cells;
pub mod classify;
pub mod geometry;
pub mod lines;
pub mod locate;
pub mod pipeline;
pub mod rectify;
pub mod render;
pub mod separators;
pub mod source;

// Re-export the primary entry points so callers can use `markwerk_vision::PageProcessor` etc.
pub use binarize::binarize;
pub use cells::{CellGrid, CellRect};
pub use geometry::Quad;
pub use lines::{LineMasks, extract_lines};
pub use locate::{TableRegion, locate_table};
pub use pipeline::{PageAnalysis, PageArtifacts, PageFailure, PageProcessor};
pub use render::render_overlay;
pub use separators::{locate_separators, validate_dimensions};
pub use source::{PageSource, open_pages};
