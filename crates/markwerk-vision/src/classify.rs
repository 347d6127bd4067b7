// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mark classification — ink density per cell and per-question answer
// resolution.

use image::{GenericImageView, Luma};
use markwerk_core::{Answer, DetectionConfig, PageResult, TableShape};
use tracing::{debug, instrument};

use crate::cells::CellGrid;

/// Pixel values above this count as ink.
const INK_LEVEL: u8 = 128;

/// Fraction of pixels in `view` that are ink. An empty view has none.
pub fn ink_fraction<I>(view: &I) -> f64
where
    I: GenericImageView<Pixel = Luma<u8>>,
{
    let (width, height) = view.dimensions();
    let total = width as u64 * height as u64;
    if total == 0 {
        return 0.0;
    }
    let ink = view
        .pixels()
        .filter(|(_, _, pixel)| pixel.0[0] > INK_LEVEL)
        .count() as u64;
    ink as f64 / total as f64
}

/// Whether a cell counts as marked.
pub fn is_filled<I>(view: &I, threshold: f64) -> bool
where
    I: GenericImageView<Pixel = Luma<u8>>,
{
    let (width, height) = view.dimensions();
    width > 0 && height > 0 && ink_fraction(view) >= threshold
}

/// Classify every answer cell and resolve one answer per question.
#[instrument(skip_all, fields(questions = shape.num_questions, options = shape.num_answers))]
pub fn resolve_answers(
    grid: &CellGrid<'_>,
    shape: &TableShape,
    config: &DetectionConfig,
) -> PageResult {
    let answers: Vec<Answer> = (0..shape.num_questions)
        .map(|question| {
            let marks: Vec<bool> = grid
                .question_cells(question, shape.layout)
                .into_iter()
                .map(|cell| {
                    let pixels = grid.view(cell.trimmed(config.cell_margin_percent)).to_image();
                    is_filled(&pixels, config.ink_threshold)
                })
                .collect();
            let answer = Answer::from_marks(&marks);
            debug!(question, ?marks, ?answer, "Question resolved");
            answer
        })
        .collect();
    PageResult::from_answers(answers)
}
