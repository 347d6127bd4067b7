// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Debug overlay — draws detected separators and resolved answers onto the
// rectified page so an operator can check a grading decision at a glance.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use markwerk_core::{Answer, PageResult, TableLayout};

const SEPARATOR_COLOR: Rgb<u8> = Rgb([128, 128, 128]);
const CHOICE_COLOR: Rgb<u8> = Rgb([76, 175, 80]);
const AMBIGUOUS_COLOR: Rgb<u8> = Rgb([244, 67, 54]);
const BOX_THICKNESS: u32 = 2;

/// Annotate a rectified page with separators and answers.
///
/// Marked cells of single answers get a green box; the whole answer band of
/// an ambiguous question gets a red box. Indices that fall outside the
/// separator grid are skipped.
pub fn render_overlay(
    rectified: &RgbImage,
    horizontal: &[u32],
    vertical: &[u32],
    result: &PageResult,
    layout: TableLayout,
) -> RgbImage {
    let mut canvas = rectified.clone();
    let (width, height) = canvas.dimensions();

    for &y in horizontal {
        let y = y as f32;
        draw_line_segment_mut(&mut canvas, (0.0, y), (width as f32, y), SEPARATOR_COLOR);
    }
    for &x in vertical {
        let x = x as f32;
        draw_line_segment_mut(&mut canvas, (x, 0.0), (x, height as f32), SEPARATOR_COLOR);
    }

    let mut rows = horizontal.to_vec();
    let mut cols = vertical.to_vec();
    rows.sort_unstable();
    cols.sort_unstable();

    for (question, answer) in result.answers.iter().enumerate() {
        let (span, color) = match answer {
            Answer::Blank => continue,
            Answer::Choice(option) => (answer_cell(&rows, &cols, question, *option, layout), CHOICE_COLOR),
            Answer::Ambiguous => (answer_band(&rows, &cols, question, layout), AMBIGUOUS_COLOR),
        };
        if let Some((x0, y0, x1, y1)) = span {
            draw_box(&mut canvas, x0, y0, x1, y1, color);
        }
    }
    canvas
}

/// Span `[lines[i], lines[j]]`, if both exist.
fn span(lines: &[u32], from: usize, to: usize) -> Option<(u32, u32)> {
    Some((*lines.get(from)?, *lines.get(to)?))
}

fn answer_cell(
    rows: &[u32],
    cols: &[u32],
    question: usize,
    option: usize,
    layout: TableLayout,
) -> Option<(u32, u32, u32, u32)> {
    let (row, col) = match layout {
        TableLayout::QuestionsAsColumns => (option + 1, question + 1),
        TableLayout::QuestionsAsRows => (question + 1, option + 1),
    };
    let (y0, y1) = span(rows, row, row + 1)?;
    let (x0, x1) = span(cols, col, col + 1)?;
    Some((x0, y0, x1, y1))
}

fn answer_band(
    rows: &[u32],
    cols: &[u32],
    question: usize,
    layout: TableLayout,
) -> Option<(u32, u32, u32, u32)> {
    let last_row = rows.len().checked_sub(1)?;
    let last_col = cols.len().checked_sub(1)?;
    match layout {
        TableLayout::QuestionsAsColumns => {
            let (x0, x1) = span(cols, question + 1, question + 2)?;
            let (y0, y1) = span(rows, 1, last_row)?;
            Some((x0, y0, x1, y1))
        }
        TableLayout::QuestionsAsRows => {
            let (y0, y1) = span(rows, question + 1, question + 2)?;
            let (x0, x1) = span(cols, 1, last_col)?;
            Some((x0, y0, x1, y1))
        }
    }
}

fn draw_box(canvas: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    let (width, height) = canvas.dimensions();
    let x0 = x0.min(width);
    let y0 = y0.min(height);
    let w = x1.min(width).saturating_sub(x0);
    let h = y1.min(height).saturating_sub(y0);

    for t in 0..BOX_THICKNESS {
        let inner_w = w.saturating_sub(2 * t);
        let inner_h = h.saturating_sub(2 * t);
        if inner_w > 0 && inner_h > 0 {
            let rect = Rect::at((x0 + t) as i32, (y0 + t) as i32).of_size(inner_w, inner_h);
            draw_hollow_rect_mut(canvas, rect, color);
        }
    }
}
