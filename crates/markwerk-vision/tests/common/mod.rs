// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Synthetic answer sheets for end-to-end pipeline tests.

#![allow(dead_code)]

use image::{DynamicImage, GrayImage, Luma};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::geometric_transformations::{Interpolation, Projection, warp};
use imageproc::rect::Rect;
use markwerk_core::{Axis, TableLayout, TableShape};

pub const PAGE_WIDTH: u32 = 320;
pub const PAGE_HEIGHT: u32 = 280;
pub const TABLE_X: u32 = 20;
pub const TABLE_Y: u32 = 20;
pub const TABLE_WIDTH: u32 = 240;
pub const TABLE_HEIGHT: u32 = 200;
pub const LINE_THICKNESS: u32 = 3;

const PAPER: u8 = 240;
const PEN: u8 = 20;

/// Offsets of `count` uniformly spaced lines across `extent`, the last one
/// pulled inside so the whole stroke fits.
pub fn line_offsets(extent: u32, count: usize) -> Vec<u32> {
    (0..count)
        .map(|i| {
            let pos = (i as u64 * extent as u64 / (count as u64 - 1)) as u32;
            pos.min(extent - LINE_THICKNESS)
        })
        .collect()
}

/// A ruled table on a light page.
pub struct Sheet {
    pub image: GrayImage,
    /// Horizontal line offsets relative to the table top.
    pub rows: Vec<u32>,
    /// Vertical line offsets relative to the table left edge.
    pub cols: Vec<u32>,
}

impl Sheet {
    /// A table with the given number of horizontal and vertical lines.
    pub fn ruled(horizontal_lines: usize, vertical_lines: usize) -> Self {
        let mut image = GrayImage::from_pixel(PAGE_WIDTH, PAGE_HEIGHT, Luma([PAPER]));
        let rows = line_offsets(TABLE_HEIGHT, horizontal_lines);
        let cols = line_offsets(TABLE_WIDTH, vertical_lines);

        for &y in &rows {
            let rect = Rect::at(TABLE_X as i32, (TABLE_Y + y) as i32)
                .of_size(TABLE_WIDTH, LINE_THICKNESS);
            draw_filled_rect_mut(&mut image, rect, Luma([PEN]));
        }
        for &x in &cols {
            let rect = Rect::at((TABLE_X + x) as i32, TABLE_Y as i32)
                .of_size(LINE_THICKNESS, TABLE_HEIGHT);
            draw_filled_rect_mut(&mut image, rect, Luma([PEN]));
        }
        Self { image, rows, cols }
    }

    /// A correctly ruled table for `shape`.
    pub fn for_shape(shape: &TableShape) -> Self {
        Self::ruled(
            shape.expected_separators(Axis::Horizontal),
            shape.expected_separators(Axis::Vertical),
        )
    }

    /// Hatch cell `[row][col]` with a fine checkerboard, like a pencil fill.
    ///
    /// The hatch stays two pixels clear of the ruling so the strokes do not
    /// merge with the lines.
    pub fn mark_cell(&mut self, row: usize, col: usize) {
        let top = TABLE_Y + self.rows[row] + LINE_THICKNESS + 2;
        let bottom = TABLE_Y + self.rows[row + 1] - 2;
        let left = TABLE_X + self.cols[col] + LINE_THICKNESS + 2;
        let right = TABLE_X + self.cols[col + 1] - 2;
        for y in top..bottom {
            for x in left..right {
                if ((x - left) / 2 + (y - top) / 2) % 2 == 0 {
                    self.image.put_pixel(x, y, Luma([PEN]));
                }
            }
        }
    }

    /// Mark option `option` of question `question`.
    pub fn mark_answer(&mut self, layout: TableLayout, question: usize, option: usize) {
        match layout {
            TableLayout::QuestionsAsColumns => self.mark_cell(option + 1, question + 1),
            TableLayout::QuestionsAsRows => self.mark_cell(question + 1, option + 1),
        }
    }

    pub fn into_page(self) -> DynamicImage {
        DynamicImage::ImageLuma8(self.image)
    }

    /// The page as photographed at a slight angle.
    pub fn into_skewed_page(self) -> DynamicImage {
        let w = (PAGE_WIDTH - 1) as f32;
        let h = (PAGE_HEIGHT - 1) as f32;
        let from = [(0.0, 0.0), (w, 0.0), (w, h), (0.0, h)];
        let to = [(8.0, 4.0), (w - 7.0, 12.0), (w - 3.0, h - 7.0), (4.0, h - 13.0)];
        let projection =
            Projection::from_control_points(from, to).expect("skew control points are valid");
        let skewed = warp(
            &self.image,
            &projection,
            Interpolation::Bilinear,
            Luma([PAPER]),
        );
        DynamicImage::ImageLuma8(skewed)
    }
}

/// A sheet for `shape` with the given `(question, option)` cells marked.
pub fn answer_sheet(shape: &TableShape, marks: &[(usize, usize)]) -> Sheet {
    let mut sheet = Sheet::for_shape(shape);
    for &(question, option) in marks {
        sheet.mark_answer(shape.layout, question, option);
    }
    sheet
}
