// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cell slicing — turns separator coordinates into per-question answer cells
// over the rectified mask.

use image::{GenericImageView, GrayImage, SubImage};
use markwerk_core::TableLayout;
use serde::{Deserialize, Serialize};

/// Pixel rectangle of one cell (half-open extent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CellRect {
    /// Shrink each side inward by `floor(dimension * percent / 100)`.
    ///
    /// Cuts away the ruling lines that bleed into the cell. A margin that
    /// consumes the cell leaves a zero-area rectangle.
    pub fn trimmed(&self, margin_percent: f64) -> Self {
        let percent = margin_percent.max(0.0);
        let margin_x = (self.width as f64 * percent / 100.0) as u32;
        let margin_y = (self.height as f64 * percent / 100.0) as u32;
        Self {
            x: self.x + margin_x.min(self.width),
            y: self.y + margin_y.min(self.height),
            width: self.width.saturating_sub(2 * margin_x),
            height: self.height.saturating_sub(2 * margin_y),
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A rectified mask partitioned by sorted separator lists.
#[derive(Debug, Clone)]
pub struct CellGrid<'a> {
    image: &'a GrayImage,
    rows: Vec<u32>,
    cols: Vec<u32>,
}

impl<'a> CellGrid<'a> {
    pub fn new(image: &'a GrayImage, mut rows: Vec<u32>, mut cols: Vec<u32>) -> Self {
        rows.sort_unstable();
        cols.sort_unstable();
        Self { image, rows, cols }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }

    pub fn num_cols(&self) -> usize {
        self.cols.len().saturating_sub(1)
    }

    /// Cell `[row][col]`, clamped to the image. `None` when out of range.
    pub fn cell(&self, row: usize, col: usize) -> Option<CellRect> {
        let (width, height) = self.image.dimensions();
        let top = (*self.rows.get(row)?).min(height);
        let bottom = (*self.rows.get(row + 1)?).min(height);
        let left = (*self.cols.get(col)?).min(width);
        let right = (*self.cols.get(col + 1)?).min(width);
        Some(CellRect {
            x: left,
            y: top,
            width: right.saturating_sub(left),
            height: bottom.saturating_sub(top),
        })
    }

    /// Borrowed view of `rect`, clamped to the image.
    pub fn view(&self, rect: CellRect) -> SubImage<&'a GrayImage> {
        let (width, height) = self.image.dimensions();
        let x = rect.x.min(width);
        let y = rect.y.min(height);
        let w = rect.width.min(width - x);
        let h = rect.height.min(height - y);
        self.image.view(x, y, w, h)
    }

    /// Answer cells of question `question`, in option order.
    ///
    /// The first row and column are the header band and are skipped.
    /// Out-of-range questions yield no cells.
    pub fn question_cells(&self, question: usize, layout: TableLayout) -> Vec<CellRect> {
        match layout {
            TableLayout::QuestionsAsColumns => (1..self.num_rows())
                .filter_map(|row| self.cell(row, question + 1))
                .collect(),
            TableLayout::QuestionsAsRows => (1..self.num_cols())
                .filter_map(|col| self.cell(question + 1, col))
                .collect(),
        }
    }
}
