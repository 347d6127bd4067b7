// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ruling-line extraction — directional morphological opening that keeps long
// horizontal and vertical strokes and drops marks and handwriting.

use image::{GrayImage, Luma};
use tracing::{debug, instrument};

use crate::binarize::INK;

/// Horizontal strokes, vertical strokes, and their union.
#[derive(Debug, Clone)]
pub struct LineMasks {
    pub horizontal: GrayImage,
    pub vertical: GrayImage,
    /// Pixel-wise union of `horizontal` and `vertical`.
    pub grid: GrayImage,
}

/// Length of the line structuring element for an image extent.
///
/// `extent * scale`, truncated, with a floor of 3 and rounded up to odd.
pub fn kernel_length(extent: u32, scale: f32) -> u32 {
    let length = ((extent as f32 * scale) as u32).max(3);
    if length % 2 == 0 { length + 1 } else { length }
}

/// Extract long horizontal and vertical strokes from a binary mask.
///
/// Kernel lengths scale with the mask width (horizontal) and height
/// (vertical). Only strokes at least as long as the kernel survive.
#[instrument(skip_all, fields(width = mask.width(), height = mask.height(), scale))]
pub fn extract_lines(mask: &GrayImage, scale: f32) -> LineMasks {
    let (width, height) = mask.dimensions();
    let h_kernel = kernel_length(width, scale);
    let v_kernel = kernel_length(height, scale);

    let horizontal = open_horizontal(mask, h_kernel);
    let vertical = open_vertical(mask, v_kernel);

    let mut grid = horizontal.clone();
    for (out, v) in grid.pixels_mut().zip(vertical.pixels()) {
        out.0[0] = out.0[0].max(v.0[0]);
    }

    debug!(h_kernel, v_kernel, "Line masks extracted");
    LineMasks {
        horizontal,
        vertical,
        grid,
    }
}

/// Opening with a `1 x kernel` line element.
///
/// Erosion followed by dilation with a flat segment keeps exactly the
/// foreground runs that are at least `kernel` pixels long, so the opening is
/// computed directly from run lengths.
pub fn open_horizontal(mask: &GrayImage, kernel: u32) -> GrayImage {
    let (width, height) = mask.dimensions();
    let mut output = GrayImage::new(width, height);
    for y in 0..height {
        keep_long_runs(width, kernel, |x| is_ink(mask, x, y), |x| {
            output.put_pixel(x, y, Luma([INK]));
        });
    }
    output
}

/// Opening with a `kernel x 1` line element; see [`open_horizontal`].
pub fn open_vertical(mask: &GrayImage, kernel: u32) -> GrayImage {
    let (width, height) = mask.dimensions();
    let mut output = GrayImage::new(width, height);
    for x in 0..width {
        keep_long_runs(height, kernel, |y| is_ink(mask, x, y), |y| {
            output.put_pixel(x, y, Luma([INK]));
        });
    }
    output
}

fn is_ink(mask: &GrayImage, x: u32, y: u32) -> bool {
    mask.get_pixel(x, y).0[0] > 127
}

/// Scan `0..len`, calling `keep` for every position inside a run of
/// foreground of length `>= min_run`.
fn keep_long_runs(
    len: u32,
    min_run: u32,
    is_foreground: impl Fn(u32) -> bool,
    mut keep: impl FnMut(u32),
) {
    let mut start = None;
    for pos in 0..=len {
        let fg = pos < len && is_foreground(pos);
        match (fg, start) {
            (true, None) => start = Some(pos),
            (false, Some(run_start)) => {
                if pos - run_start >= min_run {
                    (run_start..pos).for_each(&mut keep);
                }
                start = None;
            }
            _ => {}
        }
    }
}
