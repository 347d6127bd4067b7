// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Binarization — edge-preserving smoothing followed by a local-mean adaptive
// threshold. The output is inverted: ink is 255, paper and shadow are 0.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::filter::bilateral_filter;
use markwerk_core::BinarizeConfig;
use tracing::{debug, instrument};

/// Foreground value in every binary mask produced by this crate.
pub const INK: u8 = 255;

/// Convert a page image into an illumination-invariant ink mask.
///
/// 1. Convert to 8-bit luma
/// 2. Bilateral filter (suppresses sensor noise, keeps stroke edges sharp)
/// 3. Adaptive threshold against the local box mean
///
/// A pixel is ink when it is at least `offset` levels darker than the mean
/// of its `(2 * block_radius + 1)²` neighbourhood, so a gradual lighting
/// gradient across the page shifts the threshold with it.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn binarize(image: &DynamicImage, config: &BinarizeConfig) -> GrayImage {
    let gray = image.to_luma8();
    let smoothed = if config.smoothing_radius > 0 && gray.width() > 0 && gray.height() > 0 {
        bilateral_filter(
            &gray,
            2 * config.smoothing_radius + 1,
            config.sigma_color,
            config.sigma_space,
        )
    } else {
        gray
    };
    let mask = adaptive_threshold_inv(&smoothed, config.block_radius, config.offset);
    debug!("Binarization complete");
    mask
}

/// Inverted adaptive threshold: ink (dark relative to its surroundings)
/// becomes [`INK`], everything else 0.
pub fn adaptive_threshold_inv(gray: &GrayImage, block_radius: u32, offset: f64) -> GrayImage {
    let (width, height) = gray.dimensions();
    let integral = compute_integral_image(gray);
    let mut output = GrayImage::new(width, height);

    for y in 0..height {
        for x in 0..width {
            let local_mean = region_mean(&integral, width, height, x, y, block_radius);
            let value = gray.get_pixel(x, y).0[0] as f64;
            if value <= local_mean - offset {
                output.put_pixel(x, y, Luma([INK]));
            }
        }
    }
    output
}

// -- Integral image helpers ---------------------------------------------------

/// Compute the integral (summed-area table) of a grayscale image.
///
/// `integral[y * (width+1) + x]` contains the sum of all pixel values in the
/// rectangle [0, 0) to (x, y) (exclusive on both axes). The table has
/// dimensions `(width+1) x (height+1)` with a zero-padded border.
fn compute_integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];

    for y in 0..h {
        let mut row_sum: u64 = 0;
        for x in 0..w {
            row_sum += gray.get_pixel(x, y).0[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            let above = y as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[above];
        }
    }

    table
}

/// Mean pixel value of the square of the given radius centred on (cx, cy),
/// clamped to the image.
fn region_mean(
    integral: &[u64],
    img_width: u32,
    img_height: u32,
    cx: u32,
    cy: u32,
    radius: u32,
) -> f64 {
    let stride = (img_width + 1) as usize;

    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = (cx.saturating_add(radius).saturating_add(1) as usize).min(img_width as usize);
    let y2 = (cy.saturating_add(radius).saturating_add(1) as usize).min(img_height as usize);

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    if area == 0.0 {
        return 128.0;
    }

    // S = I[y2][x2] - I[y1][x2] - I[y2][x1] + I[y1][x1]
    let sum = integral[y2 * stride + x2] as f64
        - integral[y1 * stride + x2] as f64
        - integral[y2 * stride + x1] as f64
        + integral[y1 * stride + x1] as f64;

    sum / area
}
