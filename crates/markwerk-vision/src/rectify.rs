// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectification — maps the detected table quadrilateral onto an
// axis-aligned rectangle.

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use markwerk_core::{MarkwerkError, Result};
use tracing::{debug, instrument};

use crate::geometry::Quad;

/// Output size and homography for one quadrilateral.
///
/// Build once per page and apply it to every image that must stay
/// pixel-aligned (binary mask and color page).
#[derive(Debug, Clone, Copy)]
pub struct Rectifier {
    projection: Projection,
    width: u32,
    height: u32,
}

impl Rectifier {
    /// Compute the target rectangle and the homography onto it.
    ///
    /// The target is as wide as the longer of the top and bottom edges and
    /// as tall as the longer of the left and right edges. Corners land on
    /// the outermost pixel centres, so the table border stays inside.
    #[instrument(skip_all)]
    pub fn new(quad: &Quad) -> Result<Self> {
        if quad.area() < 1.0 {
            return Err(MarkwerkError::DegenerateQuad);
        }
        let width = (quad.max_width().round() as u32 + 1).max(1);
        let height = (quad.max_height().round() as u32 + 1).max(1);

        let right = (width - 1) as f32;
        let bottom = (height - 1) as f32;
        let dest: [(f32, f32); 4] = [
            (0.0, 0.0),      // top-left
            (right, 0.0),    // top-right
            (right, bottom), // bottom-right
            (0.0, bottom),   // bottom-left
        ];

        let projection = Projection::from_control_points(quad.corners(), dest)
            .ok_or(MarkwerkError::DegenerateQuad)?;

        debug!(width, height, "Rectification target computed");
        Ok(Self {
            projection,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Resample a binary mask. Nearest-neighbour keeps it binary.
    pub fn warp_mask(&self, mask: &GrayImage) -> GrayImage {
        let mut output = GrayImage::new(self.width, self.height);
        warp_into(
            mask,
            &self.projection,
            Interpolation::Nearest,
            Luma([0u8]),
            &mut output,
        );
        output
    }

    /// Resample the color page for inspection and debug rendering.
    pub fn warp_color(&self, image: &RgbImage) -> RgbImage {
        let mut output = RgbImage::new(self.width, self.height);
        warp_into(
            image,
            &self.projection,
            Interpolation::Bilinear,
            Rgb([255u8, 255, 255]),
            &mut output,
        );
        output
    }
}
