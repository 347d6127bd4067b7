// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Table location — the largest outer contour of the grid mask, its bounding
// box, and four corner points for rectification.

use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use markwerk_core::{MarkwerkError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::geometry::{Point2, Quad, shoelace_area};

/// Polygon approximation tolerance as a fraction of the contour perimeter.
const APPROX_PERIMETER_FRACTION: f64 = 0.02;

/// Axis-aligned bounding box with inclusive pixel extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    fn from_points(points: &[Point<i32>]) -> Option<Self> {
        let min_x = points.iter().map(|p| p.x).min()?;
        let max_x = points.iter().map(|p| p.x).max()?;
        let min_y = points.iter().map(|p| p.y).min()?;
        let max_y = points.iter().map(|p| p.y).max()?;
        Some(Self {
            x: min_x.max(0) as u32,
            y: min_y.max(0) as u32,
            width: (max_x - min_x + 1).max(1) as u32,
            height: (max_y - min_y + 1).max(1) as u32,
        })
    }

    /// Corners of the box (inclusive extent), top-left first, clockwise.
    pub fn corners(&self) -> [Point2; 4] {
        let left = self.x as f32;
        let top = self.y as f32;
        let right = (self.x + self.width - 1) as f32;
        let bottom = (self.y + self.height - 1) as f32;
        [(left, top), (right, top), (right, bottom), (left, bottom)]
    }
}

/// The detected table: its outer boundary and where its corners are.
#[derive(Debug, Clone)]
pub struct TableRegion {
    pub bounds: BoundingBox,
    pub contour: Vec<Point<i32>>,
    pub corners: Quad,
}

/// Find the table in a grid mask.
///
/// Selects the outermost contour with the greatest enclosed area, then
/// derives corners from a polygon approximation of it. When the
/// approximation does not have exactly four vertices the bounding-box
/// corners are used instead.
#[instrument(skip_all, fields(width = grid.width(), height = grid.height()))]
pub fn locate_table(grid: &GrayImage) -> Result<TableRegion> {
    let contours = find_contours::<i32>(grid);
    debug!(contour_count = contours.len(), "Contours traced");

    let (contour, area) = contours
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter(|c| !c.points.is_empty())
        .map(|c| {
            let area = contour_area(&c.points);
            (c.points, area)
        })
        .fold(None, |best: Option<(Vec<Point<i32>>, f32)>, candidate| match best {
            Some(current) if current.1 >= candidate.1 => Some(current),
            _ => Some(candidate),
        })
        .ok_or(MarkwerkError::NoTableFound)?;

    let bounds = BoundingBox::from_points(&contour).ok_or(MarkwerkError::NoTableFound)?;

    let corners = match approximate_closed_polygon(&contour) {
        Some(polygon) if polygon.len() == 4 => {
            let points = [
                to_point2(polygon[0]),
                to_point2(polygon[1]),
                to_point2(polygon[2]),
                to_point2(polygon[3]),
            ];
            Quad::from_points(points)
        }
        other => {
            warn!(
                vertices = other.map(|p| p.len()).unwrap_or(0),
                "Table outline is not a quadrilateral; using bounding box corners"
            );
            Quad::from_points(bounds.corners())
        }
    };

    debug!(
        x = bounds.x,
        y = bounds.y,
        width = bounds.width,
        height = bounds.height,
        area,
        top_left = ?corners.top_left,
        bottom_right = ?corners.bottom_right,
        "Table located"
    );

    Ok(TableRegion {
        bounds,
        contour,
        corners,
    })
}

fn to_point2(p: Point<i32>) -> Point2 {
    (p.x as f32, p.y as f32)
}

fn contour_area(points: &[Point<i32>]) -> f32 {
    let polygon: Vec<Point2> = points.iter().copied().map(to_point2).collect();
    shoelace_area(&polygon)
}

/// Douglas–Peucker approximation of a closed contour.
///
/// The contour is split at its first point and the point farthest from it;
/// each half is simplified as an open chain and the halves are rejoined.
/// Returns `None` for contours too small to approximate.
pub fn approximate_closed_polygon(contour: &[Point<i32>]) -> Option<Vec<Point<i32>>> {
    if contour.len() < 3 {
        return None;
    }
    let perimeter = arc_length(contour, true);
    let epsilon = APPROX_PERIMETER_FRACTION * perimeter;
    if epsilon <= 0.0 {
        return None;
    }

    let origin = contour[0];
    let (split, _) = contour
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let dx = (p.x - origin.x) as i64;
            let dy = (p.y - origin.y) as i64;
            (i, dx * dx + dy * dy)
        })
        .fold((0, 0i64), |best, candidate| {
            if candidate.1 > best.1 { candidate } else { best }
        });
    if split == 0 {
        return None;
    }

    let first_half = &contour[..=split];
    let mut second_half = contour[split..].to_vec();
    second_half.push(origin);

    let mut polygon = approximate_polygon_dp(first_half, epsilon, false);
    polygon.pop();
    let mut rest = approximate_polygon_dp(&second_half, epsilon, false);
    rest.pop();
    polygon.extend(rest);
    polygon.dedup();

    Some(polygon)
}
