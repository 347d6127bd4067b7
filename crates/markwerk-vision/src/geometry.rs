// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quadrilateral corner ordering and small planar helpers.

use serde::{Deserialize, Serialize};

/// A 2-D point in image coordinates (x right, y down).
pub type Point2 = (f32, f32);

/// Four table corners in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad {
    pub top_left: Point2,
    pub top_right: Point2,
    pub bottom_right: Point2,
    pub bottom_left: Point2,
}

impl Quad {
    /// Order four points by coordinate sums and differences.
    ///
    /// Smallest `x + y` is top-left, largest is bottom-right; smallest
    /// `y - x` is top-right, largest is bottom-left. The result does not
    /// depend on the order of `points`; ties resolve to the lexicographically
    /// smallest point so permutations of the same set agree.
    pub fn from_points(points: [Point2; 4]) -> Self {
        let mut sorted = points;
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let by = |key: fn(&Point2) -> f32, largest: bool| -> Point2 {
            let mut best = sorted[0];
            for candidate in &sorted[1..] {
                let better = if largest {
                    key(candidate) > key(&best)
                } else {
                    key(candidate) < key(&best)
                };
                if better {
                    best = *candidate;
                }
            }
            best
        };

        Self {
            top_left: by(|p| p.0 + p.1, false),
            top_right: by(|p| p.1 - p.0, false),
            bottom_right: by(|p| p.0 + p.1, true),
            bottom_left: by(|p| p.1 - p.0, true),
        }
    }

    /// Corners in canonical order: top-left, top-right, bottom-right, bottom-left.
    pub fn corners(&self) -> [Point2; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Length of the longer of the top and bottom edges.
    pub fn max_width(&self) -> f32 {
        distance(self.top_left, self.top_right).max(distance(self.bottom_left, self.bottom_right))
    }

    /// Length of the longer of the left and right edges.
    pub fn max_height(&self) -> f32 {
        distance(self.top_left, self.bottom_left).max(distance(self.top_right, self.bottom_right))
    }

    /// Enclosed area (shoelace formula).
    pub fn area(&self) -> f32 {
        shoelace_area(&self.corners())
    }
}

pub fn distance(a: Point2, b: Point2) -> f32 {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

/// Area of a simple polygon given by its vertices in order (CW or CCW).
pub fn shoelace_area(points: &[Point2]) -> f32 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0f32;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].0 * points[j].1;
        area -= points[j].0 * points[i].1;
    }
    area.abs() / 2.0
}
