// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Separator search — collapses a rectified grid mask into a 1-D profile per
// axis and finds the ruling lines in it, plus the dimension gate that checks
// the result against the declared table shape.

use image::GrayImage;
use markwerk_core::{Axis, DetectionConfig, MarkwerkError, Result, TableShape};
use tracing::{debug, instrument, warn};

/// Search window half-width as a fraction of the expected spacing.
const WINDOW_FRACTION: f64 = 0.4;

/// Sum of mask intensity per row (`Horizontal`) or per column (`Vertical`),
/// normalized by its maximum. An empty profile stays all zero.
pub fn projection_profile(mask: &GrayImage, axis: Axis) -> Vec<f64> {
    let (width, height) = mask.dimensions();
    let mut profile = match axis {
        Axis::Horizontal => vec![0f64; height as usize],
        Axis::Vertical => vec![0f64; width as usize],
    };
    for (x, y, pixel) in mask.enumerate_pixels() {
        let slot = match axis {
            Axis::Horizontal => y as usize,
            Axis::Vertical => x as usize,
        };
        profile[slot] += pixel.0[0] as f64;
    }

    let max = profile.iter().copied().fold(0.0, f64::max);
    if max > 0.0 {
        profile.iter_mut().for_each(|v| *v /= max);
    }
    profile
}

/// Locate separator coordinates along `axis`.
///
/// With a table shape, separators are searched near uniformly spaced
/// expected positions. When the profile holds more ruled lines than the
/// shape allows, the windows would each still catch one of them, so the
/// full set of detected lines is returned instead and the dimension gate
/// sees the real count. Without a shape, a generic threshold-and-merge peak
/// detector is used. The returned list is sorted ascending.
#[instrument(skip(mask, config), fields(width = mask.width(), height = mask.height()))]
pub fn locate_separators(
    mask: &GrayImage,
    axis: Axis,
    shape: Option<&TableShape>,
    config: &DetectionConfig,
) -> Result<Vec<u32>> {
    let profile = projection_profile(mask, axis);
    let mut separators = match shape {
        Some(shape) => {
            let expected = shape.expected_separators(axis);
            let windowed = uniform_separators(&profile, expected, config.min_separator_strength);
            let ruled = peak_separators(
                &profile,
                config.min_separator_strength,
                config.peak_merge_gap,
            )
            .unwrap_or_default();
            if ruled.len() > expected {
                warn!(
                    %axis,
                    ruled = ruled.len(),
                    expected,
                    "More ruled lines than the table shape allows"
                );
                ruled
            } else {
                windowed
            }
        }
        None => peak_separators(&profile, config.peak_threshold, config.peak_merge_gap)?,
    };
    separators.sort_unstable();
    separators.dedup();
    debug!(%axis, count = separators.len(), "Separators located");
    Ok(separators)
}

/// Find `expected_count` separators assuming approximately uniform ruling.
///
/// For each expected position the strongest profile sample within
/// `±0.4 * spacing` is taken. Windows whose peak is weaker than
/// `min_strength` contain no ruled line and are dropped, so a table with
/// a missing line comes back short and fails the dimension gate.
pub fn uniform_separators(profile: &[f64], expected_count: usize, min_strength: f64) -> Vec<u32> {
    let size = profile.len();
    if expected_count < 2 || size == 0 {
        return Vec::new();
    }

    let spacing = size as f64 / (expected_count - 1) as f64;
    let half_window = (spacing * WINDOW_FRACTION) as i64;

    let mut separators = Vec::with_capacity(expected_count);
    for i in 0..expected_count {
        let expected_pos = i as f64 * spacing;
        let start = (expected_pos as i64 - half_window).max(0) as usize;
        let end = ((expected_pos as i64 + half_window).max(0) as usize).min(size);
        if start >= end {
            warn!(index = i, expected_pos, "Empty separator search window");
            continue;
        }

        let (offset, strength) = argmax(&profile[start..end]);
        if strength < min_strength || strength <= 0.0 {
            warn!(
                index = i,
                expected_pos,
                strength,
                "No ruled line near expected separator position"
            );
            continue;
        }
        separators.push((start + offset) as u32);
    }
    separators
}

/// Threshold the profile and merge nearby coordinates into single peaks.
///
/// Fails with [`MarkwerkError::NoPeaksFound`] when nothing exceeds the
/// threshold.
pub fn peak_separators(profile: &[f64], threshold: f64, merge_gap: usize) -> Result<Vec<u32>> {
    let above: Vec<usize> = profile
        .iter()
        .enumerate()
        .filter(|&(_, &v)| v > threshold)
        .map(|(i, _)| i)
        .collect();
    if above.is_empty() {
        return Err(MarkwerkError::NoPeaksFound);
    }
    Ok(merge_peaks(&above, merge_gap))
}

/// Merge runs of coordinates whose consecutive gap is at most `gap_threshold`
/// into their (truncated) centroid.
pub fn merge_peaks(peaks: &[usize], gap_threshold: usize) -> Vec<u32> {
    let mut separators = Vec::new();
    let mut cluster: Vec<usize> = Vec::new();

    for &peak in peaks {
        if cluster.last().is_some_and(|&last| peak - last > gap_threshold) {
            separators.push(centroid(&cluster));
            cluster.clear();
        }
        cluster.push(peak);
    }
    if !cluster.is_empty() {
        separators.push(centroid(&cluster));
    }
    separators
}

fn centroid(cluster: &[usize]) -> u32 {
    (cluster.iter().sum::<usize>() / cluster.len()) as u32
}

/// First index of the maximum value, with that value.
fn argmax(values: &[f64]) -> (usize, f64) {
    values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, v)| {
            if v > best.1 { (i, v) } else { best }
        })
}

/// Check detected separator counts against the declared table shape.
///
/// The horizontal axis is checked first. This is the only gate before cell
/// extraction; mismatched counts would make cell indexing meaningless.
pub fn validate_dimensions(
    horizontal: &[u32],
    vertical: &[u32],
    shape: &TableShape,
) -> Result<()> {
    for (axis, found) in [
        (Axis::Horizontal, horizontal.len()),
        (Axis::Vertical, vertical.len()),
    ] {
        let expected = shape.expected_separators(axis);
        if found != expected {
            return Err(MarkwerkError::DimensionMismatch {
                axis,
                found,
                expected,
            });
        }
    }
    Ok(())
}
