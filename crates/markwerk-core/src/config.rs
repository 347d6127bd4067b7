// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Run configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MarkwerkError, Result};
use crate::types::{GradingRule, TableLayout, TableShape};

/// Binarizer tuning: bilateral smoothing followed by a local-mean threshold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinarizeConfig {
    /// Bilateral filter radius (window is `2r + 1` pixels wide).
    pub smoothing_radius: u32,
    /// Bilateral range sigma, in intensity levels.
    pub sigma_color: f32,
    /// Bilateral spatial sigma, in pixels.
    pub sigma_space: f32,
    /// Radius of the local-mean neighbourhood for adaptive thresholding.
    pub block_radius: u32,
    /// Constant subtracted from the local mean before comparison.
    pub offset: f64,
}

impl Default for BinarizeConfig {
    fn default() -> Self {
        Self {
            smoothing_radius: 4,
            sigma_color: 75.0,
            sigma_space: 75.0,
            block_radius: 5,
            offset: 2.0,
        }
    }
}

/// Largest accepted smoothing or threshold neighbourhood radius, in pixels.
pub const MAX_BINARIZE_RADIUS: u32 = 1024;

impl BinarizeConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.sigma_color.is_finite() && self.sigma_color > 0.0)
            || !(self.sigma_space.is_finite() && self.sigma_space > 0.0)
        {
            return Err(MarkwerkError::InvalidConfig(format!(
                "bilateral sigmas must be positive, got color {} and space {}",
                self.sigma_color, self.sigma_space
            )));
        }
        if self.smoothing_radius > MAX_BINARIZE_RADIUS {
            return Err(MarkwerkError::InvalidConfig(format!(
                "smoothing_radius must be at most {MAX_BINARIZE_RADIUS}, got {}",
                self.smoothing_radius
            )));
        }
        if !(1..=MAX_BINARIZE_RADIUS).contains(&self.block_radius) {
            return Err(MarkwerkError::InvalidConfig(format!(
                "block_radius must be in [1, {MAX_BINARIZE_RADIUS}], got {}",
                self.block_radius
            )));
        }
        if !self.offset.is_finite() {
            return Err(MarkwerkError::InvalidConfig(format!(
                "offset must be finite, got {}",
                self.offset
            )));
        }
        Ok(())
    }
}

/// Tuning for table detection and mark classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub binarize: BinarizeConfig,
    /// Line kernel length as a fraction of the image width/height.
    pub line_scale: f32,
    /// Minimum normalized profile strength for a uniform-spacing window to
    /// count as a ruled line.
    pub min_separator_strength: f64,
    /// Threshold for the shape-less peak detector.
    pub peak_threshold: f64,
    /// Maximum gap (pixels) between above-threshold coordinates of one peak.
    pub peak_merge_gap: usize,
    /// Fraction of ink pixels at which a cell counts as marked.
    pub ink_threshold: f64,
    /// Percentage of each cell dimension trimmed from every side.
    pub cell_margin_percent: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            binarize: BinarizeConfig::default(),
            line_scale: 0.02,
            min_separator_strength: 0.3,
            peak_threshold: 0.3,
            peak_merge_gap: 5,
            ink_threshold: 0.15,
            cell_margin_percent: 20.0,
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<()> {
        self.binarize.validate()?;
        if !(self.line_scale > 0.0 && self.line_scale < 1.0) {
            return Err(MarkwerkError::InvalidConfig(format!(
                "line_scale must be in (0, 1), got {}",
                self.line_scale
            )));
        }
        if !(0.0..=1.0).contains(&self.ink_threshold) {
            return Err(MarkwerkError::InvalidConfig(format!(
                "ink_threshold must be in [0, 1], got {}",
                self.ink_threshold
            )));
        }
        if !(0.0..50.0).contains(&self.cell_margin_percent) {
            return Err(MarkwerkError::InvalidConfig(format!(
                "cell_margin_percent must be in [0, 50), got {}",
                self.cell_margin_percent
            )));
        }
        if !(0.0..=1.0).contains(&self.min_separator_strength)
            || !(0.0..1.0).contains(&self.peak_threshold)
        {
            return Err(MarkwerkError::InvalidConfig(
                "separator thresholds must lie within [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

/// Everything a grading run needs; supplied once and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Correct option index per question (0-based). Its length is the
    /// question count.
    pub answer_key: Vec<usize>,
    /// Options per question.
    pub num_answers: usize,
    #[serde(default = "default_layout")]
    pub layout: TableLayout,
    #[serde(default)]
    pub grading: GradingRule,
    #[serde(default)]
    pub detection: DetectionConfig,
    /// Directory receiving the CSV and debug images.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_output_file")]
    pub output_file: String,
    /// Write an annotated image per page under `output_dir/debug_images`.
    #[serde(default = "default_true")]
    pub debug_images: bool,
}

fn default_layout() -> TableLayout {
    TableLayout::QuestionsAsColumns
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./outputs")
}

fn default_output_file() -> String {
    "grades.csv".to_string()
}

fn default_true() -> bool {
    true
}

impl RunConfig {
    pub fn new(answer_key: Vec<usize>, num_answers: usize) -> Self {
        Self {
            answer_key,
            num_answers,
            layout: default_layout(),
            grading: GradingRule::default(),
            detection: DetectionConfig::default(),
            output_dir: default_output_dir(),
            output_file: default_output_file(),
            debug_images: true,
        }
    }

    /// Load and validate a JSON run configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn table_shape(&self) -> Result<TableShape> {
        TableShape::new(self.answer_key.len(), self.num_answers, self.layout)
    }

    pub fn validate(&self) -> Result<()> {
        self.table_shape()?;
        if let Some((question, &key)) = self
            .answer_key
            .iter()
            .enumerate()
            .find(|&(_, &key)| key >= self.num_answers)
        {
            return Err(MarkwerkError::InvalidConfig(format!(
                "answer key for question {} is {key}, but only {} options exist",
                question + 1,
                self.num_answers
            )));
        }
        if self.output_file.trim().is_empty() {
            return Err(MarkwerkError::InvalidConfig(
                "output_file must not be empty".into(),
            ));
        }
        self.detection.validate()
    }

    pub fn csv_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_file)
    }

    pub fn debug_dir(&self) -> PathBuf {
        self.output_dir.join("debug_images")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let detection = DetectionConfig::default();
        assert_eq!(detection.ink_threshold, 0.15);
        assert_eq!(detection.cell_margin_percent, 20.0);
        assert_eq!(detection.line_scale, 0.02);
        assert!(detection.validate().is_ok());
    }

    #[test]
    fn degenerate_binarize_settings_are_rejected() {
        for binarize in [
            BinarizeConfig {
                sigma_color: 0.0,
                ..Default::default()
            },
            BinarizeConfig {
                sigma_space: f32::NAN,
                ..Default::default()
            },
            BinarizeConfig {
                block_radius: 0,
                ..Default::default()
            },
            BinarizeConfig {
                block_radius: u32::MAX,
                ..Default::default()
            },
            BinarizeConfig {
                smoothing_radius: 5000,
                ..Default::default()
            },
        ] {
            let detection = DetectionConfig {
                binarize,
                ..Default::default()
            };
            assert!(
                matches!(detection.validate(), Err(MarkwerkError::InvalidConfig(_))),
                "{binarize:?}"
            );
        }
    }

    #[test]
    fn huge_block_radius_in_json_is_rejected_on_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"answer_key": [0], "num_answers": 2,
                "detection": {{"binarize": {{"block_radius": 4294967295}}}}}}"#
        )
        .unwrap();
        assert!(matches!(
            RunConfig::load(file.path()),
            Err(MarkwerkError::InvalidConfig(_))
        ));
    }

    #[test]
    fn key_out_of_range_is_rejected() {
        let config = RunConfig::new(vec![0, 4], 4);
        assert!(matches!(
            config.validate(),
            Err(MarkwerkError::InvalidConfig(_))
        ));
    }

    #[test]
    fn load_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"answer_key": [1, 0, 3], "num_answers": 4, "layout": "rows=questions",
                "detection": {{"ink_threshold": 0.2}}}}"#
        )
        .unwrap();

        let config = RunConfig::load(file.path()).unwrap();
        assert_eq!(config.layout, TableLayout::QuestionsAsRows);
        assert_eq!(config.detection.ink_threshold, 0.2);
        assert_eq!(config.detection.cell_margin_percent, 20.0);
        assert_eq!(config.grading, GradingRule::default());
        assert_eq!(config.table_shape().unwrap().num_questions, 3);
        assert!(config.debug_images);
    }
}
