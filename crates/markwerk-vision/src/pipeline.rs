// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page pipeline — runs every detection stage on one page image and returns
// either the resolved answers or a tagged failure.

use image::{DynamicImage, GrayImage, RgbImage};
use markwerk_core::{Axis, DetectionConfig, MarkwerkError, PageResult, Result, TableShape};
use tracing::{debug, info, instrument, warn};

use crate::binarize::binarize;
use crate::cells::CellGrid;
use crate::classify::resolve_answers;
use crate::lines::extract_lines;
use crate::locate::locate_table;
use crate::rectify::Rectifier;
use crate::separators::{locate_separators, validate_dimensions};

/// Rectified images and separators kept for debug output.
#[derive(Debug, Clone)]
pub struct PageArtifacts {
    pub rectified_color: RgbImage,
    pub rectified_mask: GrayImage,
    /// Horizontal separator y-coordinates in the rectified image.
    pub horizontal: Vec<u32>,
    /// Vertical separator x-coordinates in the rectified image.
    pub vertical: Vec<u32>,
}

/// A successfully analyzed page.
#[derive(Debug, Clone)]
pub struct PageAnalysis {
    pub result: PageResult,
    pub artifacts: PageArtifacts,
}

/// A page that could not be resolved.
///
/// Artifacts are attached when the table was found and rectified but its
/// separators did not match the declared shape.
#[derive(Debug)]
pub struct PageFailure {
    pub error: MarkwerkError,
    pub artifacts: Option<Box<PageArtifacts>>,
}

impl From<MarkwerkError> for PageFailure {
    fn from(error: MarkwerkError) -> Self {
        Self {
            error,
            artifacts: None,
        }
    }
}

impl std::fmt::Display for PageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for PageFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Stateless per-page processor for one table shape.
#[derive(Debug, Clone)]
pub struct PageProcessor {
    shape: TableShape,
    config: DetectionConfig,
}

impl PageProcessor {
    pub fn new(shape: TableShape, config: DetectionConfig) -> Result<Self> {
        shape.validate()?;
        config.validate()?;
        Ok(Self { shape, config })
    }

    /// Run the full detection pipeline on one page.
    #[instrument(skip_all, fields(width = page.width(), height = page.height()))]
    pub fn analyze(&self, page: &DynamicImage) -> std::result::Result<PageAnalysis, PageFailure> {
        let scale = self.config.line_scale;

        let mask = binarize(page, &self.config.binarize);
        let page_lines = extract_lines(&mask, scale);
        let region = locate_table(&page_lines.grid)?;

        let rectifier = Rectifier::new(&region.corners)?;
        let rectified_mask = rectifier.warp_mask(&mask);
        let rectified_color = rectifier.warp_color(&page.to_rgb8());
        let rectified_lines = extract_lines(&rectified_mask, scale);

        let horizontal = locate_separators(
            &rectified_lines.grid,
            Axis::Horizontal,
            Some(&self.shape),
            &self.config,
        )?;
        let vertical = locate_separators(
            &rectified_lines.grid,
            Axis::Vertical,
            Some(&self.shape),
            &self.config,
        )?;
        debug!(?horizontal, ?vertical, "Separators found");

        let artifacts = PageArtifacts {
            rectified_color,
            rectified_mask,
            horizontal,
            vertical,
        };

        if let Err(error) =
            validate_dimensions(&artifacts.horizontal, &artifacts.vertical, &self.shape)
        {
            warn!(%error, "Table dimensions do not match");
            return Err(PageFailure {
                error,
                artifacts: Some(Box::new(artifacts)),
            });
        }

        let grid = CellGrid::new(
            &artifacts.rectified_mask,
            artifacts.horizontal.clone(),
            artifacts.vertical.clone(),
        );
        let result = resolve_answers(&grid, &self.shape, &self.config);

        info!(
            answers = ?result.codes(),
            ambiguous = result.has_ambiguous,
            "Page resolved"
        );
        Ok(PageAnalysis { result, artifacts })
    }

    /// Resolve a page, folding any failure into the result.
    pub fn process(&self, page: &DynamicImage) -> PageResult {
        match self.analyze(page) {
            Ok(analysis) => analysis.result,
            Err(failure) => PageResult::failed(failure.error.to_string()),
        }
    }
}
