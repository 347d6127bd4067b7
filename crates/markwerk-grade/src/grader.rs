// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grader — runs the page pipeline over a batch of scanned sheets, scores
// each one, saves debug overlays, and writes the grade sheet.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};

use image::DynamicImage;
use markwerk_core::human_errors::{HumanError, Severity, explain};
use markwerk_core::{MarkwerkError, PageResult, Result, RunConfig, TableShape};
use markwerk_vision::{
    PageAnalysis, PageArtifacts, PageFailure, PageProcessor, open_pages, render_overlay,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::export::CsvExporter;
use crate::score::grade_answers;

/// Graded outcome for one page (one student).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub student_id: String,
    /// Where the page came from (file name, or `document.pdf#page`).
    pub page_label: String,
    pub question_scores: Vec<f64>,
    pub total_score: f64,
    pub has_extraction_issues: bool,
    pub has_ambiguous_answers: bool,
    pub error_message: Option<String>,
    pub result: PageResult,
    /// Operator guidance for a page that could not be read.
    #[serde(skip)]
    pub advice: Option<HumanError>,
}

impl StudentRecord {
    /// Issue tags joined with `"; "`, or `"OK"` when there are none.
    pub fn issues(&self) -> String {
        let mut flags: Vec<&str> = Vec::new();
        if self.has_extraction_issues {
            flags.push("extraction_issues");
        }
        if self.has_ambiguous_answers {
            flags.push("ambiguous_answers");
        }
        if let Some(message) = self.error_message.as_deref().filter(|m| !m.is_empty()) {
            flags.push(message);
        }
        if flags.is_empty() {
            "OK".to_string()
        } else {
            flags.join("; ")
        }
    }

    pub fn is_ok(&self) -> bool {
        !self.has_extraction_issues && !self.has_ambiguous_answers
    }
}

/// Results of a whole grading run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub records: Vec<StudentRecord>,
    pub csv_path: PathBuf,
}

impl RunSummary {
    pub fn flagged(&self) -> impl Iterator<Item = &StudentRecord> {
        self.records.iter().filter(|record| !record.is_ok())
    }
}

/// Grades batches of answer sheets under one run configuration.
pub struct Grader {
    config: RunConfig,
    shape: TableShape,
    processor: PageProcessor,
}

impl Grader {
    pub fn new(config: RunConfig) -> Result<Self> {
        config.validate()?;
        let shape = config.table_shape()?;
        let processor = PageProcessor::new(shape, config.detection)?;
        Ok(Self {
            config,
            shape,
            processor,
        })
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Grade every page of `input` and write the CSV grade sheet.
    ///
    /// Failures on individual pages are recorded in their rows; only an
    /// unreadable input or an unwritable output aborts the run.
    #[instrument(skip(self), fields(input = %input.as_ref().display()))]
    pub fn run(&self, input: impl AsRef<Path>) -> Result<RunSummary> {
        let pages = open_pages(input.as_ref())?;
        std::fs::create_dir_all(&self.config.output_dir)?;

        let records = self.grade_pages(pages);

        let csv_path = self.config.csv_path();
        CsvExporter::new(self.shape.num_questions).write_file(&csv_path, &records)?;
        info!(
            pages = records.len(),
            flagged = records.iter().filter(|r| !r.is_ok()).count(),
            path = %csv_path.display(),
            "Grade sheet written"
        );

        Ok(RunSummary { records, csv_path })
    }

    /// Grade pages in order; each page yields exactly one record.
    pub fn grade_pages<I>(&self, pages: I) -> Vec<StudentRecord>
    where
        I: IntoIterator<Item = (String, Result<DynamicImage>)>,
    {
        self.grade_pages_with(pages, |page| self.processor.analyze(page))
    }

    fn grade_pages_with<I, F>(&self, pages: I, analyze: F) -> Vec<StudentRecord>
    where
        I: IntoIterator<Item = (String, Result<DynamicImage>)>,
        F: Fn(&DynamicImage) -> std::result::Result<PageAnalysis, PageFailure>,
    {
        let debug_dir = self.prepare_debug_dir();
        pages
            .into_iter()
            .enumerate()
            .map(|(index, (label, page))| {
                let student_id = format!("student_{:03}", index + 1);
                info!(%student_id, page = %label, "Processing page");
                self.grade_page(student_id, label, page, debug_dir.as_deref(), &analyze)
            })
            .collect()
    }

    fn prepare_debug_dir(&self) -> Option<PathBuf> {
        if !self.config.debug_images {
            return None;
        }
        let dir = self.config.debug_dir();
        match std::fs::create_dir_all(&dir) {
            Ok(()) => Some(dir),
            Err(err) => {
                warn!(dir = %dir.display(), %err, "Cannot create debug directory; overlays disabled");
                None
            }
        }
    }

    fn grade_page<F>(
        &self,
        student_id: String,
        page_label: String,
        page: Result<DynamicImage>,
        debug_dir: Option<&Path>,
        analyze: &F,
    ) -> StudentRecord
    where
        F: Fn(&DynamicImage) -> std::result::Result<PageAnalysis, PageFailure>,
    {
        let page = match page {
            Ok(page) => page,
            Err(err) => {
                warn!(%student_id, %err, "Page could not be decoded");
                return failed_record(student_id, page_label, err.to_string(), explain(&err));
            }
        };

        let outcome = catch_unwind(AssertUnwindSafe(|| analyze(&page)));
        match outcome {
            Ok(Ok(analysis)) => {
                if let Some(dir) = debug_dir {
                    self.save_overlay(dir, &student_id, &analysis.artifacts, &analysis.result);
                }
                let sheet = grade_answers(
                    &analysis.result.answers,
                    &self.config.answer_key,
                    &self.config.grading,
                );
                debug!(%student_id, total = sheet.total, "Page graded");
                StudentRecord {
                    student_id,
                    page_label,
                    question_scores: sheet.question_scores,
                    total_score: sheet.total,
                    has_extraction_issues: false,
                    has_ambiguous_answers: analysis.result.has_ambiguous || sheet.has_issues,
                    error_message: None,
                    result: analysis.result,
                    advice: None,
                }
            }
            Ok(Err(failure)) => {
                warn!(%student_id, error = %failure.error, "Page extraction failed");
                if let (Some(dir), Some(artifacts)) = (debug_dir, failure.artifacts.as_deref()) {
                    self.save_overlay(dir, &student_id, artifacts, &PageResult::default());
                }
                let advice = explain(&failure.error);
                failed_record(student_id, page_label, failure.error.to_string(), advice)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(%student_id, %message, "Page processing panicked");
                let advice = HumanError {
                    message: "Processing this page failed unexpectedly.".into(),
                    suggestion: "Grade this sheet by hand and report the scan.".into(),
                    severity: Severity::Internal,
                };
                failed_record(
                    student_id,
                    page_label,
                    format!("internal error: {message}"),
                    advice,
                )
            }
        }
    }

    /// Render and save a debug overlay. Failures are logged and ignored.
    fn save_overlay(
        &self,
        dir: &Path,
        student_id: &str,
        artifacts: &PageArtifacts,
        result: &PageResult,
    ) {
        let overlay = render_overlay(
            &artifacts.rectified_color,
            &artifacts.horizontal,
            &artifacts.vertical,
            result,
            self.shape.layout,
        );
        let path = dir.join(format!("{student_id}_debug.png"));
        match overlay.save(&path) {
            Ok(()) => debug!(path = %path.display(), "Debug overlay saved"),
            Err(err) => warn!(
                path = %path.display(),
                error = %MarkwerkError::ImageError(err.to_string()),
                "Could not save debug overlay"
            ),
        }
    }
}

fn failed_record(
    student_id: String,
    page_label: String,
    message: String,
    advice: HumanError,
) -> StudentRecord {
    StudentRecord {
        student_id,
        page_label,
        question_scores: Vec::new(),
        total_score: 0.0,
        has_extraction_issues: true,
        has_ambiguous_answers: false,
        result: PageResult::failed(message.clone()),
        error_message: Some(message),
        advice: Some(advice),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use markwerk_core::Answer;

    fn config_in(dir: &Path) -> RunConfig {
        let mut config = RunConfig::new(vec![1, 0], 4);
        config.output_dir = dir.to_path_buf();
        config
    }

    fn blank_page() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(60, 40, Luma([240])))
    }

    /// 320x280 page with a 240x200 table ruled by 3 px lines.
    fn ruled_page(horizontal_lines: u32, vertical_lines: u32) -> DynamicImage {
        const LEFT: u32 = 20;
        const TOP: u32 = 20;
        const WIDTH: u32 = 240;
        const HEIGHT: u32 = 200;
        let offset = |extent: u32, count: u32, i: u32| (i * extent / (count - 1)).min(extent - 3);

        let mut img = GrayImage::from_pixel(320, 280, Luma([240]));
        for i in 0..horizontal_lines {
            let y = TOP + offset(HEIGHT, horizontal_lines, i);
            for t in 0..3 {
                for x in LEFT..LEFT + WIDTH {
                    img.put_pixel(x, y + t, Luma([20]));
                }
            }
        }
        for i in 0..vertical_lines {
            let x = LEFT + offset(WIDTH, vertical_lines, i);
            for t in 0..3 {
                for y in TOP..TOP + HEIGHT {
                    img.put_pixel(x + t, y, Luma([20]));
                }
            }
        }
        DynamicImage::ImageLuma8(img)
    }

    fn record(answers: Vec<Answer>) -> StudentRecord {
        StudentRecord {
            student_id: "student_001".into(),
            page_label: "a.png".into(),
            question_scores: Vec::new(),
            total_score: 0.0,
            has_extraction_issues: false,
            has_ambiguous_answers: false,
            error_message: None,
            result: PageResult::from_answers(answers),
            advice: None,
        }
    }

    #[test]
    fn issues_string_joins_flags_in_order() {
        let mut r = record(vec![]);
        assert_eq!(r.issues(), "OK");
        r.has_ambiguous_answers = true;
        assert_eq!(r.issues(), "ambiguous_answers");
        r.has_extraction_issues = true;
        r.error_message = Some("no table found".into());
        assert_eq!(
            r.issues(),
            "extraction_issues; ambiguous_answers; no table found"
        );
    }

    #[test]
    fn invalid_key_is_rejected_up_front() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.answer_key = vec![7];
        assert!(matches!(
            Grader::new(config),
            Err(MarkwerkError::InvalidConfig(_))
        ));
    }

    #[test]
    fn every_page_yields_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let grader = Grader::new(config_in(dir.path())).unwrap();
        let pages = vec![
            ("a.png".to_string(), Ok(blank_page())),
            (
                "b.png".to_string(),
                Err(MarkwerkError::ImageError("corrupt".into())),
            ),
            ("c.png".to_string(), Ok(blank_page())),
        ];
        let records = grader.grade_pages(pages);

        assert_eq!(records.len(), 3);
        let ids: Vec<&str> = records.iter().map(|r| r.student_id.as_str()).collect();
        assert_eq!(ids, vec!["student_001", "student_002", "student_003"]);
        assert!(records.iter().all(|r| r.has_extraction_issues));
        assert_eq!(records[1].error_message.as_deref(), Some("image processing failed: corrupt"));
        assert_eq!(records[0].total_score, 0.0);
        assert_eq!(
            records[0].advice.as_ref().map(|a| a.severity),
            Some(Severity::Rescan)
        );
        assert!(records[0].question_scores.is_empty());
    }

    #[test]
    fn run_writes_the_grade_sheet() {
        let out = tempfile::tempdir().unwrap();
        let input = tempfile::tempdir().unwrap();
        GrayImage::from_pixel(60, 40, Luma([240]))
            .save(input.path().join("page1.png"))
            .unwrap();

        let grader = Grader::new(config_in(out.path())).unwrap();
        let summary = grader.run(input.path()).unwrap();

        assert_eq!(summary.records.len(), 1);
        assert_eq!(summary.flagged().count(), 1);
        assert_eq!(summary.csv_path, out.path().join("grades.csv"));
        let text = std::fs::read_to_string(&summary.csv_path).unwrap();
        assert!(text.starts_with("student_id,question_1_score,question_2_score,total_score,issues"));
        assert!(out.path().join("debug_images").is_dir());
    }

    #[test]
    fn missing_input_aborts_the_run() {
        let out = tempfile::tempdir().unwrap();
        let grader = Grader::new(config_in(out.path())).unwrap();
        assert!(grader.run(out.path().join("missing.pdf")).is_err());
    }

    #[test]
    fn mismatched_ruling_still_gets_a_debug_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let grader = Grader::new(config_in(dir.path())).unwrap();
        // Two questions with four options need six horizontal and four
        // vertical lines; five horizontal lines are drawn.
        let records = grader.grade_pages(vec![("sheet.png".to_string(), Ok(ruled_page(5, 4)))]);

        assert_eq!(records.len(), 1);
        let message = records[0].error_message.as_deref().unwrap();
        assert!(message.starts_with("horizontal separators mismatch"), "{message}");
        assert!(records[0].has_extraction_issues);
        assert!(
            dir.path()
                .join("debug_images")
                .join("student_001_debug.png")
                .is_file()
        );
    }

    #[test]
    fn panicking_page_is_recorded_and_the_run_continues() {
        let dir = tempfile::tempdir().unwrap();
        let grader = Grader::new(config_in(dir.path())).unwrap();
        let pages = vec![
            ("a.png".to_string(), Ok(blank_page())),
            (
                "b.png".to_string(),
                Ok(DynamicImage::ImageLuma8(GrayImage::new(13, 13))),
            ),
            ("c.png".to_string(), Ok(blank_page())),
        ];
        let records = grader.grade_pages_with(pages, |page| {
            if page.width() == 13 {
                panic!("cell index out of range");
            }
            grader.processor.analyze(page)
        });

        assert_eq!(records.len(), 3);
        assert_eq!(
            records[1].error_message.as_deref(),
            Some("internal error: cell index out of range")
        );
        assert_eq!(
            records[1].advice.as_ref().map(|a| a.severity),
            Some(Severity::Internal)
        );
        assert_eq!(records[2].student_id, "student_003");
        assert_eq!(
            records[2].error_message.as_deref(),
            Some("no table found: grid mask contains no foreground region")
        );
    }

    #[test]
    fn panic_payloads_become_messages() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
        let payload: Box<dyn std::any::Any + Send> = Box::new(3u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
