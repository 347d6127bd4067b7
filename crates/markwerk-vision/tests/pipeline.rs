// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end tests: synthetic answer sheets through the full page pipeline.

mod common;

use markwerk_core::{Answer, Axis, DetectionConfig, MarkwerkError, TableLayout, TableShape};
use markwerk_vision::{PageProcessor, render_overlay};

use common::{Sheet, answer_sheet};

fn single_question(layout: TableLayout) -> (TableShape, PageProcessor) {
    let shape = TableShape::new(1, 4, layout).unwrap();
    let processor = PageProcessor::new(shape, DetectionConfig::default()).unwrap();
    (shape, processor)
}

#[test]
fn one_marked_option_is_the_answer() {
    let (shape, processor) = single_question(TableLayout::QuestionsAsColumns);
    for option in 0..4 {
        let page = answer_sheet(&shape, &[(0, option)]).into_page();
        let analysis = processor.analyze(&page).unwrap();
        assert_eq!(analysis.result.answers, vec![Answer::Choice(option)]);
        assert!(!analysis.result.has_ambiguous);
        assert!(analysis.result.extraction_error.is_none());
    }
}

#[test]
fn two_marked_options_are_ambiguous() {
    let (shape, processor) = single_question(TableLayout::QuestionsAsColumns);
    let page = answer_sheet(&shape, &[(0, 0), (0, 2)]).into_page();
    let result = processor.process(&page);
    assert_eq!(result.codes(), vec![Answer::AMBIGUOUS_CODE]);
    assert!(result.has_ambiguous);
    assert!(result.extraction_error.is_none());
}

#[test]
fn unmarked_question_is_blank() {
    let (shape, processor) = single_question(TableLayout::QuestionsAsColumns);
    let page = answer_sheet(&shape, &[]).into_page();
    let result = processor.process(&page);
    assert_eq!(result.codes(), vec![Answer::BLANK_CODE]);
    assert!(!result.has_ambiguous);
}

#[test]
fn separators_match_the_ruling() {
    let (shape, processor) = single_question(TableLayout::QuestionsAsColumns);
    let sheet = answer_sheet(&shape, &[(0, 1)]);
    let (rows, cols) = (sheet.rows.clone(), sheet.cols.clone());
    let analysis = processor.analyze(&sheet.into_page()).unwrap();

    let artifacts = &analysis.artifacts;
    assert_eq!(
        artifacts.rectified_mask.dimensions(),
        (common::TABLE_WIDTH, common::TABLE_HEIGHT)
    );
    assert_eq!(artifacts.horizontal.len(), rows.len());
    assert_eq!(artifacts.vertical.len(), cols.len());
    for (found, truth) in artifacts.horizontal.iter().zip(&rows) {
        assert!(found.abs_diff(*truth) <= 2, "row {found} vs {truth}");
    }
    for (found, truth) in artifacts.vertical.iter().zip(&cols) {
        assert!(found.abs_diff(*truth) <= 2, "col {found} vs {truth}");
    }
}

#[test]
fn wrong_line_count_is_a_dimension_mismatch() {
    let (_, processor) = single_question(TableLayout::QuestionsAsColumns);
    // Four options need six horizontal lines; draw five.
    let page = Sheet::ruled(5, 3).into_page();

    let failure = processor.analyze(&page).unwrap_err();
    match &failure.error {
        MarkwerkError::DimensionMismatch {
            axis,
            found,
            expected,
        } => {
            assert_eq!(*axis, Axis::Horizontal);
            assert_eq!(*expected, 6);
            assert_ne!(*found, 6);
        }
        other => panic!("expected a dimension mismatch, got {other:?}"),
    }
    // The rectified page is still available for a debug render.
    assert!(failure.artifacts.is_some());

    let result = processor.process(&page);
    assert!(result.answers.is_empty());
    let message = result.extraction_error.unwrap();
    assert!(message.starts_with("horizontal separators mismatch: found"));
    assert!(message.ends_with("expected 6"));
}

#[test]
fn extra_ruled_line_is_a_dimension_mismatch() {
    let (_, processor) = single_question(TableLayout::QuestionsAsColumns);
    // Four options need six horizontal lines; draw seven and mark a cell
    // that only exists because of the extra line.
    let mut sheet = Sheet::ruled(7, 3);
    sheet.mark_cell(5, 1);
    let page = sheet.into_page();

    let failure = processor.analyze(&page).unwrap_err();
    assert!(
        matches!(
            failure.error,
            MarkwerkError::DimensionMismatch {
                axis: Axis::Horizontal,
                found: 7,
                expected: 6,
            }
        ),
        "{:?}",
        failure.error
    );
    assert!(failure.artifacts.is_some());

    let result = processor.process(&page);
    assert!(result.answers.is_empty());
    assert_eq!(
        result.extraction_error.as_deref(),
        Some("horizontal separators mismatch: found 7, expected 6")
    );
}

#[test]
fn skewed_photo_is_rectified() {
    let (shape, processor) = single_question(TableLayout::QuestionsAsColumns);
    let page = answer_sheet(&shape, &[(0, 3)]).into_skewed_page();
    let result = processor.process(&page);
    assert_eq!(result.answers, vec![Answer::Choice(3)], "{result:?}");
}

#[test]
fn questions_as_rows_reads_across() {
    let (shape, processor) = single_question(TableLayout::QuestionsAsRows);
    let page = answer_sheet(&shape, &[(0, 2)]).into_page();
    let analysis = processor.analyze(&page).unwrap();
    assert_eq!(analysis.artifacts.horizontal.len(), 3);
    assert_eq!(analysis.artifacts.vertical.len(), 6);
    assert_eq!(analysis.result.answers, vec![Answer::Choice(2)]);
}

#[test]
fn several_questions_resolve_independently() {
    let shape = TableShape::new(3, 3, TableLayout::QuestionsAsColumns).unwrap();
    let processor = PageProcessor::new(shape, DetectionConfig::default()).unwrap();
    let page = answer_sheet(&shape, &[(0, 2), (2, 0), (2, 1)]).into_page();
    let result = processor.process(&page);
    assert_eq!(
        result.answers,
        vec![Answer::Choice(2), Answer::Blank, Answer::Ambiguous]
    );
    assert!(result.has_ambiguous);
}

#[test]
fn overlay_keeps_the_rectified_size() {
    let (shape, processor) = single_question(TableLayout::QuestionsAsColumns);
    let page = answer_sheet(&shape, &[(0, 0)]).into_page();
    let analysis = processor.analyze(&page).unwrap();
    let artifacts = &analysis.artifacts;
    let overlay = render_overlay(
        &artifacts.rectified_color,
        &artifacts.horizontal,
        &artifacts.vertical,
        &analysis.result,
        shape.layout,
    );
    assert_eq!(overlay.dimensions(), artifacts.rectified_color.dimensions());
    assert_ne!(overlay, artifacts.rectified_color);
}
