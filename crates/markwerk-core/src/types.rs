// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Markwerk answer-sheet grading.

use serde::{Deserialize, Serialize};

use crate::error::{MarkwerkError, Result};

/// Direction of a family of ruling lines.
///
/// `Horizontal` separators are horizontal lines, so their coordinates run
/// along the image's y axis; `Vertical` separators run along x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Horizontal => f.write_str("horizontal"),
            Self::Vertical => f.write_str("vertical"),
        }
    }
}

/// How questions and answer options are laid out in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableLayout {
    /// One column per question; answer options run down the rows.
    #[serde(rename = "columns=questions")]
    QuestionsAsColumns,
    /// One row per question; answer options run across the columns.
    #[serde(rename = "rows=questions")]
    QuestionsAsRows,
}

impl TableLayout {
    /// Keyword used in configuration files and on the command line.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::QuestionsAsColumns => "columns=questions",
            Self::QuestionsAsRows => "rows=questions",
        }
    }
}

impl std::fmt::Display for TableLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

impl std::str::FromStr for TableLayout {
    type Err = MarkwerkError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "columns=questions" | "columns" => Ok(Self::QuestionsAsColumns),
            "rows=questions" | "rows" => Ok(Self::QuestionsAsRows),
            other => Err(MarkwerkError::InvalidTableShape(format!(
                "unknown table layout '{other}' (expected columns=questions or rows=questions)"
            ))),
        }
    }
}

/// The externally declared logical size of the answer table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableShape {
    pub num_questions: usize,
    pub num_answers: usize,
    pub layout: TableLayout,
}

impl TableShape {
    pub fn new(num_questions: usize, num_answers: usize, layout: TableLayout) -> Result<Self> {
        let shape = Self {
            num_questions,
            num_answers,
            layout,
        };
        shape.validate()?;
        Ok(shape)
    }

    /// Reject shapes with no questions or no answer options.
    pub fn validate(&self) -> Result<()> {
        if self.num_questions == 0 {
            return Err(MarkwerkError::InvalidTableShape(
                "table must have at least one question".into(),
            ));
        }
        if self.num_answers == 0 {
            return Err(MarkwerkError::InvalidTableShape(
                "questions must have at least one answer option".into(),
            ));
        }
        Ok(())
    }

    /// Number of separators expected along `axis`.
    ///
    /// Each axis carries its logical count plus two: the outer borders
    /// bracket the header band and the logical cells.
    pub fn expected_separators(&self, axis: Axis) -> usize {
        let logical = match (self.layout, axis) {
            (TableLayout::QuestionsAsColumns, Axis::Horizontal) => self.num_answers,
            (TableLayout::QuestionsAsColumns, Axis::Vertical) => self.num_questions,
            (TableLayout::QuestionsAsRows, Axis::Horizontal) => self.num_questions,
            (TableLayout::QuestionsAsRows, Axis::Vertical) => self.num_answers,
        };
        logical + 2
    }
}

/// Resolved answer for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum Answer {
    /// No option was marked.
    Blank,
    /// Two or more options were marked.
    Ambiguous,
    /// Exactly one option was marked (0-based index).
    Choice(usize),
}

impl Answer {
    pub const BLANK_CODE: i32 = -1;
    pub const AMBIGUOUS_CODE: i32 = -2;

    /// Resolve one question from its per-option fill decisions.
    pub fn from_marks(marks: &[bool]) -> Self {
        let mut filled = marks
            .iter()
            .enumerate()
            .filter_map(|(index, &marked)| marked.then_some(index));
        match (filled.next(), filled.next()) {
            (None, _) => Self::Blank,
            (Some(index), None) => Self::Choice(index),
            (Some(_), Some(_)) => Self::Ambiguous,
        }
    }

    /// Signed integer code: -1 blank, -2 ambiguous, otherwise the option index.
    pub fn code(&self) -> i32 {
        match self {
            Self::Blank => Self::BLANK_CODE,
            Self::Ambiguous => Self::AMBIGUOUS_CODE,
            Self::Choice(index) => i32::try_from(*index).unwrap_or(i32::MAX),
        }
    }

    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            Self::BLANK_CODE => Ok(Self::Blank),
            Self::AMBIGUOUS_CODE => Ok(Self::Ambiguous),
            index if index >= 0 => Ok(Self::Choice(index as usize)),
            other => Err(MarkwerkError::InvalidConfig(format!(
                "invalid answer code {other}"
            ))),
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous)
    }
}

impl From<Answer> for i32 {
    fn from(answer: Answer) -> Self {
        answer.code()
    }
}

impl TryFrom<i32> for Answer {
    type Error = MarkwerkError;

    fn try_from(code: i32) -> Result<Self> {
        Self::from_code(code)
    }
}

/// Outcome of processing one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// One answer per question, in question order.
    pub answers: Vec<Answer>,
    /// Whether any question resolved to [`Answer::Ambiguous`].
    pub has_ambiguous: bool,
    /// Set when answers could not be extracted from the page.
    pub extraction_error: Option<String>,
}

impl PageResult {
    /// Build a result from resolved answers, deriving the ambiguity flag.
    pub fn from_answers(answers: Vec<Answer>) -> Self {
        let has_ambiguous = answers.iter().any(Answer::is_ambiguous);
        Self {
            answers,
            has_ambiguous,
            extraction_error: None,
        }
    }

    /// A page whose extraction failed with the given message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            answers: Vec::new(),
            has_ambiguous: false,
            extraction_error: Some(message.into()),
        }
    }

    pub fn has_extraction_issues(&self) -> bool {
        self.extraction_error.is_some()
    }

    /// Answers as signed integer codes.
    pub fn codes(&self) -> Vec<i32> {
        self.answers.iter().map(Answer::code).collect()
    }
}

/// Points awarded per question outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradingRule {
    pub correct: f64,
    pub incorrect: f64,
    pub no_answer: f64,
}

impl Default for GradingRule {
    fn default() -> Self {
        Self {
            correct: 1.0,
            incorrect: -0.25,
            no_answer: 0.0,
        }
    }
}
