// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scoring — per-question points for resolved answers under a grading rule.

use markwerk_core::{Answer, GradingRule};
use serde::{Deserialize, Serialize};

/// Points for one student.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSheet {
    /// Points per question, in question order.
    pub question_scores: Vec<f64>,
    pub total: f64,
    /// Set when an ambiguous answer was scored as zero.
    pub has_issues: bool,
}

/// Score `answers` against `key`.
///
/// Blank answers earn `no_answer`, matching choices `correct`, other
/// choices `incorrect`. Ambiguous answers earn nothing and flag the sheet.
/// Answers and key are paired up to the shorter of the two.
pub fn grade_answers(answers: &[Answer], key: &[usize], rule: &GradingRule) -> ScoreSheet {
    let mut has_issues = false;
    let question_scores: Vec<f64> = answers
        .iter()
        .zip(key)
        .map(|(answer, &correct)| match answer {
            Answer::Blank => rule.no_answer,
            Answer::Ambiguous => {
                has_issues = true;
                0.0
            }
            Answer::Choice(index) if *index == correct => rule.correct,
            Answer::Choice(_) => rule.incorrect,
        })
        .collect();
    let total = question_scores.iter().sum();
    ScoreSheet {
        question_scores,
        total,
        has_issues,
    }
}
