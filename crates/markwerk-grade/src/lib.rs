// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// markwerk-grade — Scoring and reporting for Markwerk.
//
// Scores resolved answers against an answer key, runs the page loop for a
// whole batch (one student per page), and exports the grade sheet as CSV.

pub mod export;
pub mod grader;
pub mod score;

pub use export::CsvExporter;
pub use grader::{Grader, RunSummary, StudentRecord};
pub use score::{ScoreSheet, grade_answers};
