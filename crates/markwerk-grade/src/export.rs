// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CSV export — one row per student with per-question scores, total, and an
// issues column.

use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;
use markwerk_core::{MarkwerkError, Result};
use tracing::{debug, instrument};

use crate::grader::StudentRecord;

/// Writes grade sheets with a fixed number of question columns.
#[derive(Debug, Clone, Copy)]
pub struct CsvExporter {
    num_questions: usize,
}

impl CsvExporter {
    pub fn new(num_questions: usize) -> Self {
        Self { num_questions }
    }

    /// `student_id, question_1_score … question_N_score, total_score, issues`.
    pub fn header(&self) -> Vec<String> {
        let mut header = Vec::with_capacity(self.num_questions + 3);
        header.push("student_id".to_string());
        header.extend((1..=self.num_questions).map(|i| format!("question_{i}_score")));
        header.push("total_score".to_string());
        header.push("issues".to_string());
        header
    }

    /// One CSV row. Questions without a score are left empty.
    pub fn row(&self, record: &StudentRecord) -> Vec<String> {
        let mut row = Vec::with_capacity(self.num_questions + 3);
        row.push(record.student_id.clone());
        row.extend((0..self.num_questions).map(|i| {
            record
                .question_scores
                .get(i)
                .map(|score| format_score(*score))
                .unwrap_or_default()
        }));
        row.push(format_score(record.total_score));
        row.push(record.issues());
        row
    }

    pub fn write<W: Write>(&self, writer: W, records: &[StudentRecord]) -> Result<()> {
        let mut csv_writer = WriterBuilder::new().from_writer(writer);
        csv_writer.write_record(self.header()).map_err(export_error)?;
        for record in records {
            csv_writer.write_record(self.row(record)).map_err(export_error)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    #[instrument(skip(self, records), fields(path = %path.as_ref().display(), rows = records.len()))]
    pub fn write_file(&self, path: impl AsRef<Path>, records: &[StudentRecord]) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        self.write(file, records)?;
        debug!("CSV written");
        Ok(())
    }

    pub fn to_csv_string(&self, records: &[StudentRecord]) -> Result<String> {
        let mut buffer = Vec::new();
        self.write(&mut buffer, records)?;
        String::from_utf8(buffer)
            .map_err(|err| MarkwerkError::Export(format!("invalid utf-8 csv output: {err}")))
    }
}

fn export_error(err: csv::Error) -> MarkwerkError {
    MarkwerkError::Export(err.to_string())
}

/// Scores keep a decimal point so whole numbers read as points, not counts.
fn format_score(score: f64) -> String {
    format!("{score:?}")
}
