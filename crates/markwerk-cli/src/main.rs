// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// markwerk — grade scanned multiple-choice answer tables from the command line.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use markwerk_core::human_errors::explain;
use markwerk_core::{MarkwerkError, PageResult, Result, RunConfig, TableLayout};
use markwerk_grade::{Grader, RunSummary};
use markwerk_vision::{PageArtifacts, PageProcessor, open_pages, render_overlay};

#[derive(Parser)]
#[command(name = "markwerk")]
#[command(about = "Grade hand-marked multiple-choice answer tables from scans")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade every page of a PDF, an image, or a directory of images.
    Grade(GradeArgs),

    /// Analyze one page and print the resolved answers as JSON.
    Inspect(InspectArgs),
}

/// Table shape and detection settings shared by all subcommands.
#[derive(Debug, Clone, Args)]
struct SheetArgs {
    /// Correct option per question, 0-based (e.g. `--answers 0 2 1 3`).
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    answers: Option<Vec<usize>>,

    /// Number of options per question.
    #[arg(long)]
    num_answers: Option<usize>,

    /// Table orientation: `columns=questions` or `rows=questions`.
    #[arg(long)]
    layout: Option<TableLayout>,

    /// Minimum ink fraction for a cell to count as marked.
    #[arg(long)]
    ink_threshold: Option<f64>,

    /// Percentage of each cell dimension trimmed from every side.
    #[arg(long)]
    margin_percent: Option<f64>,

    /// JSON run configuration; command-line options override its values.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct GradeArgs {
    /// PDF, image file, or directory of page images.
    input: PathBuf,

    #[command(flatten)]
    sheet: SheetArgs,

    /// Points for a correct answer.
    #[arg(long, allow_negative_numbers = true)]
    correct_points: Option<f64>,

    /// Points for an incorrect answer.
    #[arg(long, allow_negative_numbers = true)]
    incorrect_points: Option<f64>,

    /// Points for an unanswered question.
    #[arg(long, allow_negative_numbers = true)]
    no_answer_points: Option<f64>,

    /// Directory for the grade sheet and debug images.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// File name of the CSV grade sheet.
    #[arg(long)]
    output_file: Option<String>,

    /// Do not write annotated debug images.
    #[arg(long)]
    no_debug_images: bool,
}

#[derive(Debug, Clone, Args)]
struct InspectArgs {
    /// Page image (or PDF; its first page is used).
    image: PathBuf,

    #[command(flatten)]
    sheet: SheetArgs,

    /// Also write the annotated rectified table to this PNG.
    #[arg(long)]
    debug_image: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Grade(args) => grade(args),
        Commands::Inspect(args) => inspect(args),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "markwerk failed");
            let human = explain(&err);
            eprintln!("Error: {}", human.message);
            eprintln!("  {}", human.suggestion);
            ExitCode::FAILURE
        }
    }
}

/// Merge the JSON configuration (if any) with command-line overrides.
fn run_config(sheet: &SheetArgs) -> Result<RunConfig> {
    let mut config = match &sheet.config {
        Some(path) => RunConfig::load(path)?,
        None => {
            let answers = sheet.answers.clone().ok_or_else(|| {
                MarkwerkError::InvalidConfig("--answers is required without --config".into())
            })?;
            let num_answers = sheet.num_answers.ok_or_else(|| {
                MarkwerkError::InvalidConfig("--num-answers is required without --config".into())
            })?;
            RunConfig::new(answers, num_answers)
        }
    };

    if let Some(answers) = &sheet.answers {
        config.answer_key = answers.clone();
    }
    if let Some(num_answers) = sheet.num_answers {
        config.num_answers = num_answers;
    }
    if let Some(layout) = sheet.layout {
        config.layout = layout;
    }
    if let Some(threshold) = sheet.ink_threshold {
        config.detection.ink_threshold = threshold;
    }
    if let Some(margin) = sheet.margin_percent {
        config.detection.cell_margin_percent = margin;
    }
    Ok(config)
}

fn grade(args: GradeArgs) -> Result<()> {
    let mut config = run_config(&args.sheet)?;
    if let Some(points) = args.correct_points {
        config.grading.correct = points;
    }
    if let Some(points) = args.incorrect_points {
        config.grading.incorrect = points;
    }
    if let Some(points) = args.no_answer_points {
        config.grading.no_answer = points;
    }
    if let Some(dir) = args.output_dir {
        config.output_dir = dir;
    }
    if let Some(file) = args.output_file {
        config.output_file = file;
    }
    if args.no_debug_images {
        config.debug_images = false;
    }

    tracing::info!(
        questions = config.answer_key.len(),
        options = config.num_answers,
        layout = %config.layout,
        "Starting grading run"
    );
    let grader = Grader::new(config)?;
    let summary = grader.run(&args.input)?;
    print_summary(&summary, grader.config());
    Ok(())
}

fn print_summary(summary: &RunSummary, config: &RunConfig) {
    let flagged: Vec<_> = summary.flagged().collect();
    println!(
        "Graded {} page(s): {} OK, {} flagged",
        summary.records.len(),
        summary.records.len() - flagged.len(),
        flagged.len()
    );
    for record in flagged {
        println!(
            "  {} ({}): {}",
            record.student_id,
            record.page_label,
            record.issues()
        );
        if let Some(advice) = &record.advice {
            println!("      {} {}", advice.message, advice.suggestion);
        }
    }
    println!("Results saved to: {}", summary.csv_path.display());
    if config.debug_images {
        println!("Debug images saved to: {}", config.debug_dir().display());
    }
}

fn inspect(args: InspectArgs) -> Result<()> {
    let config = run_config(&args.sheet)?;
    config.validate()?;
    let processor = PageProcessor::new(config.table_shape()?, config.detection)?;

    let (label, page) = open_pages(&args.image)?.next().ok_or_else(|| {
        MarkwerkError::ImageError(format!("{} contains no pages", args.image.display()))
    })?;
    let page = page?;
    tracing::info!(page = %label, "Inspecting page");

    let result = match processor.analyze(&page) {
        Ok(analysis) => {
            if let Some(path) = &args.debug_image {
                save_overlay(path, &analysis.artifacts, &analysis.result, config.layout)?;
            }
            analysis.result
        }
        Err(failure) => {
            let human = explain(&failure.error);
            eprintln!("{} {}", human.message, human.suggestion);
            let result = PageResult::failed(failure.error.to_string());
            if let (Some(path), Some(artifacts)) = (&args.debug_image, failure.artifacts.as_deref())
            {
                save_overlay(path, artifacts, &result, config.layout)?;
            }
            result
        }
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn save_overlay(
    path: &Path,
    artifacts: &PageArtifacts,
    result: &PageResult,
    layout: TableLayout,
) -> Result<()> {
    render_overlay(
        &artifacts.rectified_color,
        &artifacts.horizontal,
        &artifacts.vertical,
        result,
        layout,
    )
    .save(path)
    .map_err(|err| MarkwerkError::ImageError(err.to_string()))?;
    tracing::debug!(path = %path.display(), "Debug overlay saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn grade_arguments_parse() {
        let cli = Cli::try_parse_from([
            "markwerk",
            "grade",
            "scans.pdf",
            "--answers",
            "0",
            "2",
            "1",
            "--num-answers",
            "4",
            "--layout",
            "rows=questions",
            "--incorrect-points",
            "-0.5",
            "--no-debug-images",
        ])
        .unwrap();
        let Commands::Grade(args) = cli.command else {
            panic!("expected grade subcommand");
        };
        assert_eq!(args.sheet.answers, Some(vec![0, 2, 1]));
        assert_eq!(args.sheet.layout, Some(TableLayout::QuestionsAsRows));
        assert_eq!(args.incorrect_points, Some(-0.5));
        assert!(args.no_debug_images);

        let config = run_config(&args.sheet).unwrap();
        assert_eq!(config.answer_key, vec![0, 2, 1]);
        assert_eq!(config.num_answers, 4);
        assert_eq!(config.layout, TableLayout::QuestionsAsRows);
    }

    #[test]
    fn inspect_renders_an_overlay_for_a_mismatched_table() {
        use image::{GrayImage, Luma};

        let dir = tempfile::tempdir().unwrap();
        // A 240x200 table with five horizontal lines; one question with four
        // options needs six.
        let mut page = GrayImage::from_pixel(320, 280, Luma([240u8]));
        for y in [0u32, 50, 100, 150, 197] {
            for t in 0..3 {
                for x in 20..260 {
                    page.put_pixel(x, 20 + y + t, Luma([20u8]));
                }
            }
        }
        for x in [0u32, 120, 237] {
            for t in 0..3 {
                for y in 20..220 {
                    page.put_pixel(20 + x + t, y, Luma([20u8]));
                }
            }
        }
        let image_path = dir.path().join("sheet.png");
        page.save(&image_path).unwrap();
        let overlay_path = dir.path().join("overlay.png");

        let args = InspectArgs {
            image: image_path,
            sheet: SheetArgs {
                answers: Some(vec![2]),
                num_answers: Some(4),
                layout: None,
                ink_threshold: None,
                margin_percent: None,
                config: None,
            },
            debug_image: Some(overlay_path.clone()),
        };
        inspect(args).unwrap();
        assert!(overlay_path.is_file());
    }

    #[test]
    fn answers_are_required_without_a_config_file() {
        let sheet = SheetArgs {
            answers: None,
            num_answers: Some(4),
            layout: None,
            ink_threshold: None,
            margin_percent: None,
            config: None,
        };
        assert!(matches!(
            run_config(&sheet),
            Err(MarkwerkError::InvalidConfig(_))
        ));
    }
}
