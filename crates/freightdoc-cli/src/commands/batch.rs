//! Batch processing command for multiple contract files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use super::process::{process_file, OutputFormat, Report};
use super::{extension, load_config};

/// Process every contract PDF and workbook matching a glob.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching PDF and XLSX files
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Format of the per-document output files
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Write template grids for workbooks
    #[arg(long)]
    grid: bool,

    /// Write a summary.csv with one row per document
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Outcome of one document, as written to the summary.
struct ProcessResult {
    path: PathBuf,
    report: Option<Report>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| matches!(extension(p).as_str(), "pdf" | "xlsx" | "xlsm"))
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!("{} Found {} files to process", style("ℹ").blue(), files.len());

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let mut results = Vec::with_capacity(files.len());
    for path in files {
        let file_start = Instant::now();
        let result = process_file(&path, &config, args.grid);
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        match result {
            Ok(report) => results.push(ProcessResult {
                path,
                report: Some(report),
                error: None,
                processing_time_ms,
            }),
            Err(e) => {
                let error_msg = e.to_string();
                if !args.continue_on_error {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    overall_pb.abandon();
                    anyhow::bail!("Processing failed: {}", error_msg);
                }
                warn!("Failed to process {}: {}", path.display(), error_msg);
                results.push(ProcessResult {
                    path,
                    report: None,
                    error: Some(error_msg),
                    processing_time_ms,
                });
            }
        }

        overall_pb.inc(1);
    }

    overall_pb.finish_and_clear();

    if let Some(output_dir) = &args.output_dir {
        for result in &results {
            let Some(report) = &result.report else {
                continue;
            };
            let output_name = result
                .path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("document");
            let output_path =
                output_dir.join(format!("{}.{}", output_name, args.format.file_extension()));

            fs::write(&output_path, report.render(args.format, true)?)?;
            debug!("Wrote output to {}", output_path.display());
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!("{} Summary written to {}", style("✓").green(), summary_path.display());
    }

    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    println!();
    println!(
        "{} {} documents processed in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(results.len() - failed.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "kind",
        "fields_filled",
        "cells",
        "red_cells",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();
        let time = result.processing_time_ms.to_string();

        let record = match &result.report {
            Some(Report::Contract(extraction)) => {
                let filled = extraction.data.values().filter(|v| !v.is_empty()).count();
                [filename, "success".into(), "contract".into(), filled.to_string(), String::new(), String::new(), time, String::new()]
            }
            Some(Report::Workbook(analysis)) => [
                filename,
                "success".into(),
                "workbook".into(),
                String::new(),
                analysis.summary.total_cells_with_data.to_string(),
                analysis.summary.total_red_cells.to_string(),
                time,
                String::new(),
            ],
            Some(Report::Grid(grid)) => {
                let red = grid.rows.iter().flatten().filter(|c| c.is_red).count();
                let cells = grid.rows.iter().flatten().filter(|c| !c.value.is_empty()).count();
                [filename, "success".into(), "grid".into(), String::new(), cells.to_string(), red.to_string(), time, String::new()]
            }
            None => [
                filename,
                "error".into(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                time,
                result.error.clone().unwrap_or_default(),
            ],
        };
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}
