//! Process command - extract data from a single contract file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use freightdoc_core::models::workbook::TemplateGrid;
use freightdoc_core::{
    extract_from_pdf_bytes, extract_from_workbook, template_grid_from_bytes, FreightConfig,
    PdfExtraction, WorkbookAnalysis,
};

use super::{extension, load_config};

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input file (PDF contract or XLSX template)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// For workbooks, print the dense template grid instead of the cell dump
    #[arg(long)]
    grid: bool,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn file_extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

/// Result of processing one document.
pub enum Report {
    Contract(PdfExtraction),
    Workbook(WorkbookAnalysis),
    Grid(TemplateGrid),
}

impl Report {
    /// Short description for status lines.
    pub fn describe(&self) -> String {
        match self {
            Report::Contract(extraction) => {
                let filled = extraction.data.values().filter(|v| !v.is_empty()).count();
                format!("{}/{} fields", filled, extraction.data.len())
            }
            Report::Workbook(analysis) => format!(
                "{} cells, {} red",
                analysis.summary.total_cells_with_data, analysis.summary.total_red_cells
            ),
            Report::Grid(grid) => format!("{}x{} grid", grid.max_row, grid.max_column),
        }
    }

    /// Render the report in the requested format.
    pub fn render(&self, format: OutputFormat, pretty: bool) -> anyhow::Result<String> {
        match format {
            OutputFormat::Json => self.to_json(pretty),
            OutputFormat::Csv => self.to_csv(),
            OutputFormat::Text => Ok(self.to_text()),
        }
    }

    fn to_json(&self, pretty: bool) -> anyhow::Result<String> {
        let value = match self {
            Report::Contract(extraction) => serde_json::to_value(extraction)?,
            Report::Workbook(analysis) => serde_json::to_value(analysis)?,
            Report::Grid(grid) => serde_json::to_value(grid)?,
        };
        Ok(if pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        })
    }

    fn to_csv(&self) -> anyhow::Result<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);

        match self {
            Report::Contract(extraction) => {
                wtr.write_record(["field", "value"])?;
                for (field, value) in &extraction.data {
                    wtr.write_record([field, value])?;
                }
            }
            Report::Workbook(analysis) => {
                wtr.write_record([
                    "coordinate",
                    "row",
                    "column",
                    "value",
                    "data_type",
                    "bold",
                    "font_color",
                    "fill_color",
                    "is_red",
                ])?;
                for cell in &analysis.cells {
                    let font = cell.font.as_ref();
                    let is_red = analysis.red_cells.iter().any(|r| r.coordinate == cell.coordinate);
                    wtr.write_record([
                        cell.coordinate.clone(),
                        cell.row.to_string(),
                        cell.column.to_string(),
                        cell.value.clone(),
                        cell.data_type.code().to_string(),
                        font.is_some_and(|f| f.bold).to_string(),
                        font.and_then(|f| f.color.clone()).unwrap_or_default(),
                        cell.fill.as_ref().and_then(|f| f.fg_color.clone()).unwrap_or_default(),
                        is_red.to_string(),
                    ])?;
                }
            }
            Report::Grid(grid) => {
                for row in &grid.rows {
                    wtr.write_record(row.iter().map(|cell| cell.value.as_str()))?;
                }
            }
        }

        let data = String::from_utf8(wtr.into_inner()?)?;
        Ok(data)
    }

    fn to_text(&self) -> String {
        let mut output = String::new();

        match self {
            Report::Contract(extraction) => {
                output.push_str(&format!("Contract fields ({}):\n", self.describe()));
                for (field, value) in extraction.data.iter().filter(|(_, v)| !v.is_empty()) {
                    output.push_str(&format!("  {}: {}\n", field, value));
                }
            }
            Report::Workbook(analysis) => {
                let dims = &analysis.dimensions;
                output.push_str(&format!("Sheet: {}\n", analysis.sheet_name));
                output.push_str(&format!(
                    "Used range: rows {}-{}, columns {}-{}\n",
                    dims.min_row, dims.max_row, dims.min_column, dims.max_column
                ));
                output.push_str(&format!("Cells: {}\n", analysis.summary.total_cells_with_data));
                output.push_str(&format!("Merged ranges: {}\n", analysis.summary.total_merged_ranges));
                for merged in &analysis.merged_cells {
                    output.push_str(&format!("  {}\n", merged.range));
                }
                output.push_str(&format!("Red cells: {}\n", analysis.summary.total_red_cells));
                for line in &analysis.summary.red_cells_list {
                    output.push_str(&format!("  {}\n", line));
                }
            }
            Report::Grid(grid) => {
                output.push_str(&format!("Sheet: {} ({})\n", grid.sheet_name, self.describe()));
                for row in &grid.rows {
                    let cells: Vec<String> = row
                        .iter()
                        .map(|cell| {
                            if cell.is_red {
                                format!("*{}*", cell.value)
                            } else {
                                cell.value.clone()
                            }
                        })
                        .collect();
                    output.push_str(&cells.join(" | "));
                    output.push('\n');
                }
            }
        }

        output
    }
}

/// Process one file by extension.
pub fn process_file(path: &Path, config: &FreightConfig, grid: bool) -> anyhow::Result<Report> {
    let ext = extension(path);
    let data = match ext.as_str() {
        "pdf" | "xlsx" | "xlsm" => fs::read(path)?,
        _ => anyhow::bail!("Unsupported file format: {}", ext),
    };
    debug!("Read {} bytes from {}", data.len(), path.display());

    let report = match ext.as_str() {
        "pdf" => Report::Contract(extract_from_pdf_bytes(&data, config)?),
        _ if grid => Report::Grid(template_grid_from_bytes(&data, config)?),
        _ => Report::Workbook(extract_from_workbook(&data, config)?),
    };
    Ok(report)
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(format!("Extracting {}...", args.input.display()));

    let report = process_file(&args.input, &config, args.grid);
    pb.finish_and_clear();
    let report = report?;

    let output = report.render(args.format, args.pretty)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!(
            "{} Output written to {} ({})",
            style("✓").green(),
            output_path.display(),
            report.describe()
        );
    } else {
        println!("{}", output);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}
