//! Inspect command - dump PDF characters, words, fonts and red text.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use freightdoc_core::{inspect_pdf, DocumentInspection};

use super::load_config;

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// Input PDF file
    #[arg(required = true)]
    input: PathBuf,

    /// Only report this page (1-indexed)
    #[arg(short, long)]
    page: Option<u32>,

    /// Include every character with its position and color
    #[arg(long)]
    chars: bool,

    /// Print JSON instead of the text report
    #[arg(long)]
    json: bool,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub async fn run(args: InspectArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let data = fs::read(&args.input)?;
    let mut inspection = inspect_pdf(&data, &config, args.chars)?;
    info!("Inspected {} pages of {}", inspection.total_pages, args.input.display());

    if let Some(page) = args.page {
        if page == 0 || page > inspection.total_pages {
            anyhow::bail!(
                "Page {} out of range (document has {} pages)",
                page,
                inspection.total_pages
            );
        }
        inspection.pages.retain(|p| p.page == page);
    }

    let output = if args.json {
        serde_json::to_string_pretty(&inspection)?
    } else {
        format_report(&inspection, args.chars)
    };

    if let Some(output_path) = &args.output {
        fs::write(output_path, &output)?;
        println!("{} Output written to {}", style("✓").green(), output_path.display());
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn format_report(inspection: &DocumentInspection, chars: bool) -> String {
    let mut output = format!("Total pages: {}\n", inspection.total_pages);

    for page in &inspection.pages {
        output.push_str(&format!(
            "\nPage {} ({:.1} x {:.1})\n",
            page.page, page.width, page.height
        ));
        output.push_str(&format!(
            "  Fonts: {}\n",
            page.unique_fonts.iter().cloned().collect::<Vec<_>>().join(", ")
        ));
        output.push_str(&format!(
            "  Colors: {}\n",
            page.unique_colors.iter().cloned().collect::<Vec<_>>().join(", ")
        ));
        output.push_str(&format!("  Red text: {:?}\n", page.red_text));
        output.push_str(&format!("  Words ({}):\n", page.words.len()));
        for word in &page.words {
            output.push_str(&format!(
                "    {:>8.2} {:>8.2}  {} [{} {:.1}]\n",
                word.x0, word.top, word.text, word.fontname, word.size
            ));
        }

        if chars {
            output.push_str(&format!("  Chars ({}):\n", page.chars.len()));
            for ch in &page.chars {
                output.push_str(&format!(
                    "    {:?} x0={:.2} top={:.2} color={:?}{}\n",
                    ch.text,
                    ch.x0,
                    ch.top,
                    ch.non_stroking_color,
                    if ch.is_red { " red" } else { "" }
                ));
            }
        }
    }

    output
}
