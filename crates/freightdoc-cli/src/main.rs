//! CLI application for freight contract extraction.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, config, inspect, process};

/// freightdoc - Extract contract fields from PDFs and analyze XLSX templates
#[derive(Parser)]
#[command(name = "freightdoc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process a single PDF contract or XLSX template
    Process(process::ProcessArgs),

    /// Process multiple files
    Batch(batch::BatchArgs),

    /// Dump PDF characters, words and red text
    Inspect(inspect::InspectArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Process(args) => process::run(args, config_path).await,
        Commands::Batch(args) => batch::run(args, config_path).await,
        Commands::Inspect(args) => inspect::run(args, config_path).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
