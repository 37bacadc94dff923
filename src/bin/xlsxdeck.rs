//! CLI tool for transcribing Excel table regions into PowerPoint decks.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Instant;
use xlsxdeck::{ConverterBuilder, DeckConfig};

/// Insert titled Excel tables into a PowerPoint template, one deck per region.
#[derive(Parser, Debug)]
#[command(name = "xlsxdeck")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file
    config: PathBuf,

    /// Output directory (overrides `outputFolder`)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Render the regions one after another instead of in parallel
    #[arg(long)]
    sequential: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let mut config = DeckConfig::from_path(&args.config)
        .with_context(|| format!("Failed to load configuration {}", args.config.display()))?;
    if let Some(output) = args.output {
        config.output_folder = output;
    }
    config
        .validate()
        .with_context(|| format!("Invalid configuration {}", args.config.display()))?;

    check_inputs(&config)?;

    log::info!("Recap info");
    log::info!("  Excel file:    {}", config.excel_file.display());
    log::info!("  PPT template:  {}", config.ppt_file.display());
    log::info!("  Output folder: {}", config.output_folder.display());
    log::info!("  Suffix:        '{}'", config.excel_suffix);
    log::info!("  Tables:        {}", config.tables.len());

    log::info!("Start Process");
    let started = Instant::now();

    let converter = ConverterBuilder::new()
        .with_config(&config)
        .with_parallel(!args.sequential)
        .build()
        .context("Failed to build converter")?;

    let workbook = File::open(&config.excel_file)
        .with_context(|| format!("Failed to open {}", config.excel_file.display()))?;
    let template = File::open(&config.ppt_file)
        .with_context(|| format!("Failed to open {}", config.ppt_file.display()))?;

    let report = converter
        .convert_into_folder(
            BufReader::new(workbook),
            BufReader::new(template),
            &config.output_folder,
        )
        .context("Conversion failed")?;

    log::info!(
        "{} deck(s) written, {} table(s) skipped",
        report.written.len(),
        report.skipped.len()
    );
    log::info!("Process completed in {} ms", started.elapsed().as_millis());

    Ok(())
}

/// Check that the input files and the output folder exist.
fn check_inputs(config: &DeckConfig) -> Result<()> {
    for (label, path) in [("Excel file", &config.excel_file), ("PPT file", &config.ppt_file)] {
        if !path.is_file() {
            bail!("{} {} does not exist or is not a file", label, path.display());
        }
    }
    if !config.output_folder.is_dir() {
        bail!(
            "Output folder {} does not exist or is not a directory",
            config.output_folder.display()
        );
    }
    Ok(())
}
