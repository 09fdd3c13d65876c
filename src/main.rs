use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use eventscope_logs::{LineLoader, SeriesBuilder};
use eventscope_types::Palette;

mod config;
mod render;

use config::{FileConfig, Settings};
use render::{OutputFormat, RenderContext, renderer_for};

/// Eventscope - show log events over time as spots, densities or values
///
/// Each input line must start with a timestamp followed by free text.
/// Example: eventscope -d info warning -s err -v 'space: ([0-9]+)' -- test/sample.log
#[derive(Parser, Debug)]
#[command(name = "eventscope")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log files, analyzed in the given order
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Pattern(s) counted per time window (regex)
    #[arg(short, long, num_args = 1.., value_name = "PATTERN")]
    density: Vec<String>,

    /// Pattern(s) shown as individual events (regex)
    #[arg(short, long, num_args = 1.., value_name = "PATTERN")]
    spot: Vec<String>,

    /// Pattern(s) with one capture group holding a number (regex)
    #[arg(short, long, num_args = 1.., value_name = "PATTERN")]
    value: Vec<String>,

    /// Timestamp formats (strftime, or "rfc3339"), tried in order
    #[arg(short = 'f', long = "date-format", num_args = 1.., value_name = "FORMAT")]
    date_formats: Vec<String>,

    /// Timestamp width in characters. Without it, the first blank ends the timestamp
    #[arg(long, value_name = "N")]
    date_size: Option<usize>,

    /// Density window size in seconds [default: 300]
    #[arg(
        long = "density-window-size",
        value_name = "SECONDS",
        allow_negative_numbers = true
    )]
    window_secs: Option<i64>,

    /// Also report the density window still open at the end of the logs
    #[arg(long)]
    flush_final_window: bool,

    /// Match density and spot patterns as plain text instead of regex
    #[arg(long)]
    literal: bool,

    /// Case-insensitive pattern matching
    #[arg(short, long)]
    ignore_case: bool,

    /// Title passed to the renderer
    #[arg(short, long)]
    title: Option<String>,

    /// Output format [default: text]
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Run pattern passes in parallel
    #[arg(long)]
    parallel: bool,

    /// TOML configuration file; command-line options take precedence
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Diagnostics go to stderr; RUST_LOG overrides the default level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let file_config = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = Settings::resolve(&args, file_config)?;

    // Every fatal check happens before the first line is analyzed
    let builder = SeriesBuilder::new(&settings.analysis)?;
    Palette::default().check(settings.analysis.patterns.series_count())?;
    let loader = LineLoader::new(settings.inputs.clone())?;
    tracing::debug!("Reading {} input files", loader.sources().len());

    let dated = loader.load_dated(&settings.parser)?;
    let mut diagnostics = dated.diagnostics;
    if !diagnostics.is_empty() {
        tracing::warn!(
            "Skipped {} lines without a parsable timestamp",
            diagnostics.len()
        );
    }

    let mut analysis = builder.build(&dated.lines);
    diagnostics.append(&mut analysis.diagnostics);
    tracing::debug!("{} diagnostics in total", diagnostics.len());

    let ctx = RenderContext {
        title: settings.title.as_deref(),
        window: builder.window(),
    };
    let stdout = io::stdout().lock();
    renderer_for(settings.output, stdout).render(&analysis.bundle, &ctx)
}
