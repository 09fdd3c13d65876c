//! Run settings: an optional TOML file merged with command-line arguments.
//!
//! Command-line values win. A pattern or format list given on the command
//! line replaces the file's list rather than extending it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use eventscope_logs::{
    AnalysisConfig, DEFAULT_WINDOW_SECS, FinalWindow, PatternOptions, PatternSet,
    TimestampParser, WindowConfig,
};

use crate::Args;
use crate::render::OutputFormat;

/// Contents of a `--config` file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Log files, relative to the working directory
    pub inputs: Vec<PathBuf>,

    pub density: Vec<String>,
    pub spot: Vec<String>,
    pub value: Vec<String>,

    /// Candidate timestamp formats, first match wins
    pub date_formats: Vec<String>,

    /// Fixed timestamp width in characters
    pub date_size: Option<usize>,

    pub window_secs: Option<i64>,
    pub final_window: Option<FinalWindow>,

    pub literal: Option<bool>,
    pub case_insensitive: Option<bool>,

    pub title: Option<String>,
    pub output: Option<OutputFormat>,
    pub parallel: Option<bool>,
}

impl FileConfig {
    /// Read and parse a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("invalid configuration file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Fully resolved, validated settings for one run
#[derive(Debug)]
pub struct Settings {
    pub inputs: Vec<PathBuf>,
    pub parser: TimestampParser,
    pub analysis: AnalysisConfig,
    pub title: Option<String>,
    pub output: OutputFormat,
}

impl Settings {
    /// Merge arguments over the file configuration and validate the result
    pub fn resolve(args: &Args, file: FileConfig) -> Result<Self> {
        let date_formats = prefer(&args.date_formats, file.date_formats);
        let parser = TimestampParser::new(&date_formats, args.date_size.or(file.date_size))?;

        let window_secs = args
            .window_secs
            .or(file.window_secs)
            .unwrap_or(DEFAULT_WINDOW_SECS);
        let final_window = if args.flush_final_window {
            FinalWindow::Flush
        } else {
            file.final_window.unwrap_or_default()
        };
        let window = WindowConfig::new(window_secs, final_window)?;

        let analysis = AnalysisConfig {
            patterns: PatternSet {
                density: prefer(&args.density, file.density),
                spot: prefer(&args.spot, file.spot),
                value: prefer(&args.value, file.value),
            },
            window,
            options: PatternOptions {
                literal: args.literal || file.literal.unwrap_or(false),
                case_insensitive: args.ignore_case || file.case_insensitive.unwrap_or(false),
            },
            parallel: args.parallel || file.parallel.unwrap_or(false),
        };

        if analysis.patterns.is_empty() {
            tracing::warn!("No density, spot or value pattern given; the analysis will be empty");
        }

        Ok(Self {
            inputs: prefer(&args.files, file.inputs),
            parser,
            analysis,
            title: args.title.clone().or(file.title),
            output: args.output.or(file.output).unwrap_or_default(),
        })
    }
}

/// Command-line list if given, otherwise the file's
fn prefer<T: Clone>(from_args: &[T], from_file: Vec<T>) -> Vec<T> {
    if from_args.is_empty() {
        from_file
    } else {
        from_args.to_vec()
    }
}
