//! Non-graphical renderers for an analysis bundle.
//!
//! Both renderers assign palette colors in the same order a chart would:
//! density series first, then value series, then spot lanes.

use std::io::Write;

use anyhow::Result;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use eventscope_logs::WindowConfig;
use eventscope_types::{AnalysisBundle, AnalysisKind, Palette, Timestamp};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Which renderer to use
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Text,

    /// The full bundle as one JSON document
    Json,
}

/// Values the renderer needs besides the bundle
#[derive(Clone, Copy, Debug)]
pub struct RenderContext<'a> {
    pub title: Option<&'a str>,
    pub window: WindowConfig,
}

/// Consumer of a finished analysis
pub trait Renderer {
    fn render(&mut self, bundle: &AnalysisBundle, ctx: &RenderContext<'_>) -> Result<()>;
}

/// Build the renderer for an output format
pub fn renderer_for<'w, W: Write + 'w>(format: OutputFormat, out: W) -> Box<dyn Renderer + 'w> {
    match format {
        OutputFormat::Text => Box::new(TextRenderer::new(out)),
        OutputFormat::Json => Box::new(JsonRenderer::new(out)),
    }
}

// ============================================================================
// JSON
// ============================================================================

#[derive(Serialize)]
struct SeriesColor<'a> {
    kind: AnalysisKind,
    pattern: &'a str,
    color: &'static str,
}

#[derive(Serialize)]
struct JsonDocument<'a> {
    title: Option<&'a str>,
    window_secs: i64,
    #[serde(flatten)]
    bundle: &'a AnalysisBundle,
    colors: Vec<SeriesColor<'a>>,
}

/// Writes the bundle, window size, title and color assignment as JSON
pub struct JsonRenderer<W: Write> {
    out: W,
    palette: Palette,
}

impl<W: Write> JsonRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            palette: Palette::default(),
        }
    }
}

impl<W: Write> Renderer for JsonRenderer<W> {
    fn render(&mut self, bundle: &AnalysisBundle, ctx: &RenderContext<'_>) -> Result<()> {
        let names = bundle.series_names();
        let colors = self.palette.assign(names.len())?;

        let document = JsonDocument {
            title: ctx.title,
            window_secs: ctx.window.size_secs(),
            bundle,
            colors: names
                .into_iter()
                .zip(colors)
                .map(|((kind, pattern), color)| SeriesColor {
                    kind,
                    pattern,
                    color,
                })
                .collect(),
        };

        serde_json::to_writer_pretty(&mut self.out, &document)?;
        writeln!(self.out)?;
        Ok(())
    }
}

// ============================================================================
// Text
// ============================================================================

/// Writes a short per-series summary
pub struct TextRenderer<W: Write> {
    out: W,
    palette: Palette,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            palette: Palette::default(),
        }
    }
}

fn fmt_time(ts: Timestamp) -> String {
    ts.format(TIME_FORMAT).to_string()
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn render(&mut self, bundle: &AnalysisBundle, ctx: &RenderContext<'_>) -> Result<()> {
        let mut colors = self.palette.assign(bundle.series_count())?.into_iter();
        let out = &mut self.out;

        if let Some(title) = ctx.title {
            writeln!(out, "{title}")?;
            writeln!(out, "{}", "=".repeat(title.chars().count()))?;
        }
        if bundle.is_empty() {
            writeln!(out, "No patterns to report.")?;
            return Ok(());
        }

        if !bundle.density.is_empty() {
            writeln!(out, "Density ({} s windows, UTC)", ctx.window.size_secs())?;
            for (pattern, series) in &bundle.density {
                let color = colors.next().unwrap_or_default();
                let total: u64 = series.iter().map(|w| w.count).sum();
                // first window wins a tie for the peak
                let peak = series
                    .iter()
                    .rev()
                    .max_by_key(|w| w.count)
                    .filter(|w| w.count > 0);
                match peak {
                    Some(peak) => writeln!(
                        out,
                        "  [{color}] {pattern}: {} windows, {total} matches, peak {} at {}",
                        series.len(),
                        peak.count,
                        fmt_time(peak.start)
                    )?,
                    None => writeln!(
                        out,
                        "  [{color}] {pattern}: {} windows, no events",
                        series.len()
                    )?,
                }
            }
        }

        if !bundle.value.is_empty() {
            writeln!(out, "Value")?;
            for (pattern, series) in &bundle.value {
                let color = colors.next().unwrap_or_default();
                if series.is_empty() {
                    writeln!(out, "  [{color}] {pattern}: no samples")?;
                    continue;
                }
                let values = series.iter().map(|p| p.value);
                let min = values.clone().fold(f64::INFINITY, f64::min);
                let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
                let mean = values.sum::<f64>() / series.len() as f64;
                writeln!(
                    out,
                    "  [{color}] {pattern}: {} samples, min {min}, max {max}, mean {mean:.3}",
                    series.len()
                )?;
            }
        }

        if !bundle.spot.is_empty() {
            writeln!(out, "Spot")?;
            for (pattern, series) in &bundle.spot {
                let color = colors.next().unwrap_or_default();
                match (series.iter().min(), series.iter().max()) {
                    (Some(first), Some(last)) => writeln!(
                        out,
                        "  [{color}] {pattern}: {} events, first {}, last {}",
                        series.len(),
                        fmt_time(*first),
                        fmt_time(*last)
                    )?,
                    _ => writeln!(out, "  [{color}] {pattern}: no events")?,
                }
            }
        }

        Ok(())
    }
}
