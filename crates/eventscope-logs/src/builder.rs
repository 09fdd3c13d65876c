use std::collections::HashSet;

use rayon::prelude::*;

use eventscope_types::{Analysis, AnalysisBundle, DatedLine, Diagnostic, LineOrigin};

use crate::density::{DensityMatcher, WindowConfig};
use crate::error::ConfigError;
use crate::matcher::{Matcher, MatcherOutput, SpotMatcher, ValueMatcher, run};
use crate::pattern::{Pattern, PatternOptions};

/// Pattern texts per analysis kind, in declaration order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PatternSet {
    pub density: Vec<String>,
    pub spot: Vec<String>,
    pub value: Vec<String>,
}

impl PatternSet {
    /// Number of distinct series the set will produce
    pub fn series_count(&self) -> usize {
        distinct(&self.density) + distinct(&self.spot) + distinct(&self.value)
    }

    pub fn is_empty(&self) -> bool {
        self.density.is_empty() && self.spot.is_empty() && self.value.is_empty()
    }
}

fn distinct(patterns: &[String]) -> usize {
    patterns.iter().collect::<HashSet<_>>().len()
}

/// Everything the builder needs for one run
#[derive(Clone, Debug, Default)]
pub struct AnalysisConfig {
    pub patterns: PatternSet,
    pub window: WindowConfig,

    /// Applied to density and spot patterns; value patterns are always
    /// regular expressions since they need a capture group
    pub options: PatternOptions,

    /// Fan matcher passes out over the rayon pool
    pub parallel: bool,
}

/// Runs one matcher per pattern and kind over a shared stream and bundles
/// the named series.
///
/// All patterns are compiled up front, so configuration errors surface before
/// any line is analyzed.
#[derive(Debug)]
pub struct SeriesBuilder {
    density: Vec<Pattern>,
    spot: Vec<Pattern>,
    value: Vec<Pattern>,
    window: WindowConfig,
    parallel: bool,
}

impl SeriesBuilder {
    pub fn new(config: &AnalysisConfig) -> Result<Self, ConfigError> {
        let options = config.options;
        let value_options = PatternOptions {
            literal: false,
            ..options
        };

        let density = compile(&config.patterns.density, |p| Pattern::new(p, options))?;
        let spot = compile(&config.patterns.spot, |p| Pattern::new(p, options))?;
        let value = compile(&config.patterns.value, |p| {
            Pattern::with_capture(p, value_options)
        })?;

        Ok(Self {
            density,
            spot,
            value,
            window: config.window,
            parallel: config.parallel,
        })
    }

    pub fn window(&self) -> WindowConfig {
        self.window
    }

    /// Analyze the dated-line stream
    pub fn build(&self, lines: &[DatedLine]) -> Analysis {
        let window = self.window;
        let density = self.run_all(&self.density, lines, |p| {
            DensityMatcher::new(p.clone(), window)
        });
        let spot = self.run_all(&self.spot, lines, |p| SpotMatcher::new(p.clone()));
        let value = self.run_all(&self.value, lines, |p| ValueMatcher::new(p.clone()));

        let mut bundle = AnalysisBundle::new();
        let mut diagnostics = Vec::new();

        // A line going back in time is rejected by every density matcher;
        // report it once
        let mut rejected: HashSet<LineOrigin> = HashSet::new();
        for out in density {
            for diagnostic in out.diagnostics {
                if rejected.insert(diagnostic.origin().clone()) {
                    diagnostics.push(diagnostic);
                }
            }
            bundle.density.insert(out.name, out.series);
        }
        for out in spot {
            diagnostics.extend(out.diagnostics);
            bundle.spot.insert(out.name, out.series);
        }
        for out in value {
            diagnostics.extend(out.diagnostics);
            bundle.value.insert(out.name, out.series);
        }

        for diagnostic in &diagnostics {
            report(diagnostic);
        }

        tracing::info!(
            "Built {} density, {} spot and {} value series from {} lines",
            bundle.density.len(),
            bundle.spot.len(),
            bundle.value.len(),
            lines.len()
        );

        Analysis {
            bundle,
            diagnostics,
        }
    }

    /// One pass per pattern; output order follows `patterns` either way
    fn run_all<M, F>(
        &self,
        patterns: &[Pattern],
        lines: &[DatedLine],
        make: F,
    ) -> Vec<MatcherOutput<M::Series>>
    where
        M: Matcher,
        M::Series: Send,
        F: Fn(&Pattern) -> M + Send + Sync,
    {
        if self.parallel {
            patterns.par_iter().map(|p| run(make(p), lines)).collect()
        } else {
            patterns.iter().map(|p| run(make(p), lines)).collect()
        }
    }
}

/// Compile each distinct pattern once, keeping first-occurrence order
fn compile<F>(patterns: &[String], compile_one: F) -> Result<Vec<Pattern>, ConfigError>
where
    F: Fn(&str) -> Result<Pattern, ConfigError>,
{
    let mut seen = HashSet::new();
    patterns
        .iter()
        .filter(|p| seen.insert(p.as_str()))
        .map(|p| compile_one(p.as_str()))
        .collect()
}

fn report(diagnostic: &Diagnostic) {
    match diagnostic {
        Diagnostic::UnparsableTimestamp { .. } => tracing::debug!("{diagnostic}"),
        Diagnostic::OutOfOrder { .. } | Diagnostic::NonNumericCapture { .. } => {
            tracing::warn!("{diagnostic}");
        }
    }
}

/// Compile the configuration and analyze `lines` in one call
pub fn analyze(lines: &[DatedLine], config: &AnalysisConfig) -> Result<Analysis, ConfigError> {
    Ok(SeriesBuilder::new(config)?.build(lines))
}
