//! Per-pattern transforms over the dated-line stream.
//!
//! Each matcher owns one pattern and one output series. Matchers only read
//! the shared stream, so independent matchers can run on separate threads.

use eventscope_types::{DatedLine, Diagnostic, SpotSeries, ValuePoint, ValueSeries};

use crate::pattern::{Capture, Pattern};

/// A single-pass transform from dated lines to one named series
pub trait Matcher {
    type Series;

    /// Pattern text naming the produced series
    fn name(&self) -> &str;

    /// Feed the next line of the stream. Per-line anomalies are appended to
    /// `diagnostics` and never stop the pass.
    fn observe(&mut self, line: &DatedLine, diagnostics: &mut Vec<Diagnostic>);

    /// End of stream: hand over the series
    fn finish(self) -> Self::Series;
}

/// Output of one matcher pass
#[derive(Clone, Debug)]
pub struct MatcherOutput<S> {
    pub name: String,
    pub series: S,
    pub diagnostics: Vec<Diagnostic>,
}

/// Run a matcher over the whole stream
pub fn run<M: Matcher>(mut matcher: M, lines: &[DatedLine]) -> MatcherOutput<M::Series> {
    let mut diagnostics = Vec::new();
    for line in lines {
        matcher.observe(line, &mut diagnostics);
    }
    let name = matcher.name().to_string();
    MatcherOutput {
        name,
        series: matcher.finish(),
        diagnostics,
    }
}

// ============================================================================
// Spot
// ============================================================================

/// Records the timestamp of every matching line
#[derive(Debug)]
pub struct SpotMatcher {
    pattern: Pattern,
    series: SpotSeries,
}

impl SpotMatcher {
    pub fn new(pattern: Pattern) -> Self {
        Self {
            pattern,
            series: Vec::new(),
        }
    }
}

impl Matcher for SpotMatcher {
    type Series = SpotSeries;

    fn name(&self) -> &str {
        self.pattern.pattern()
    }

    fn observe(&mut self, line: &DatedLine, _diagnostics: &mut Vec<Diagnostic>) {
        if self.pattern.is_match(&line.payload) {
            self.series.push(line.timestamp);
        }
    }

    fn finish(self) -> SpotSeries {
        self.series
    }
}

// ============================================================================
// Value
// ============================================================================

/// Extracts a number from the first capture group of every matching line
#[derive(Debug)]
pub struct ValueMatcher {
    pattern: Pattern,
    series: ValueSeries,
}

impl ValueMatcher {
    /// `pattern` should be compiled with [`Pattern::with_capture`]
    pub fn new(pattern: Pattern) -> Self {
        Self {
            pattern,
            series: Vec::new(),
        }
    }

    fn reject(&self, line: &DatedLine, capture: Option<&str>, diagnostics: &mut Vec<Diagnostic>) {
        diagnostics.push(Diagnostic::NonNumericCapture {
            pattern: self.pattern.pattern().to_string(),
            origin: line.origin.clone(),
            raw: line.raw.clone(),
            capture: capture.map(str::to_string),
        });
    }
}

impl Matcher for ValueMatcher {
    type Series = ValueSeries;

    fn name(&self) -> &str {
        self.pattern.pattern()
    }

    fn observe(&mut self, line: &DatedLine, diagnostics: &mut Vec<Diagnostic>) {
        match self.pattern.first_capture(&line.payload) {
            Capture::NoMatch => {}
            Capture::Empty => self.reject(line, None, diagnostics),
            Capture::Text(text) => match text.trim().parse::<f64>() {
                Ok(value) => self.series.push(ValuePoint::new(line.timestamp, value)),
                Err(_) => self.reject(line, Some(text), diagnostics),
            },
        }
    }

    fn finish(self) -> ValueSeries {
        self.series
    }
}
