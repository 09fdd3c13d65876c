//! Shared types for eventscope
//!
//! This crate contains the data model shared by the analysis crate and the
//! binary: dated lines, the three series kinds, the analysis bundle handed to
//! renderers, per-line diagnostics and the renderer palette.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// All timestamps are normalized to UTC so mixed naive/zoned lines compare
pub type Timestamp = DateTime<Utc>;

// ============================================================================
// Line Types
// ============================================================================

/// Where a line came from
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LineOrigin {
    /// Input source name (usually the file path)
    pub source: Arc<str>,

    /// 1-based line number within the source
    pub line_number: u64,
}

impl LineOrigin {
    pub fn new(source: Arc<str>, line_number: u64) -> Self {
        Self {
            source,
            line_number,
        }
    }
}

impl fmt::Display for LineOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.line_number)
    }
}

/// A single input line successfully associated with a parsed timestamp
#[derive(Clone, Debug, PartialEq)]
pub struct DatedLine {
    /// Parsed timestamp (UTC)
    pub timestamp: Timestamp,

    /// Text following the timestamp, searched by patterns
    pub payload: String,

    /// Original raw line, kept for diagnostics
    pub raw: String,

    /// Source location
    pub origin: LineOrigin,
}

impl DatedLine {
    pub fn new(timestamp: Timestamp, payload: String, raw: String, origin: LineOrigin) -> Self {
        Self {
            timestamp,
            payload,
            raw,
            origin,
        }
    }
}

// ============================================================================
// Series Types
// ============================================================================

/// The three analysis kinds a pattern can drive
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisKind {
    Density,
    Spot,
    Value,
}

/// One closed tumbling window and the number of matches it saw
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DensityWindow {
    pub start: Timestamp,
    pub count: u64,
}

impl DensityWindow {
    pub fn new(start: Timestamp, count: u64) -> Self {
        Self { start, count }
    }
}

/// One numeric sample extracted from a line
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ValuePoint {
    pub timestamp: Timestamp,
    pub value: f64,
}

impl ValuePoint {
    pub fn new(timestamp: Timestamp, value: f64) -> Self {
        Self { timestamp, value }
    }
}

pub type SpotSeries = Vec<Timestamp>;
pub type DensitySeries = Vec<DensityWindow>;
pub type ValueSeries = Vec<ValuePoint>;

/// Every named series of one run, keyed by pattern text.
///
/// Maps iterate in pattern declaration order. Inserting a pattern twice keeps
/// its first position and replaces the series.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AnalysisBundle {
    pub density: IndexMap<String, DensitySeries>,
    pub spot: IndexMap<String, SpotSeries>,
    pub value: IndexMap<String, ValueSeries>,
}

impl AnalysisBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of named series across all kinds
    pub fn series_count(&self) -> usize {
        self.density.len() + self.spot.len() + self.value.len()
    }

    /// True when no pattern of any kind was requested
    pub fn is_empty(&self) -> bool {
        self.series_count() == 0
    }

    /// Series names in renderer order: density, then value, then spot
    pub fn series_names(&self) -> Vec<(AnalysisKind, &str)> {
        let density = self.density.keys().map(|k| (AnalysisKind::Density, k.as_str()));
        let value = self.value.keys().map(|k| (AnalysisKind::Value, k.as_str()));
        let spot = self.spot.keys().map(|k| (AnalysisKind::Spot, k.as_str()));
        density.chain(value).chain(spot).collect()
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// A recoverable per-line anomaly. The run continues; only the line (or the
/// value) is dropped.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum Diagnostic {
    #[error("{origin}: no timestamp could be parsed: {raw}")]
    UnparsableTimestamp { origin: LineOrigin, raw: String },

    #[error("{origin}: line in the past (ignored): {raw}")]
    OutOfOrder { origin: LineOrigin, raw: String },

    #[error("{origin}: cannot extract numeric ({pattern}): {raw}")]
    NonNumericCapture {
        pattern: String,
        origin: LineOrigin,
        raw: String,
        capture: Option<String>,
    },
}

impl Diagnostic {
    /// Location of the offending line
    pub fn origin(&self) -> &LineOrigin {
        match self {
            Self::UnparsableTimestamp { origin, .. }
            | Self::OutOfOrder { origin, .. }
            | Self::NonNumericCapture { origin, .. } => origin,
        }
    }
}

/// Bundle plus the diagnostics collected while building it
#[derive(Clone, Debug, Default)]
pub struct Analysis {
    pub bundle: AnalysisBundle,
    pub diagnostics: Vec<Diagnostic>,
}

// ============================================================================
// Palette
// ============================================================================

/// Colors a renderer can tell apart, in assignment order
pub const DEFAULT_COLORS: [&str; 7] = ["blue", "green", "red", "cyan", "magenta", "yellow", "black"];

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PaletteError {
    #[error("not enough colors to represent data: {requested} series, {available} colors")]
    Exhausted { requested: usize, available: usize },
}

/// Fixed set of distinguishable series colors
#[derive(Clone, Debug)]
pub struct Palette {
    colors: Vec<&'static str>,
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(DEFAULT_COLORS.to_vec())
    }
}

impl Palette {
    pub fn new(colors: Vec<&'static str>) -> Self {
        Self { colors }
    }

    /// Check that `count` series can each get their own color
    pub fn check(&self, count: usize) -> Result<(), PaletteError> {
        if count > self.colors.len() {
            return Err(PaletteError::Exhausted {
                requested: count,
                available: self.colors.len(),
            });
        }
        Ok(())
    }

    /// Assign one color per series, in order
    pub fn assign(&self, count: usize) -> Result<Vec<&'static str>, PaletteError> {
        self.check(count)?;
        Ok(self.colors[..count].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> Timestamp {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_bundle_duplicate_pattern_overwrites_in_place() {
        let mut bundle = AnalysisBundle::new();
        bundle.spot.insert("a".to_string(), vec![ts(1)]);
        bundle.spot.insert("b".to_string(), vec![]);
        bundle.spot.insert("a".to_string(), vec![ts(2), ts(3)]);

        let keys: Vec<&str> = bundle.spot.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(bundle.spot["a"], vec![ts(2), ts(3)]);
        assert_eq!(bundle.series_count(), 2);
    }

    #[test]
    fn test_series_names_renderer_order() {
        let mut bundle = AnalysisBundle::new();
        bundle.spot.insert("err".to_string(), vec![]);
        bundle.value.insert("size: (\\d+)".to_string(), vec![]);
        bundle.density.insert("info".to_string(), vec![]);

        let names = bundle.series_names();
        assert_eq!(
            names,
            vec![
                (AnalysisKind::Density, "info"),
                (AnalysisKind::Value, "size: (\\d+)"),
                (AnalysisKind::Spot, "err"),
            ]
        );
    }

    #[test]
    fn test_palette_exhaustion() {
        let palette = Palette::default();
        assert_eq!(palette.assign(3).unwrap(), vec!["blue", "green", "red"]);
        assert!(palette.check(7).is_ok());
        assert_eq!(
            palette.check(8),
            Err(PaletteError::Exhausted {
                requested: 8,
                available: 7
            })
        );
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::OutOfOrder {
            origin: LineOrigin::new(Arc::from("b.log"), 3),
            raw: "2020-01-01T00:00:00.000 late".to_string(),
        };
        assert_eq!(
            diag.to_string(),
            "b.log:3: line in the past (ignored): 2020-01-01T00:00:00.000 late"
        );
        assert_eq!(diag.origin().line_number, 3);
    }

    #[test]
    fn test_bundle_serializes_in_declaration_order() {
        let mut bundle = AnalysisBundle::new();
        bundle.density.insert("z".to_string(), vec![DensityWindow::new(ts(0), 2)]);
        bundle.density.insert("a".to_string(), vec![]);

        let json = serde_json::to_string(&bundle).unwrap();
        let z = json.find("\"z\"").unwrap();
        let a = json.find("\"a\"").unwrap();
        assert!(z < a);
        assert!(json.contains("\"count\":2"));
    }
}
