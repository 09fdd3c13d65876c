//! Log processing for eventscope
//!
//! This crate loads timestamped text logs, dates every line and derives the
//! spot, density and value series of an [`AnalysisBundle`].

mod builder;
mod density;
mod error;
mod loader;
mod matcher;
mod parser;
mod pattern;

pub use builder::{AnalysisConfig, PatternSet, SeriesBuilder, analyze};
pub use density::{DEFAULT_WINDOW_SECS, DensityMatcher, FinalWindow, WindowConfig};
pub use error::{ConfigError, LoadError};
pub use loader::{DatedLines, LineLoader, RawLine, date_lines, split_lines};
pub use matcher::{Matcher, MatcherOutput, SpotMatcher, ValueMatcher, run};
pub use parser::{
    DEFAULT_FORMATS, ExtractionMode, ParseError, RFC3339_FORMAT, TimestampFormat, TimestampParser,
};
pub use pattern::{Capture, Pattern, PatternOptions};

// Re-export types used in our public API
pub use eventscope_types::{
    Analysis, AnalysisBundle, DatedLine, DensitySeries, DensityWindow, Diagnostic, LineOrigin,
    SpotSeries, Timestamp, ValuePoint, ValueSeries,
};
