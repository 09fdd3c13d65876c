use std::path::PathBuf;

use thiserror::Error;

/// An input source could not be read. Always fatal.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read input file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no input files given")]
    NoInputs,
}

/// Invalid analysis or parser configuration. Always fatal, and always raised
/// before any line is analyzed.
#[derive(Debug, Error)]
pub enum ConfigError {
    //-------------------------------------------------------------------------
    // Windowing
    //-------------------------------------------------------------------------
    #[error("density window size must be positive, got {secs} s")]
    NonPositiveWindow { secs: i64 },

    #[error("density window size of {secs} s is too large")]
    WindowTooLarge { secs: i64 },

    //-------------------------------------------------------------------------
    // Patterns
    //-------------------------------------------------------------------------
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("value pattern '{pattern}' must contain a capture group")]
    MissingCaptureGroup { pattern: String },

    //-------------------------------------------------------------------------
    // Timestamps
    //-------------------------------------------------------------------------
    #[error("at least one timestamp format is required")]
    NoTimestampFormats,

    #[error("fixed timestamp width must be at least 1")]
    ZeroDateWidth,
}
