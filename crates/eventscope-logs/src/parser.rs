use chrono::format::{self, ParseResult, Parsed, StrftimeItems};
use chrono::{DateTime, Utc};
use std::num::NonZeroUsize;
use thiserror::Error;

use eventscope_types::Timestamp;

use crate::error::ConfigError;

/// Formats tried when the caller supplies none: ISO-8601 with fractional
/// seconds, without and with a zone offset
pub const DEFAULT_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f%z"];

/// Format name selecting the RFC 3339 parser instead of a strftime pattern
pub const RFC3339_FORMAT: &str = "rfc3339";

/// Why a line could not be dated. Never fatal: the caller skips the line.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("no whitespace after the timestamp field")]
    MissingDelimiter,

    #[error("line is shorter than the {width}-character timestamp field")]
    TooShort { width: usize },

    #[error("'{token}' matches none of the timestamp formats")]
    NoMatchingFormat { token: String },
}

/// One candidate timestamp format
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimestampFormat {
    Rfc3339,
    Strftime(String),
}

impl TimestampFormat {
    pub fn new(format: &str) -> Self {
        if format.eq_ignore_ascii_case(RFC3339_FORMAT) {
            Self::Rfc3339
        } else {
            Self::Strftime(format.to_string())
        }
    }

    /// Parse a timestamp token, normalizing to UTC
    pub fn parse(&self, token: &str) -> Option<Timestamp> {
        match self {
            Self::Rfc3339 => DateTime::parse_from_rfc3339(token)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Self::Strftime(format) => parse_strftime(token, format),
        }
    }
}

/// strptime rules: date fields the format leaves out default to 1900-01-01,
/// time fields to zero. Results without an offset are taken to be UTC.
fn parse_strftime(token: &str, format: &str) -> Option<Timestamp> {
    let mut parsed = Parsed::new();
    format::parse(&mut parsed, token, StrftimeItems::new(format)).ok()?;

    // A Unix timestamp (%s) is complete on its own
    if parsed.timestamp().is_none() {
        fill_missing_fields(&mut parsed).ok()?;
    }

    match parsed.offset() {
        Some(_) => parsed.to_datetime().ok().map(|dt| dt.with_timezone(&Utc)),
        None => parsed
            .to_naive_datetime_with_offset(0)
            .ok()
            .map(|naive| naive.and_utc()),
    }
}

fn fill_missing_fields(parsed: &mut Parsed) -> ParseResult<()> {
    let has_year = parsed.year().is_some()
        || parsed.year_mod_100().is_some()
        || parsed.isoyear().is_some()
        || parsed.isoyear_mod_100().is_some();
    if !has_year {
        parsed.set_year(1900)?;
    }

    // Ordinal and week-based dates resolve without month and day
    let week_based = parsed.ordinal().is_some()
        || parsed.isoweek().is_some()
        || parsed.week_from_sun().is_some()
        || parsed.week_from_mon().is_some();
    if !week_based {
        if parsed.month().is_none() {
            parsed.set_month(1)?;
        }
        if parsed.day().is_none() {
            parsed.set_day(1)?;
        }
    }

    if parsed.hour_div_12().is_none() {
        match parsed.hour_mod_12() {
            None => parsed.set_hour(0)?,
            // %I without %p reads as AM
            Some(_) => parsed.set_ampm(false)?,
        }
    }
    if parsed.minute().is_none() {
        parsed.set_minute(0)?;
    }
    Ok(())
}

/// How the timestamp field is located in a line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExtractionMode {
    /// First whitespace-delimited token
    #[default]
    Delimited,

    /// Exactly the first N characters; the rest is the payload, unsplit
    FixedWidth(NonZeroUsize),
}

/// Extracts `(timestamp, payload)` from raw lines
#[derive(Clone, Debug)]
pub struct TimestampParser {
    formats: Vec<TimestampFormat>,
    mode: ExtractionMode,
}

impl Default for TimestampParser {
    fn default() -> Self {
        Self {
            formats: DEFAULT_FORMATS.iter().map(|f| TimestampFormat::new(f)).collect(),
            mode: ExtractionMode::Delimited,
        }
    }
}

impl TimestampParser {
    /// Build a parser from format strings (empty = defaults) and an optional
    /// fixed field width
    pub fn new(formats: &[String], date_width: Option<usize>) -> Result<Self, ConfigError> {
        let formats: Vec<TimestampFormat> = if formats.is_empty() {
            DEFAULT_FORMATS.iter().map(|f| TimestampFormat::new(f)).collect()
        } else {
            formats.iter().map(|f| TimestampFormat::new(f)).collect()
        };

        let mode = match date_width {
            None => ExtractionMode::Delimited,
            Some(width) => {
                let width = NonZeroUsize::new(width).ok_or(ConfigError::ZeroDateWidth)?;
                ExtractionMode::FixedWidth(width)
            }
        };

        Self::with_formats(formats, mode)
    }

    /// Build a parser from already-typed formats
    pub fn with_formats(
        formats: Vec<TimestampFormat>,
        mode: ExtractionMode,
    ) -> Result<Self, ConfigError> {
        if formats.is_empty() {
            return Err(ConfigError::NoTimestampFormats);
        }
        Ok(Self { formats, mode })
    }

    pub fn formats(&self) -> &[TimestampFormat] {
        &self.formats
    }

    pub fn mode(&self) -> ExtractionMode {
        self.mode
    }

    /// Parse one raw line into its timestamp and payload
    pub fn parse<'a>(&self, raw: &'a str) -> Result<(Timestamp, &'a str), ParseError> {
        let (token, payload) = self.split(raw)?;

        self.formats
            .iter()
            .find_map(|format| format.parse(token))
            .map(|ts| (ts, payload))
            .ok_or_else(|| ParseError::NoMatchingFormat {
                token: token.to_string(),
            })
    }

    /// Separate the timestamp field from the payload
    fn split<'a>(&self, raw: &'a str) -> Result<(&'a str, &'a str), ParseError> {
        match self.mode {
            ExtractionMode::Delimited => {
                let line = raw.trim_start();
                let end = line
                    .find(char::is_whitespace)
                    .ok_or(ParseError::MissingDelimiter)?;
                let (token, rest) = line.split_at(end);
                let payload = rest.trim_start();
                if payload.is_empty() {
                    return Err(ParseError::MissingDelimiter);
                }
                Ok((token, payload))
            }
            ExtractionMode::FixedWidth(width) => {
                let width = width.get();
                let end = char_boundary_after(raw, width).ok_or(ParseError::TooShort { width })?;
                Ok(raw.split_at(end))
            }
        }
    }
}

/// Byte index just past the `n`-th character, if the string has that many
fn char_boundary_after(s: &str, n: usize) -> Option<usize> {
    if n == 0 {
        return Some(0);
    }
    s.char_indices().map(|(i, c)| i + c.len_utf8()).nth(n - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_default_naive_timestamp_is_utc() {
        let parser = TimestampParser::default();
        let (ts, payload) = parser.parse("2020-01-01T00:04:00.000 info: y").unwrap();
        assert_eq!(ts, utc(2020, 1, 1, 0, 4, 0));
        assert_eq!(payload, "info: y");
    }

    #[test]
    fn test_default_zoned_timestamp_converted_to_utc() {
        let parser = TimestampParser::default();
        let (ts, payload) = parser
            .parse("2020-01-01T01:00:00.250+0100 error: z")
            .unwrap();
        assert_eq!(ts, utc(2020, 1, 1, 0, 0, 0) + chrono::TimeDelta::milliseconds(250));
        assert_eq!(payload, "error: z");
    }

    #[test]
    fn test_mixed_zones_compare() {
        let parser = TimestampParser::default();
        let (naive, _) = parser.parse("2020-01-01T00:30:00.0 a").unwrap();
        let (zoned, _) = parser.parse("2020-01-01T01:00:00.0+0100 b").unwrap();
        assert!(zoned < naive);
    }

    #[test]
    fn test_first_matching_format_wins() {
        let parser =
            TimestampParser::new(&["%d/%m/%Y".to_string(), "%m/%d/%Y".to_string()], None).unwrap();
        let (ts, _) = parser.parse("03/04/2020 x").unwrap();
        assert_eq!(ts, utc(2020, 4, 3, 0, 0, 0));

        let (ts, _) = parser.parse("13/04/2020 x").unwrap();
        assert_eq!(ts, utc(2020, 4, 13, 0, 0, 0));
        // day 4 of month 13 fails, the second format takes over
        let (ts, _) = parser.parse("04/13/2020 x").unwrap();
        assert_eq!(ts, utc(2020, 4, 13, 0, 0, 0));
    }

    #[test]
    fn test_time_only_format_defaults_date() {
        let parser = TimestampParser::new(&["%H:%M:%S".to_string()], None).unwrap();
        let (ts, payload) = parser.parse("12:00:01 hello").unwrap();
        assert_eq!(ts, utc(1900, 1, 1, 12, 0, 1));
        assert_eq!(payload, "hello");
    }

    #[test]
    fn test_hour_only_format_keeps_hour() {
        let parser = TimestampParser::new(&["%Y-%m-%d %H".to_string()], Some(13)).unwrap();
        let (ts, payload) = parser.parse("2020-01-01 17 hello").unwrap();
        assert_eq!(ts, utc(2020, 1, 1, 17, 0, 0));
        assert_eq!(payload, " hello");
    }

    #[test]
    fn test_partial_formats() {
        let parse = |format: &str, token: &str| {
            TimestampParser::new(&[format.to_string()], None)
                .unwrap()
                .parse(&format!("{token} x"))
                .map(|(ts, _)| ts)
        };
        assert_eq!(parse("%Y-%m", "2021-06"), Ok(utc(2021, 6, 1, 0, 0, 0)));
        assert_eq!(parse("%b%d-%H:%M", "Mar05-08:15"), Ok(utc(1900, 3, 5, 8, 15, 0)));
        assert_eq!(parse("%Y-%j", "2020-032"), Ok(utc(2020, 2, 1, 0, 0, 0)));
        assert_eq!(parse("%s", "1577836800"), Ok(utc(2020, 1, 1, 0, 0, 0)));
        assert_eq!(parse("%Y%m%d/%I:%M", "20200101/03:30"), Ok(utc(2020, 1, 1, 3, 30, 0)));
        assert!(parse("%H:%M:%S", "25:00:00").is_err());
    }

    #[test]
    fn test_no_matching_format() {
        let parser = TimestampParser::default();
        assert_eq!(
            parser.parse("yesterday something happened"),
            Err(ParseError::NoMatchingFormat {
                token: "yesterday".to_string()
            })
        );
    }

    #[test]
    fn test_delimited_requires_payload() {
        let parser = TimestampParser::default();
        assert_eq!(
            parser.parse("2020-01-01T00:00:00.000"),
            Err(ParseError::MissingDelimiter)
        );
        assert_eq!(
            parser.parse("2020-01-01T00:00:00.000   "),
            Err(ParseError::MissingDelimiter)
        );
    }

    #[test]
    fn test_delimited_split_skips_whitespace_runs() {
        let parser = TimestampParser::default();
        let (_, payload) = parser
            .parse("  2020-01-01T00:00:00.000 \t  spaced  payload")
            .unwrap();
        assert_eq!(payload, "spaced  payload");
    }

    #[test]
    fn test_fixed_width_keeps_payload_unsplit() {
        let parser =
            TimestampParser::new(&["%Y-%m-%d %H:%M:%S".to_string()], Some(19)).unwrap();
        assert_eq!(
            parser.mode(),
            ExtractionMode::FixedWidth(NonZeroUsize::new(19).unwrap())
        );
        let (ts, payload) = parser.parse("2020-01-01 12:00:00 | started").unwrap();
        assert_eq!(ts, utc(2020, 1, 1, 12, 0, 0));
        assert_eq!(payload, " | started");

        let (_, payload) = parser.parse("2020-01-01 12:00:00started").unwrap();
        assert_eq!(payload, "started");
    }

    #[test]
    fn test_fixed_width_too_short() {
        let parser = TimestampParser::new(&[], Some(30)).unwrap();
        assert_eq!(
            parser.parse("short"),
            Err(ParseError::TooShort { width: 30 })
        );
    }

    #[test]
    fn test_fixed_width_multibyte_no_panic() {
        let parser = TimestampParser::new(&["%Y-%m-%d".to_string()], Some(10)).unwrap();
        assert!(parser.parse("─────────────────").is_err());
        let (ts, payload) = parser.parse("2020-02-03╭──╮").unwrap();
        assert_eq!(ts, utc(2020, 2, 3, 0, 0, 0));
        assert_eq!(payload, "╭──╮");
    }

    #[test]
    fn test_rfc3339_format_name() {
        let parser = TimestampParser::new(&["RFC3339".to_string()], None).unwrap();
        let (ts, _) = parser.parse("2024-01-15T10:30:00Z some log message").unwrap();
        assert_eq!(ts, utc(2024, 1, 15, 10, 30, 0));
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            TimestampParser::new(&[], Some(0)),
            Err(ConfigError::ZeroDateWidth)
        ));
        assert!(matches!(
            TimestampParser::with_formats(Vec::new(), ExtractionMode::Delimited),
            Err(ConfigError::NoTimestampFormats)
        ));
    }
}
