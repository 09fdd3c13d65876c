use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use eventscope_types::{DatedLine, Diagnostic, LineOrigin};

use crate::error::LoadError;
use crate::parser::TimestampParser;

/// One undated input line with its terminator removed
#[derive(Clone, Debug, PartialEq)]
pub struct RawLine {
    pub text: String,
    pub origin: LineOrigin,
}

/// Result of dating a batch of raw lines
#[derive(Clone, Debug, Default)]
pub struct DatedLines {
    /// Lines that carried a timestamp, in read order
    pub lines: Vec<DatedLine>,

    /// One `UnparsableTimestamp` per dropped non-blank line
    pub diagnostics: Vec<Diagnostic>,
}

/// Reads input sources in order and concatenates their lines
#[derive(Clone, Debug)]
pub struct LineLoader {
    sources: Vec<PathBuf>,
}

impl LineLoader {
    /// Create a loader over an ordered, non-empty list of files
    pub fn new(sources: Vec<PathBuf>) -> Result<Self, LoadError> {
        if sources.is_empty() {
            return Err(LoadError::NoInputs);
        }
        Ok(Self { sources })
    }

    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Read every source, file order then line order. The first unreadable
    /// source aborts the whole load.
    pub fn load(&self) -> Result<Vec<RawLine>, LoadError> {
        let mut lines = Vec::new();
        for path in &self.sources {
            let mut source_lines = Self::read_source(path)?;
            tracing::info!("Loaded {} lines from {}", source_lines.len(), path.display());
            lines.append(&mut source_lines);
        }
        Ok(lines)
    }

    /// Load and date in one step
    pub fn load_dated(&self, parser: &TimestampParser) -> Result<DatedLines, LoadError> {
        Ok(date_lines(self.load()?, parser))
    }

    /// Read a single file into raw lines
    pub fn read_source(path: &Path) -> Result<Vec<RawLine>, LoadError> {
        let read_error = |source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        };

        let mut file = File::open(path).map_err(read_error)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer).map_err(read_error)?;

        // Invalid UTF-8 is replaced rather than rejected
        let content = String::from_utf8_lossy(&buffer);
        let source: Arc<str> = Arc::from(path.display().to_string());
        Ok(split_lines(&source, &content))
    }
}

/// Split text into lines, stripping trailing CR/LF and numbering from 1
pub fn split_lines(source: &Arc<str>, content: &str) -> Vec<RawLine> {
    content
        .lines()
        .enumerate()
        .map(|(idx, line)| RawLine {
            text: line.trim_end_matches(['\r', '\n']).to_string(),
            origin: LineOrigin::new(Arc::clone(source), idx as u64 + 1),
        })
        .collect()
}

/// Parse the timestamp of every line, keeping only dated lines in read order.
///
/// Blank lines are dropped without a diagnostic.
pub fn date_lines(raw_lines: Vec<RawLine>, parser: &TimestampParser) -> DatedLines {
    let mut dated = DatedLines::default();

    for RawLine { text, origin } in raw_lines {
        if text.trim().is_empty() {
            continue;
        }

        match parser.parse(&text) {
            Ok((timestamp, payload)) => {
                let payload = payload.to_string();
                dated
                    .lines
                    .push(DatedLine::new(timestamp, payload, text, origin));
            }
            Err(e) => {
                tracing::debug!("{origin}: skipped ({e}): {text}");
                dated
                    .diagnostics
                    .push(Diagnostic::UnparsableTimestamp { origin, raw: text });
            }
        }
    }

    tracing::debug!(
        "Dated {} lines, skipped {}",
        dated.lines.len(),
        dated.diagnostics.len()
    );
    dated
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn source() -> Arc<str> {
        Arc::from("test.log")
    }

    #[test]
    fn test_split_lines_strips_terminators() {
        let lines = split_lines(&source(), "a\r\nb\nc\r");
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
        assert_eq!(lines[2].origin.line_number, 3);
        assert_eq!(&*lines[0].origin.source, "test.log");
    }

    #[test]
    fn test_split_lines_keeps_trailing_spaces() {
        let lines = split_lines(&source(), "x  \n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "x  ");
    }

    #[test]
    fn test_date_lines_skips_bad_lines_in_order() {
        let raw = split_lines(
            &source(),
            "2020-01-01T00:00:02.000 second\n\
             garbage line\n\
             \n\
             2020-01-01T00:00:01.000 first\n",
        );
        let dated = date_lines(raw, &TimestampParser::default());

        let payloads: Vec<&str> = dated.lines.iter().map(|l| l.payload.as_str()).collect();
        // read order is preserved, not timestamp order
        assert_eq!(payloads, vec!["second", "first"]);
        assert_eq!(dated.diagnostics.len(), 1);
        assert_eq!(dated.diagnostics[0].origin().line_number, 2);
        assert_eq!(dated.lines[1].raw, "2020-01-01T00:00:01.000 first");
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let loader = LineLoader::new(vec![PathBuf::from("/nonexistent/eventscope.log")]).unwrap();
        assert_eq!(loader.sources().len(), 1);
        let err = loader.load().unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/eventscope.log"));
    }

    #[test]
    fn test_no_inputs() {
        assert!(matches!(LineLoader::new(Vec::new()), Err(LoadError::NoInputs)));
    }

    #[test]
    fn test_read_source_lossy_utf8() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"2020-01-01T00:00:00.000 caf\xe9\n").unwrap();

        let lines = LineLoader::read_source(file.path()).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].text.ends_with("caf\u{FFFD}"));
    }
}
