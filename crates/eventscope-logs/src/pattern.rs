use regex::{Regex, RegexBuilder};

use crate::error::ConfigError;

/// How pattern text is turned into a matcher
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatternOptions {
    /// Match the text as a plain substring instead of a regular expression
    pub literal: bool,

    /// Case-insensitive matching
    pub case_insensitive: bool,
}

/// Outcome of extracting the first capture group from a payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Capture<'a> {
    /// The pattern did not match at all
    NoMatch,

    /// The pattern matched but the first group did not participate
    Empty,

    /// Text of the first group
    Text(&'a str),
}

/// Compiled search pattern for log payloads
#[derive(Clone)]
pub struct Pattern {
    /// Compiled regex
    regex: Regex,

    /// Original pattern string, used as the series name
    pattern: String,

    /// Options it was compiled with
    options: PatternOptions,
}

impl Pattern {
    /// Compile a pattern. Literal patterns are escaped, so substring search
    /// is just a regex search with no metacharacters.
    pub fn new(pattern: &str, options: PatternOptions) -> Result<Self, ConfigError> {
        let source = if options.literal {
            regex::escape(pattern)
        } else {
            pattern.to_string()
        };

        let regex = RegexBuilder::new(&source)
            .case_insensitive(options.case_insensitive)
            .build()
            .map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;

        Ok(Self {
            regex,
            pattern: pattern.to_string(),
            options,
        })
    }

    /// Compile a value pattern, which must have at least one capture group
    pub fn with_capture(pattern: &str, options: PatternOptions) -> Result<Self, ConfigError> {
        let compiled = Self::new(pattern, options)?;
        // captures_len() counts the implicit whole-match group
        if compiled.regex.captures_len() < 2 {
            return Err(ConfigError::MissingCaptureGroup {
                pattern: pattern.to_string(),
            });
        }
        Ok(compiled)
    }

    /// Search anywhere in the payload
    pub fn is_match(&self, payload: &str) -> bool {
        self.regex.is_match(payload)
    }

    /// Text of the first capture group of the leftmost match
    pub fn first_capture<'a>(&self, payload: &'a str) -> Capture<'a> {
        match self.regex.captures(payload) {
            None => Capture::NoMatch,
            Some(caps) => match caps.get(1) {
                Some(m) => Capture::Text(m.as_str()),
                None => Capture::Empty,
            },
        }
    }

    /// Get the original pattern
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl std::fmt::Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pattern")
            .field("pattern", &self.pattern)
            .field("literal", &self.options.literal)
            .field("case_insensitive", &self.options.case_insensitive)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_search_anywhere() {
        let pattern = Pattern::new("err(or)?", PatternOptions::default()).unwrap();
        assert!(pattern.is_match("an error occurred"));
        assert!(pattern.is_match("err: disk"));
        assert!(!pattern.is_match("everything is fine"));
    }

    #[test]
    fn test_literal_pattern_escapes_metacharacters() {
        let options = PatternOptions {
            literal: true,
            ..Default::default()
        };
        let pattern = Pattern::new("a.b[1]", options).unwrap();
        assert!(pattern.is_match("x a.b[1] y"));
        assert!(!pattern.is_match("axb1"));
        assert_eq!(pattern.pattern(), "a.b[1]");
    }

    #[test]
    fn test_case_insensitive() {
        let options = PatternOptions {
            case_insensitive: true,
            ..Default::default()
        };
        let pattern = Pattern::new("warning", options).unwrap();
        assert!(pattern.is_match("WARNING: low disk"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Pattern::new("(unclosed", PatternOptions::default()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { ref pattern, .. } if pattern == "(unclosed"));
    }

    #[test]
    fn test_value_pattern_requires_group() {
        assert!(matches!(
            Pattern::with_capture("size: [0-9]+", PatternOptions::default()),
            Err(ConfigError::MissingCaptureGroup { .. })
        ));
        assert!(Pattern::with_capture("size: ([0-9]+)", PatternOptions::default()).is_ok());
    }

    #[test]
    fn test_first_capture() {
        let pattern = Pattern::with_capture("size: ([0-9]+)?x", PatternOptions::default()).unwrap();
        assert_eq!(pattern.first_capture("size: 42x"), Capture::Text("42"));
        assert_eq!(pattern.first_capture("size: x"), Capture::Empty);
        assert_eq!(pattern.first_capture("nothing"), Capture::NoMatch);
    }
}
