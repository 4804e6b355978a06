//! Format template compilation and line matching.

use crate::entry::Entry;
use crate::error::{Error, Mismatch, Result};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Trait for parsing log lines into entries.
pub trait StringParser {
    /// Parse a log line into an entry.
    ///
    /// # Arguments
    ///
    /// * `line` - One log line without its line terminator
    ///
    /// # Returns
    ///
    /// The extracted fields, or [`Error::Parse`] with the reason the line
    /// does not match.
    fn parse_string(&self, line: &str) -> Result<Entry>;
}

/// One placeholder of a compiled template together with the literal that
/// closes it. An empty delimiter means the field ends the template.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    field: String,
    delimiter: String,
    /// Wrapped in `"..."` or `[...]`, so the value may contain whitespace.
    enclosed: bool,
}

/// The closing character for a placeholder whose preceding literal ends in
/// an opening quote or bracket.
fn closer_for(literal: &str) -> Option<char> {
    match literal.chars().last() {
        Some('"') => Some('"'),
        Some('[') => Some(']'),
        _ => None,
    }
}

/// A parser compiled from a log format template.
///
/// The template is split once into a leading literal followed by an ordered
/// list of `(placeholder, literal)` segments. Matching a line walks the
/// segments left to right: every literal is an anchor that must appear
/// verbatim. A placeholder enclosed in quotes or brackets receives the
/// shortest span up to its anchor, which makes `"$request"` stop at the
/// closing quote and `[$time_local]` at the closing bracket. Any other
/// placeholder stops at the first whitespace, and its anchor must follow
/// right there.
#[derive(Debug, Clone)]
pub struct Parser {
    /// The original format string.
    format: String,
    /// Literal text before the first placeholder.
    leading: String,
    segments: Vec<Segment>,
    /// Fields that fail the parse when extracted empty.
    non_empty: HashSet<String>,
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$(\w+)").expect("placeholder pattern is valid"))
}

impl Parser {
    /// Create a new parser from a format string.
    ///
    /// Format strings use `$field_name` syntax to define extractable fields.
    /// Adjacent placeholders must be separated by at least one literal
    /// character, and each name may appear only once.
    ///
    /// # Arguments
    ///
    /// * `format` - The format template (e.g., `$remote_addr [$time_local]`)
    ///
    /// # Returns
    ///
    /// A compiled parser, or [`Error::InvalidFormat`] if the template cannot
    /// be matched unambiguously.
    ///
    /// # Example
    ///
    /// ```rust
    /// use logload::Parser;
    ///
    /// let parser = Parser::new(r#"$remote_addr [$time_local] "$request" $status"#)?;
    /// assert_eq!(parser.fields().count(), 4);
    /// # Ok::<(), logload::Error>(())
    /// ```
    pub fn new(format: &str) -> Result<Self> {
        let mut leading = None;
        let mut segments: Vec<Segment> = Vec::new();
        let mut closers = Vec::new();
        let mut seen = HashSet::new();
        let mut last_end = 0;

        for captures in placeholder_pattern().captures_iter(format) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let literal = &format[last_end..whole.start()];

            match segments.last_mut() {
                None => leading = Some(literal.to_string()),
                Some(previous) => {
                    if literal.is_empty() {
                        return Err(Error::invalid_format(
                            format,
                            format!(
                                "placeholders '${}' and '${}' have no literal between them",
                                previous.field,
                                name.as_str()
                            ),
                        ));
                    }
                    previous.delimiter = literal.to_string();
                }
            }

            if !seen.insert(name.as_str()) {
                return Err(Error::invalid_format(
                    format,
                    format!("placeholder '${}' appears more than once", name.as_str()),
                ));
            }

            closers.push(closer_for(literal));
            segments.push(Segment {
                field: name.as_str().to_string(),
                delimiter: String::new(),
                enclosed: false,
            });
            last_end = whole.end();
        }

        let trailing = &format[last_end..];
        let leading = match segments.last_mut() {
            Some(last) => {
                last.delimiter = trailing.to_string();
                leading.unwrap_or_default()
            }
            // A template with no placeholders matches only its own text.
            None => trailing.to_string(),
        };

        for (segment, closer) in segments.iter_mut().zip(closers) {
            segment.enclosed = closer.is_some_and(|c| segment.delimiter.starts_with(c));
        }

        Ok(Self {
            format: format.to_string(),
            leading,
            segments,
            non_empty: HashSet::new(),
        })
    }

    /// Mark fields that must not be extracted empty.
    ///
    /// # Arguments
    ///
    /// * `fields` - Field names; names not present in the template are ignored
    ///
    /// # Returns
    ///
    /// The parser, for chaining after [`Parser::new`].
    pub fn require_non_empty<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.non_empty
            .extend(fields.into_iter().map(|f| f.as_ref().to_string()));
        self
    }

    /// Get the original format string.
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Placeholder names in template order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|s| s.field.as_str())
    }

    /// Whether the template declares a placeholder with this name.
    ///
    /// # Arguments
    ///
    /// * `name` - The placeholder name without the leading `$`
    pub fn has_field(&self, name: &str) -> bool {
        self.segments.iter().any(|s| s.field == name)
    }
}

impl StringParser for Parser {
    fn parse_string(&self, line: &str) -> Result<Entry> {
        let mismatch = |reason| Error::parse(line, reason);

        let mut rest = line.strip_prefix(self.leading.as_str()).ok_or_else(|| {
            mismatch(Mismatch::MissingLiteral {
                expected: self.leading.clone(),
                offset: 0,
            })
        })?;

        let mut fields = HashMap::with_capacity(self.segments.len());

        for segment in &self.segments {
            let (value, after) = if !segment.enclosed {
                let mut end = rest.find(char::is_whitespace).unwrap_or(rest.len());
                if !segment.delimiter.is_empty() {
                    if let Some(anchor) = rest[..end].find(segment.delimiter.as_str()) {
                        end = anchor;
                    }
                }
                let after = rest[end..]
                    .strip_prefix(segment.delimiter.as_str())
                    .ok_or_else(|| {
                        mismatch(Mismatch::MissingLiteral {
                            expected: segment.delimiter.clone(),
                            offset: line.len() - rest.len() + end,
                        })
                    })?;
                (&rest[..end], after)
            } else {
                let end = rest.find(segment.delimiter.as_str()).ok_or_else(|| {
                    mismatch(Mismatch::UnterminatedField {
                        field: segment.field.clone(),
                        delimiter: segment.delimiter.clone(),
                    })
                })?;
                (&rest[..end], &rest[end + segment.delimiter.len()..])
            };

            if value.is_empty() && self.non_empty.contains(&segment.field) {
                return Err(mismatch(Mismatch::EmptyField {
                    field: segment.field.clone(),
                }));
            }

            fields.insert(segment.field.clone(), value.to_string());
            rest = after;
        }

        if !rest.is_empty() {
            return Err(mismatch(Mismatch::TrailingInput {
                offset: line.len() - rest.len(),
            }));
        }

        Ok(Entry::from_fields(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMBINED: &str = r#"$remote_addr - $remote_user [$time_local] "$request" $status $body_bytes_sent "$http_referer" "$http_user_agent""#;

    fn reason(err: Error) -> Mismatch {
        match err {
            Error::Parse { reason, .. } => reason,
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_compiles_segments() {
        let parser = Parser::new(COMBINED).unwrap();
        assert_eq!(parser.leading, "");
        let fields: Vec<_> = parser.fields().collect();
        assert_eq!(
            fields,
            [
                "remote_addr",
                "remote_user",
                "time_local",
                "request",
                "status",
                "body_bytes_sent",
                "http_referer",
                "http_user_agent"
            ]
        );
        assert_eq!(parser.segments[0].delimiter, " - ");
        assert_eq!(parser.segments[2].delimiter, "] \"");
        assert_eq!(parser.segments[7].delimiter, "\"");
    }

    #[test]
    fn test_leading_literal() {
        let parser = Parser::new(r#"[$level] "$message""#).unwrap();
        let entry = parser.parse_string(r#"[warn] "disk almost full""#).unwrap();
        assert_eq!(entry.field("level").unwrap(), "warn");
        assert_eq!(entry.field("message").unwrap(), "disk almost full");

        let err = parser.parse_string("warn disk").unwrap_err();
        assert!(matches!(reason(err), Mismatch::MissingLiteral { offset: 0, .. }));
    }

    #[test]
    fn test_quoted_field_takes_shortest_span() {
        let parser = Parser::new(COMBINED).unwrap();
        let line = r#"10.0.0.1 - - [10/Oct/2023:13:55:36 -0700] "GET /index.html HTTP/1.1" 200 2326 "-" "Mozilla/5.0 (X11; Linux x86_64)""#;
        let entry = parser.parse_string(line).unwrap();
        assert_eq!(entry.field("time_local").unwrap(), "10/Oct/2023:13:55:36 -0700");
        assert_eq!(entry.field("request").unwrap(), "GET /index.html HTTP/1.1");
        assert_eq!(entry.field("http_referer").unwrap(), "-");
        assert_eq!(
            entry.field("http_user_agent").unwrap(),
            "Mozilla/5.0 (X11; Linux x86_64)"
        );
        assert_eq!(entry.len(), 8);
    }

    #[test]
    fn test_unclosed_quote_is_unterminated() {
        let parser = Parser::new(COMBINED).unwrap();
        let line = r#"10.0.0.1 - - [10/Oct/2023:13:55:36 -0700] "GET / HTTP/1.1" 200 2326 "-" "curl/7.68.0"#;
        let err = parser.parse_string(line).unwrap_err();
        assert_eq!(
            reason(err),
            Mismatch::UnterminatedField {
                field: "http_user_agent".to_string(),
                delimiter: "\"".to_string(),
            }
        );
    }

    #[test]
    fn test_unclosed_bracket_is_unterminated() {
        let parser = Parser::new(COMBINED).unwrap();
        let line = r#"10.0.0.1 - - [10/Oct/2023:13:55:36 -0700 "GET / HTTP/1.1" 200 1 "-" "x""#;
        let err = parser.parse_string(line).unwrap_err();
        assert!(matches!(
            reason(err),
            Mismatch::UnterminatedField { field, .. } if field == "time_local"
        ));
    }

    #[test]
    fn test_trailing_input_rejected() {
        let parser = Parser::new(r#"$status "$agent""#).unwrap();
        let err = parser.parse_string(r#"200 "curl" extra"#).unwrap_err();
        assert_eq!(reason(err), Mismatch::TrailingInput { offset: 10 });
    }

    #[test]
    fn test_last_unquoted_field_stops_at_whitespace() {
        let parser = Parser::new("$remote_addr $message").unwrap();
        let entry = parser.parse_string("10.0.0.1 hello").unwrap();
        assert_eq!(entry.field("message").unwrap(), "hello");

        let err = parser.parse_string("10.0.0.1 hello there").unwrap_err();
        assert_eq!(reason(err), Mismatch::TrailingInput { offset: 14 });
    }

    #[test]
    fn test_unquoted_fields_do_not_swallow_spaces() {
        let parser = Parser::new(COMBINED).unwrap();

        let err = parser
            .parse_string(r#"10.0.0.1 10.0.0.2 - - [10/Oct/2023:13:55:36 -0700] "GET / HTTP/1.1" 200 1 "-" "x""#)
            .unwrap_err();
        assert_eq!(
            reason(err),
            Mismatch::MissingLiteral {
                expected: " - ".to_string(),
                offset: 8
            }
        );

        let err = parser
            .parse_string(r#"10.0.0.1 - john doe [10/Oct/2023:13:55:36 -0700] "GET / HTTP/1.1" 200 1 "-" "x""#)
            .unwrap_err();
        assert!(matches!(
            reason(err),
            Mismatch::MissingLiteral { expected, offset: 15 } if expected == " ["
        ));

        let err = parser
            .parse_string(r#"10.0.0.1 - - [10/Oct/2023:13:55:36 -0700] "GET / HTTP/1.1" 200 1 extra "-" "x""#)
            .unwrap_err();
        assert!(matches!(
            reason(err),
            Mismatch::MissingLiteral { expected, .. } if expected == " \""
        ));
    }

    #[test]
    fn test_unquoted_field_stops_at_non_space_anchor() {
        let parser = Parser::new("$host:$port $path").unwrap();
        let entry = parser.parse_string("example.com:8080 /index").unwrap();
        assert_eq!(entry.field("host").unwrap(), "example.com");
        assert_eq!(entry.field("port").unwrap(), "8080");
        assert_eq!(entry.field("path").unwrap(), "/index");
    }

    #[test]
    fn test_enclosure_detection() {
        let parser = Parser::new(COMBINED).unwrap();
        let enclosed: Vec<_> = parser.segments.iter().map(|s| s.enclosed).collect();
        assert_eq!(enclosed, [false, false, true, true, false, false, true, true]);
    }

    #[test]
    fn test_required_fields_reject_empty_values() {
        let parser = Parser::new(r#"$status "$referer""#)
            .unwrap()
            .require_non_empty(["status"]);

        let entry = parser.parse_string(r#"200 """#).unwrap();
        assert_eq!(entry.field("referer").unwrap(), "");

        let err = parser.parse_string(r#" "x""#).unwrap_err();
        assert_eq!(
            reason(err),
            Mismatch::EmptyField {
                field: "status".to_string()
            }
        );
    }

    #[test]
    fn test_adjacent_placeholders_rejected() {
        let err = Parser::new("$host$request_uri $status").unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { .. }));
    }

    #[test]
    fn test_duplicate_placeholder_rejected() {
        let err = Parser::new("$a $b $a").unwrap_err();
        assert!(matches!(err, Error::InvalidFormat { message, .. } if message.contains("$a")));
    }

    #[test]
    fn test_template_without_placeholders() {
        let parser = Parser::new("-- MARK --").unwrap();
        assert!(parser.parse_string("-- MARK --").unwrap().is_empty());
        assert!(parser.parse_string("-- MARK").is_err());
    }
}
