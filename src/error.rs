//! Error types for the logload library.

use std::fmt;
use thiserror::Error;

/// Result type alias for logload operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a log line failed to match its format template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// A literal anchor from the template was not found where expected.
    MissingLiteral { expected: String, offset: usize },
    /// The line ended before the literal closing a field was found
    /// (unmatched quote or bracket, truncated line).
    UnterminatedField { field: String, delimiter: String },
    /// Text remained after the last segment of the template.
    TrailingInput { offset: usize },
    /// A field that must carry a value was extracted empty.
    EmptyField { field: String },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingLiteral { expected, offset } => {
                write!(f, "expected {:?} at byte {}", expected, offset)
            }
            Self::UnterminatedField { field, delimiter } => {
                write!(f, "field '{}' is not terminated by {:?}", field, delimiter)
            }
            Self::TrailingInput { offset } => write!(f, "unexpected input at byte {}", offset),
            Self::EmptyField { field } => write!(f, "field '{}' is empty", field),
        }
    }
}

/// Error types that can occur during log parsing, normalization and export.
#[derive(Error, Debug)]
pub enum Error {
    /// A log line doesn't match the format template.
    #[error("log line '{line}' does not match format: {reason}")]
    Parse { line: String, reason: Mismatch },

    /// A field expected by the normalizer is absent from the record.
    #[error("field '{field}' not found")]
    FieldNotFound { field: String },

    /// `time_local` does not follow `dd/Mon/yyyy:HH:MM:SS`.
    #[error("time_local value '{value}' is not a valid timestamp: {reason}")]
    TimestampFormat { value: String, reason: String },

    /// A numeric field cannot be parsed as its integer type.
    #[error("field '{field}' with value '{value}' cannot be parsed as {target_type}: {source}")]
    NumericFormat {
        field: String,
        value: String,
        target_type: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },

    /// A record-level error annotated with the input line it came from.
    #[error("line {line_number}: {source}")]
    AtLine {
        line_number: usize,
        #[source]
        source: Box<Error>,
    },

    /// The format template itself is malformed.
    #[error("invalid format string '{format}': {message}")]
    InvalidFormat { format: String, message: String },

    /// A log format is not found in nginx configuration.
    #[error("log format '{format_name}' not found in nginx configuration")]
    NginxFormatNotFound { format_name: String },

    /// IO error when reading logs, writing output or loading configuration.
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// CSV serialization error.
    #[error("CSV error: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    /// Transport error talking to ClickHouse.
    #[error("HTTP error: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    /// ClickHouse answered with a non-success status.
    #[error("ClickHouse returned {status}: {body}")]
    ClickHouse { status: u16, body: String },

    /// Configuration file could not be parsed.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl Error {
    /// Create a new parse error for a line that failed to match.
    pub fn parse(line: impl Into<String>, reason: Mismatch) -> Self {
        Self::Parse {
            line: line.into(),
            reason,
        }
    }

    /// Create a new field not found error.
    pub fn field_not_found(field: impl Into<String>) -> Self {
        Self::FieldNotFound {
            field: field.into(),
        }
    }

    /// Create a new timestamp format error.
    pub fn timestamp_format(value: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::TimestampFormat {
            value: value.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a new numeric format error.
    pub fn numeric_format(
        field: impl Into<String>,
        value: impl Into<String>,
        target_type: &'static str,
        source: std::num::ParseIntError,
    ) -> Self {
        Self::NumericFormat {
            field: field.into(),
            value: value.into(),
            target_type,
            source,
        }
    }

    /// Attach the input line number to a record-level error.
    pub fn at_line(line_number: usize, source: Error) -> Self {
        Self::AtLine {
            line_number,
            source: Box::new(source),
        }
    }

    /// Create a new invalid format error.
    pub fn invalid_format(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Create a new nginx format not found error.
    pub fn nginx_format_not_found(format_name: impl Into<String>) -> Self {
        Self::NginxFormatNotFound {
            format_name: format_name.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// The underlying error with any line annotation removed.
    pub fn root(&self) -> &Error {
        match self {
            Self::AtLine { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error is about one record's content rather than the
    /// environment or the template. Only these may be skipped.
    pub fn is_record_error(&self) -> bool {
        matches!(
            self.root(),
            Self::Parse { .. } | Self::TimestampFormat { .. } | Self::NumericFormat { .. }
        )
    }
}
