//! Stripping syslog-style prefixes from raw access logs.
//!
//! Logs shipped through syslog arrive as
//! `Oct 10 13:55:36 web-1 nginx: 10.0.0.1 - - [10/Oct/2023:13:55:36 -0700] ...`.
//! The cleaner drops everything up to and including the first `": "` that
//! follows a non-digit, leaving the access log line itself.

use crate::error::{Error, Result};
use crate::sink::parent_dir;
use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::OnceLock;
use tempfile::NamedTempFile;

fn prefix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^.*?[^\d]: ").expect("prefix pattern is valid"))
}

/// Remove a leading `<tag>: ` prefix, if any.
///
/// ```rust
/// use logload::clean::strip_prefix;
///
/// assert_eq!(
///     strip_prefix("Oct 10 13:55:36 web-1 nginx: 10.0.0.1 - - [...]"),
///     "10.0.0.1 - - [...]"
/// );
/// assert_eq!(strip_prefix("no prefix here"), "no prefix here");
/// ```
pub fn strip_prefix(line: &str) -> &str {
    match prefix_pattern().find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    }
}

/// Copy `input` to `output` line by line with prefixes stripped.
/// Returns the number of lines written.
pub fn clean<R: Read, W: Write>(input: R, output: W) -> Result<usize> {
    let reader = BufReader::new(input);
    let mut writer = BufWriter::new(output);
    let mut count = 0;

    for line in reader.lines() {
        writeln!(writer, "{}", strip_prefix(&line?))?;
        count += 1;
    }

    writer.flush()?;
    Ok(count)
}

/// Clean the file at `input` into `output`.
///
/// `output` only appears once every line has been written.
pub fn clean_file(input: &Path, output: &Path) -> Result<usize> {
    let source = File::open(input)?;
    let staged = NamedTempFile::new_in(parent_dir(output))?;

    let count = clean(source, staged.as_file())?;
    staged.persist(output).map_err(|e| Error::from(e.error))?;
    Ok(count)
}
