//! Log file reading and iteration functionality.

use crate::entry::Entry;
use crate::error::{Error, Result};
use crate::parser::{Parser, StringParser};
use std::io::{BufRead, BufReader, Read};

/// A reader that parses log files line by line using a specified format.
///
/// The reader implements the Iterator trait, yielding one record per
/// non-blank physical line in file order. The underlying stream is consumed
/// as the iterator advances, so a reader cannot be restarted.
#[derive(Debug)]
pub struct Reader<R: Read> {
    /// The underlying buffered reader.
    reader: BufReader<R>,
    /// The parser for converting lines to entries.
    parser: Parser,
    /// 1-based number of the last physical line read.
    line_number: usize,
    buf: Vec<u8>,
}

impl<R: Read> Reader<R> {
    /// Create a new reader with the specified input source and format string.
    ///
    /// # Arguments
    ///
    /// * `input` - The input source (file, stdin, etc.)
    /// * `format` - The log format template (e.g., `$remote_addr [$time_local] "$request"`)
    ///
    /// # Returns
    ///
    /// A new reader instance, or an error if the template is invalid.
    ///
    /// # Example
    ///
    /// ```rust
    /// use logload::Reader;
    /// use std::io::Cursor;
    ///
    /// let log_data = r#"127.0.0.1 [08/Nov/2013:13:39:18 +0000] "GET /api/foo HTTP/1.1""#;
    /// let format = r#"$remote_addr [$time_local] "$request""#;
    ///
    /// let mut reader = Reader::new(Cursor::new(log_data), format)?;
    /// let entry = reader.read().unwrap()?;
    /// assert_eq!(entry.field("request")?, "GET /api/foo HTTP/1.1");
    /// assert!(reader.read().is_none());
    /// # Ok::<(), logload::Error>(())
    /// ```
    pub fn new(input: R, format: &str) -> Result<Self> {
        let parser = Parser::new(format)?;
        Ok(Self::with_parser(input, parser))
    }

    /// Create a new reader with a pre-configured parser.
    ///
    /// # Arguments
    ///
    /// * `input` - The input source
    /// * `parser` - The parser to use for converting lines to entries
    pub fn with_parser(input: R, parser: Parser) -> Self {
        Self {
            reader: BufReader::new(input),
            parser,
            line_number: 0,
            buf: Vec::new(),
        }
    }

    /// Get a reference to the underlying parser.
    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    /// The 1-based line number of the most recently read line, or 0 before
    /// the first read.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Read the next entry from the log file.
    ///
    /// Bytes that are not valid UTF-8 are replaced with U+FFFD, so a stray
    /// byte affects only the line it sits on.
    ///
    /// # Returns
    ///
    /// An `Option<Result<Entry>>` where:
    /// - `None` indicates end of input
    /// - `Some(Ok(entry))` indicates a successfully parsed line
    /// - `Some(Err(error))` indicates a parsing or I/O error
    ///
    /// A parse failure does not poison the reader; the next call moves on
    /// to the following line.
    pub fn read(&mut self) -> Option<Result<Entry>> {
        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_number += 1;
                    let text = String::from_utf8_lossy(&self.buf);
                    let line = text
                        .strip_suffix('\n')
                        .map(|l| l.strip_suffix('\r').unwrap_or(l))
                        .unwrap_or(text.as_ref());

                    if line.trim().is_empty() {
                        continue;
                    }

                    return Some(self.parser.parse_string(line));
                }
                Err(e) => return Some(Err(Error::Io { source: e })),
            }
        }
    }

    /// Collect all entries into a vector, stopping at the first error.
    ///
    /// # Returns
    ///
    /// A vector of all entries, or the first error wrapped in
    /// [`Error::AtLine`].
    pub fn collect_all(mut self) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();

        while let Some(result) = self.read() {
            entries.push(result.map_err(|e| Error::at_line(self.line_number, e))?);
        }

        Ok(entries)
    }
}

impl<R: Read> Iterator for Reader<R> {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const FORMAT: &str = r#"$remote_addr [$time_local] "$request" $status $body_bytes_sent"#;

    #[test]
    fn test_reader_basic() {
        let log_data = r#"127.0.0.1 [08/Nov/2013:13:39:18 +0000] "GET /api/foo HTTP/1.1" 200 612"#;

        let mut reader = Reader::new(Cursor::new(log_data), FORMAT).unwrap();

        let entry = reader.read().unwrap().unwrap();
        assert_eq!(entry.field("remote_addr").unwrap(), "127.0.0.1");
        assert_eq!(entry.field("status").unwrap(), "200");
        assert_eq!(reader.line_number(), 1);

        // Should be EOF now
        assert!(reader.read().is_none());
    }

    #[test]
    fn test_reader_crlf_and_empty_lines() {
        let log_data = "127.0.0.1 [08/Nov/2013:13:39:18 +0000] \"GET /api/foo HTTP/1.1\" 200 612\r\n\
                        \r\n\
                        192.168.1.1 [08/Nov/2013:13:40:18 +0000] \"POST /api/bar HTTP/1.1\" 404 0\n";

        let mut reader = Reader::new(Cursor::new(log_data), FORMAT).unwrap();
        assert_eq!(
            reader.read().unwrap().unwrap().field("body_bytes_sent").unwrap(),
            "612"
        );
        let second = reader.read().unwrap().unwrap();
        assert_eq!(second.field("remote_addr").unwrap(), "192.168.1.1");
        // The blank line still counts as a physical line.
        assert_eq!(reader.line_number(), 3);
        assert!(reader.read().is_none());
    }

    #[test]
    fn test_reader_continues_after_bad_line() {
        let log_data = "garbage\n127.0.0.1 [08/Nov/2013:13:39:18 +0000] \"GET / HTTP/1.1\" 200 1\n";
        let reader = Reader::new(Cursor::new(log_data), FORMAT).unwrap();

        let results: Vec<_> = reader.collect();
        assert_eq!(results.len(), 2);
        assert!(matches!(results[0], Err(Error::Parse { .. })));
        assert!(results[1].is_ok());
    }

    #[test]
    fn test_invalid_utf8_is_replaced_and_counted() {
        let mut log_data = b"127.0.0.1 [08/Nov/2013:13:39:18 +0000] \"GET /caf".to_vec();
        log_data.extend_from_slice(&[0xe9]);
        log_data.extend_from_slice(b" HTTP/1.1\" 200 1\n");
        log_data.extend_from_slice(b"\xff\xfe\n");

        let mut reader = Reader::new(Cursor::new(log_data), FORMAT).unwrap();
        let entry = reader.read().unwrap().unwrap();
        assert_eq!(entry.field("request").unwrap(), "GET /caf\u{FFFD} HTTP/1.1");
        assert_eq!(reader.line_number(), 1);

        // Undecodable garbage is a record-level parse error on its own line.
        let err = reader.read().unwrap().unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert_eq!(reader.line_number(), 2);
        assert!(reader.read().is_none());
    }

    #[test]
    fn test_collect_all_reports_line() {
        let log_data = "127.0.0.1 [08/Nov/2013:13:39:18 +0000] \"GET / HTTP/1.1\" 200 1\nbroken\n";
        let reader = Reader::new(Cursor::new(log_data), FORMAT).unwrap();

        let err = reader.collect_all().unwrap_err();
        assert!(matches!(err, Error::AtLine { line_number: 2, .. }));
        assert!(matches!(err.root(), Error::Parse { .. }));
    }
}
