//! Destinations for normalized rows.

use crate::error::{Error, Result};
use crate::row::{AccessLogRow, COLUMNS};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// A destination that accepts rows and commits them once.
///
/// Nothing written to a sink is considered durable until [`finish`](Self::finish)
/// returns successfully. Dropping a sink without finishing it discards
/// everything written so far.
pub trait RowSink {
    /// Append one row.
    fn write_row(&mut self, row: &AccessLogRow) -> Result<()>;

    /// Commit every row written so far.
    fn finish(self) -> Result<()>
    where
        Self: Sized;
}

/// Writes rows as CSV with a header line to any writer.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> CsvSink<W> {
    /// Create a sink and write the header row.
    pub fn new(inner: W) -> Result<Self> {
        let mut writer = csv::Writer::from_writer(inner);
        writer.write_record(COLUMNS)?;
        Ok(Self { writer })
    }

    /// Flush buffered output and return the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| Error::from(e.into_error()))
    }
}

impl<W: Write> RowSink for CsvSink<W> {
    fn write_row(&mut self, row: &AccessLogRow) -> Result<()> {
        self.writer.write_record(row.to_record())?;
        Ok(())
    }

    fn finish(self) -> Result<()> {
        self.into_inner().map(|_| ())
    }
}

/// A CSV sink that only creates its target file on [`finish`](RowSink::finish).
///
/// Rows go to a temporary file in the target's directory, which is renamed
/// over the target once the run succeeds.
pub struct CsvFileSink {
    inner: CsvSink<NamedTempFile>,
    target: PathBuf,
}

impl CsvFileSink {
    pub fn create(target: impl AsRef<Path>) -> Result<Self> {
        let target = target.as_ref().to_path_buf();
        let file = NamedTempFile::new_in(parent_dir(&target))?;
        debug!(target = %target.display(), temp = %file.path().display(), "staging CSV output");
        Ok(Self {
            inner: CsvSink::new(file)?,
            target,
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }
}

impl RowSink for CsvFileSink {
    fn write_row(&mut self, row: &AccessLogRow) -> Result<()> {
        self.inner.write_row(row)
    }

    fn finish(self) -> Result<()> {
        let file = self.inner.into_inner()?;
        file.as_file().sync_all()?;
        file.persist(&self.target).map_err(|e| Error::from(e.error))?;
        debug!(target = %self.target.display(), "CSV output committed");
        Ok(())
    }
}

/// Directory a temporary sibling of `path` should live in.
pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
