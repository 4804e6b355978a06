//! The import loop: reader → normalizer → sink.

use crate::error::{Error, Result};
use crate::reader::Reader;
use crate::row::{AccessLogRow, REQUIRED_FIELDS};
use crate::sink::RowSink;
use std::io::Read;
use tracing::{debug, info, warn};

/// What to do with a line that fails to parse or normalize.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Abort the run on the first bad line; nothing is committed.
    #[default]
    FailFast,
    /// Log and count bad lines, import the rest.
    Skip,
}

/// Counters for one import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    /// Physical lines read, blank ones included.
    pub lines: usize,
    pub rows: usize,
    pub skipped: usize,
}

/// Run every line of `reader` through the normalizer into `sink`, then
/// commit the sink.
///
/// Template problems (a field the normalizer needs is not declared) and
/// I/O failures always abort. Malformed lines abort under
/// [`ErrorPolicy::FailFast`] and are skipped under [`ErrorPolicy::Skip`].
/// On abort the sink is dropped without being finished. Errors tied to a
/// line are wrapped in [`Error::AtLine`].
pub fn import<R, S>(mut reader: Reader<R>, mut sink: S, policy: ErrorPolicy) -> Result<ImportStats>
where
    R: Read,
    S: RowSink,
{
    if let Some(missing) = REQUIRED_FIELDS
        .iter()
        .find(|name| !reader.parser().has_field(name))
    {
        return Err(Error::field_not_found(*missing));
    }

    debug!(format = reader.parser().format(), ?policy, "starting import");
    let mut stats = ImportStats::default();

    while let Some(result) = reader.read() {
        let line_number = reader.line_number();

        match result.and_then(|entry| AccessLogRow::from_entry(&entry)) {
            Ok(row) => {
                sink.write_row(&row)
                    .map_err(|e| Error::at_line(line_number, e))?;
                stats.rows += 1;
            }
            Err(e) if policy == ErrorPolicy::Skip && e.is_record_error() => {
                warn!(line = line_number, error = %e, "skipping invalid line");
                stats.skipped += 1;
            }
            Err(e) => {
                debug!(line = line_number, rows = stats.rows, "aborting import");
                return Err(Error::at_line(line_number, e));
            }
        }
    }

    stats.lines = reader.line_number();
    sink.finish()?;

    info!(
        lines = stats.lines,
        rows = stats.rows,
        skipped = stats.skipped,
        "import complete"
    );
    Ok(stats)
}
