//! Normalization of log records into typed access-log rows.

use crate::entry::Entry;
use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

/// The nginx `combined` log format the importer expects by default.
pub const COMBINED_FORMAT: &str = r#"$remote_addr - $remote_user [$time_local] "$request" $status $body_bytes_sent "$http_referer" "$http_user_agent""#;

/// Output columns, in row order.
pub const COLUMNS: [&str; 9] = [
    "date",
    "remote_addr",
    "remote_user",
    "time_local",
    "request",
    "status",
    "body_bytes_sent",
    "http_referer",
    "http_user_agent",
];

/// Record fields the normalizer reads.
pub const REQUIRED_FIELDS: [&str; 8] = [
    "remote_addr",
    "remote_user",
    "time_local",
    "request",
    "status",
    "body_bytes_sent",
    "http_referer",
    "http_user_agent",
];

/// Record fields that may not be extracted empty.
pub const NON_EMPTY_FIELDS: [&str; 5] = [
    "remote_addr",
    "remote_user",
    "time_local",
    "status",
    "body_bytes_sent",
];

/// Layout of the local part of `$time_local`, e.g. `05/Jan/2024:08:00:00`.
const TIME_LOCAL_FORMAT: &str = "%d/%b/%Y:%H:%M:%S";
const DATE_OUTPUT_FORMAT: &str = "%Y-%m-%d";
const DATETIME_OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One normalized access-log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessLogRow {
    pub date: NaiveDate,
    pub remote_addr: String,
    pub remote_user: String,
    /// Local time as logged; the timezone offset is dropped.
    pub time_local: NaiveDateTime,
    pub request: String,
    pub status: i32,
    pub body_bytes_sent: i64,
    pub http_referer: String,
    pub http_user_agent: String,
}

impl AccessLogRow {
    /// Build a row from a parsed record.
    ///
    /// Fails with [`Error::FieldNotFound`] if any of [`REQUIRED_FIELDS`] is
    /// absent, [`Error::TimestampFormat`] if `time_local` is malformed and
    /// [`Error::NumericFormat`] if `status` or `body_bytes_sent` do not fit
    /// their integer types.
    ///
    /// # Example
    ///
    /// ```rust
    /// use logload::{AccessLogRow, Parser, StringParser, COMBINED_FORMAT};
    ///
    /// let parser = Parser::new(COMBINED_FORMAT)?;
    /// let entry = parser.parse_string(
    ///     r#"192.168.1.1 - - [05/Jan/2024:08:00:00 +0000] "GET /a HTTP/1.1" 404 512 "-" "curl/7.68.0""#,
    /// )?;
    /// let row = AccessLogRow::from_entry(&entry)?;
    /// assert_eq!(row.status, 404);
    /// assert_eq!(row.to_record()[3], "2024-01-05 08:00:00");
    /// # Ok::<(), logload::Error>(())
    /// ```
    pub fn from_entry(entry: &Entry) -> Result<Self> {
        // Look every field up first so a misconfigured template is reported
        // before any data error.
        for name in REQUIRED_FIELDS {
            entry.field(name)?;
        }

        let time_local = parse_time_local(entry.field("time_local")?)?;

        Ok(Self {
            date: time_local.date(),
            remote_addr: entry.field("remote_addr")?.to_string(),
            remote_user: entry.field("remote_user")?.to_string(),
            time_local,
            request: entry.field("request")?.to_string(),
            status: entry.int_field("status")?,
            body_bytes_sent: entry.int64_field("body_bytes_sent")?,
            http_referer: entry.field("http_referer")?.to_string(),
            http_user_agent: entry.field("http_user_agent")?.to_string(),
        })
    }

    /// The row as strings in [`COLUMNS`] order.
    pub fn to_record(&self) -> [String; 9] {
        [
            self.date.format(DATE_OUTPUT_FORMAT).to_string(),
            self.remote_addr.clone(),
            self.remote_user.clone(),
            self.time_local.format(DATETIME_OUTPUT_FORMAT).to_string(),
            self.request.clone(),
            self.status.to_string(),
            self.body_bytes_sent.to_string(),
            self.http_referer.clone(),
            self.http_user_agent.clone(),
        ]
    }

    /// Render the row back into a [`COMBINED_FORMAT`] line with a `+0000`
    /// offset.
    pub fn to_log_line(&self) -> String {
        format!(
            r#"{} - {} [{} +0000] "{}" {} {} "{}" "{}""#,
            self.remote_addr,
            self.remote_user,
            self.time_local.format(TIME_LOCAL_FORMAT),
            self.request,
            self.status,
            self.body_bytes_sent,
            self.http_referer,
            self.http_user_agent,
        )
    }
}

/// Fixed-width shape of [`TIME_LOCAL_FORMAT`]. chrono alone accepts
/// single-digit fields, short years and any month case.
fn time_local_shape() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[0-9]{2}/[A-Z][a-z]{2}/[0-9]{4}:[0-9]{2}:[0-9]{2}:[0-9]{2}$")
            .expect("time_local pattern is valid")
    })
}

/// Parse the local part of a `$time_local` value, ignoring the offset.
fn parse_time_local(raw: &str) -> Result<NaiveDateTime> {
    let local = raw.split(' ').next().unwrap_or(raw);
    if !time_local_shape().is_match(local) {
        return Err(Error::timestamp_format(raw, "expected dd/Mon/yyyy:HH:MM:SS"));
    }
    NaiveDateTime::parse_from_str(local, TIME_LOCAL_FORMAT)
        .map_err(|e| Error::timestamp_format(raw, e))
}
